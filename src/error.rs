use thiserror::Error;

/// Errores del núcleo de reproducción. Todos se recuperan en el límite de la
/// sesión y se devuelven a la capa de comandos como resultados tipados.
#[derive(Debug, Error)]
pub enum MusicError {
    /// La búsqueda o URL no pudo resolverse a un track reproducible
    #[error("no se pudo resolver `{query}`: {reason}")]
    Resolution { query: String, reason: String },

    /// Fallo del transporte de voz (conexión, reproducción o desconexión)
    #[error("error de voz: {0}")]
    Transport(String),

    /// Índice de cola fuera de rango
    #[error("el índice {index} está fuera de rango (la cola tiene {len} tracks)")]
    OutOfRange { index: usize, len: usize },

    /// Comando inválido para el estado actual de reproducción
    #[error("{0}")]
    VoiceState(&'static str),

    /// El bot ya está activo en otro canal de voz de este servidor
    #[error("ya estoy conectado a otro canal de voz")]
    AlreadyConnectedElsewhere,

    /// La cola está vacía
    #[error("la cola está vacía")]
    EmptyQueue,

    /// No hay sesión de voz activa
    #[error("no estoy conectado a ningún canal de voz")]
    NotConnected,
}
