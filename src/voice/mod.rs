//! Interfaces hacia el transporte de voz y los anuncios de canal.
//!
//! La sesión de reproducción consume el transporte solo a través de estos
//! traits; la implementación real sobre songbird vive en
//! [`songbird_backend`] y las pruebas usan dobles en memoria.

pub mod songbird_backend;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::audio::track::Track;
use crate::error::MusicError;

/// Cómo terminó la reproducción de un track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEnd {
    /// Terminó de forma natural o fue detenido
    Finished,
    /// El driver reportó un error; el loop de consumo lo trata como fin
    Errored(String),
}

/// Punto de entrada al transporte de voz: abre conexiones por canal.
#[async_trait]
pub trait VoiceGateway: Send + Sync + 'static {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceCall>, MusicError>;
}

/// Una conexión de voz activa.
#[async_trait]
pub trait VoiceCall: Send + Sync + 'static {
    /// Inicia la reproducción de un track y devuelve su control junto con
    /// una señal one-shot que se dispara cuando la reproducción termina
    /// (natural, detenida o con error).
    async fn play(
        &self,
        track: &Track,
        volume: f32,
    ) -> Result<(Arc<dyn TrackControl>, oneshot::Receiver<TrackEnd>), MusicError>;

    async fn disconnect(&self) -> Result<(), MusicError>;

    /// Oyentes humanos en el canal de voz (excluye bots).
    async fn listener_count(&self) -> usize;
}

/// Control sobre el track actualmente cargado en el driver.
pub trait TrackControl: Send + Sync + 'static {
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn set_volume(&self, volume: f32);
}

/// Publica el anuncio de "now playing" en el canal de origen del track.
#[async_trait]
pub trait Announcer: Send + Sync + 'static {
    async fn now_playing(&self, track: &Track);
}
