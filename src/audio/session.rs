use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::manager::SessionManager;
use crate::audio::queue::{QueuePage, TrackQueue};
use crate::audio::track::Track;
use crate::audio::votes::SkipVotes;
use crate::error::MusicError;
use crate::voice::{Announcer, TrackControl, TrackEnd, VoiceCall};

/// Gracia para que la tarea de fondo termine tras un shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Resultado de un comando de skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    Skipped(SkipReason),
    VoteRecorded { votes: usize, needed: usize },
    AlreadyVoted,
    NothingPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Único oyente humano del canal
    SoleListener,
    /// Quien pidió el track lo salta sin votación
    Requester,
    /// Permiso de mover miembros: salta sin votación
    Privileged,
    VotePassed,
}

/// Pedido de cambio de volumen, ya parseado desde el comando.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRequest {
    Mute,
    Normal,
    Max,
    Up,
    Down,
    Set(i64),
}

impl VolumeRequest {
    /// Interpreta el argumento textual del comando de volumen.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "mute" | "muted" | "min" | "minimum" => Some(Self::Mute),
            "normal" | "default" => Some(Self::Normal),
            "max" | "maximum" => Some(Self::Max),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            other => other.trim_end_matches('%').parse::<i64>().ok().map(Self::Set),
        }
    }
}

struct CurrentPlayback {
    track: Track,
    control: Arc<dyn TrackControl>,
    paused: bool,
}

struct SessionState {
    current: Option<CurrentPlayback>,
    looping: bool,
    volume: f32,
    closed: bool,
}

/// Coordinador de reproducción de un servidor.
///
/// Posee la cola, los votos de skip y exactamente una tarea de fondo que
/// consume la cola y reproduce track por track. Todas las mutaciones de
/// estado pasan por un único mutex, de modo que los comandos concurrentes
/// quedan linealizados; el cierre y el enqueue comparten ese mismo lock para
/// que la carrera timeout-vs-enqueue tenga un ganador bien definido.
pub struct PlaybackSession {
    guild_id: GuildId,
    channel_id: ChannelId,
    queue: TrackQueue,
    votes: SkipVotes,
    state: Mutex<SessionState>,
    call: Arc<dyn VoiceCall>,
    announcer: Arc<dyn Announcer>,
    cancel: CancellationToken,
    idle_timeout: Duration,
    shutdown_started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("queue_len", &self.queue.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PlaybackSession {
    /// Crea la sesión y lanza su tarea de consumo.
    pub fn spawn(
        guild_id: GuildId,
        channel_id: ChannelId,
        call: Arc<dyn VoiceCall>,
        announcer: Arc<dyn Announcer>,
        default_volume: f32,
        idle_timeout: Duration,
        manager: Weak<SessionManager>,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            guild_id,
            channel_id,
            queue: TrackQueue::new(),
            votes: SkipVotes::new(),
            state: Mutex::new(SessionState {
                current: None,
                looping: false,
                volume: default_volume.clamp(0.0, 2.0),
                closed: false,
            }),
            call,
            announcer,
            cancel: CancellationToken::new(),
            idle_timeout,
            shutdown_started: AtomicBool::new(false),
            task: Mutex::new(None),
        });

        let handle = tokio::spawn(Self::run(session.clone(), manager));
        *session.task.lock() = Some(handle);
        session
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Canal de voz al que está atada la sesión.
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Encola un track resuelto. Falla si la sesión ya empezó a cerrarse.
    pub fn enqueue(&self, track: Track) -> Result<usize, MusicError> {
        let state = self.state.lock();
        if state.closed {
            return Err(MusicError::NotConnected);
        }
        self.queue.enqueue(track);
        Ok(self.queue.len())
    }

    pub fn now_playing(&self) -> Option<Track> {
        self.state.lock().current.as_ref().map(|c| c.track.clone())
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().looping
    }

    /// Vota o ejecuta un skip según quién lo pida y cuántos oyentes haya.
    pub async fn skip(&self, voter: UserId, has_privilege: bool) -> SkipOutcome {
        let requester = {
            let state = self.state.lock();
            match state.current.as_ref() {
                Some(current) => current.track.requested_by(),
                None => return SkipOutcome::NothingPlaying,
            }
        };

        let listeners = self.call.listener_count().await;
        if listeners <= 1 {
            self.execute_skip();
            return SkipOutcome::Skipped(SkipReason::SoleListener);
        }
        if voter == requester {
            self.execute_skip();
            return SkipOutcome::Skipped(SkipReason::Requester);
        }
        if has_privilege {
            self.execute_skip();
            return SkipOutcome::Skipped(SkipReason::Privileged);
        }

        if !self.votes.add(voter) {
            return SkipOutcome::AlreadyVoted;
        }
        let needed = SkipVotes::threshold(listeners);
        let votes = self.votes.count();
        if votes >= needed {
            self.execute_skip();
            SkipOutcome::Skipped(SkipReason::VotePassed)
        } else {
            SkipOutcome::VoteRecorded { votes, needed }
        }
    }

    /// Detiene el track actual; la señal de fin despierta al loop de consumo.
    fn execute_skip(&self) {
        self.votes.clear();
        let state = self.state.lock();
        if let Some(current) = state.current.as_ref() {
            current.control.stop();
        }
    }

    pub fn pause(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock();
        match state.current.as_mut() {
            Some(current) if !current.paused => {
                current.control.pause();
                current.paused = true;
                Ok(())
            }
            Some(_) => Err(MusicError::VoiceState("la reproducción ya está en pausa")),
            None => Err(MusicError::VoiceState("no se está reproduciendo nada ahora")),
        }
    }

    pub fn resume(&self) -> Result<(), MusicError> {
        let mut state = self.state.lock();
        match state.current.as_mut() {
            Some(current) if current.paused => {
                current.control.resume();
                current.paused = false;
                Ok(())
            }
            Some(_) => Err(MusicError::VoiceState("la reproducción no está en pausa")),
            None => Err(MusicError::VoiceState("no se está reproduciendo nada ahora")),
        }
    }

    /// Aplica el pedido de volumen y devuelve el porcentaje resultante.
    /// Se limita a [0, 200]; si hay un track sonando se aplica en vivo.
    pub fn set_volume(&self, request: VolumeRequest) -> u16 {
        let mut state = self.state.lock();
        let current_pct = (state.volume * 100.0).round() as i64;
        let target = match request {
            VolumeRequest::Mute => 0,
            VolumeRequest::Normal => 100,
            VolumeRequest::Max => 200,
            VolumeRequest::Up => current_pct + 10,
            VolumeRequest::Down => current_pct - 10,
            VolumeRequest::Set(value) => value,
        };
        let applied = target.clamp(0, 200) as u16;
        state.volume = f32::from(applied) / 100.0;
        if let Some(current) = state.current.as_ref() {
            current.control.set_volume(state.volume);
        }
        applied
    }

    pub fn volume_percent(&self) -> u16 {
        (self.state.lock().volume * 100.0).round() as u16
    }

    /// Activa o desactiva la repetición del track actual.
    pub fn toggle_loop(&self) -> Result<bool, MusicError> {
        let mut state = self.state.lock();
        if state.current.is_none() {
            return Err(MusicError::VoiceState("no se está reproduciendo nada ahora"));
        }
        state.looping = !state.looping;
        Ok(state.looping)
    }

    pub fn shuffle(&self) -> Result<(), MusicError> {
        if self.queue.is_empty() {
            return Err(MusicError::EmptyQueue);
        }
        self.queue.shuffle();
        Ok(())
    }

    /// Elimina el track en la posición `index` (0-based).
    pub fn remove(&self, index: usize) -> Result<Track, MusicError> {
        if self.queue.is_empty() {
            return Err(MusicError::EmptyQueue);
        }
        self.queue.remove(index)
    }

    pub fn queue_page(&self, page: usize, per_page: usize) -> Result<QueuePage, MusicError> {
        if self.queue.is_empty() {
            return Err(MusicError::EmptyQueue);
        }
        Ok(self.queue.page(page, per_page))
    }

    #[allow(dead_code)]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Detiene el track actual y vacía la cola. Devuelve cuántos tracks
    /// se descartaron.
    pub fn stop_and_clear(&self) -> usize {
        let cleared = self.queue.clear();
        let mut state = self.state.lock();
        state.looping = false;
        if let Some(current) = state.current.as_ref() {
            current.control.stop();
        }
        cleared
    }

    /// Cierra la sesión: cancela la tarea de fondo, vacía la cola y
    /// desconecta el transporte. Idempotente; la desconexión ocurre una
    /// sola vez por sesión.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.looping = false;
            if let Some(current) = state.current.take() {
                current.control.stop();
            }
        }
        self.cancel.cancel();
        self.queue.clear();
        self.votes.clear();
        if let Err(e) = self.call.disconnect().await {
            warn!("⚠️ Error al desconectar la sesión de {}: {e}", self.guild_id);
        }
        info!("👋 Sesión de {} cerrada", self.guild_id);
    }

    /// Cancela la tarea de fondo sin desconectar el transporte. Se usa para
    /// descartar la sesión que perdió una carrera de creación: la ganadora
    /// comparte la misma conexión de voz y debe seguir viva.
    pub(crate) async fn abandon(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.lock().closed = true;
        self.cancel.cancel();
        self.queue.clear();
    }

    /// Espera a que la tarea de fondo termine, hasta `grace`.
    pub async fn wait_stopped(&self, grace: Duration) -> bool {
        let handle = self.task.lock().take();
        match handle {
            Some(handle) => tokio::time::timeout(grace, handle).await.is_ok(),
            None => true,
        }
    }

    /// Intenta iniciar el cierre por inactividad. Pierde contra un enqueue
    /// concurrente: si la cola dejó de estar vacía, la sesión sigue viva.
    fn begin_close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return true;
        }
        if !self.queue.is_empty() {
            return false;
        }
        state.closed = true;
        true
    }

    /// Loop de consumo: un único task por sesión, vive hasta el teardown.
    async fn run(session: Arc<Self>, manager: Weak<SessionManager>) {
        loop {
            // Con loop activo se repite el track actual sin tocar la cola.
            let replay = {
                let state = session.state.lock();
                if state.looping {
                    state.current.as_ref().map(|c| c.track.clone())
                } else {
                    None
                }
            };

            let track = match replay {
                Some(track) => track,
                None => {
                    let dequeued = tokio::select! {
                        _ = session.cancel.cancelled() => return,
                        dequeued = session.queue.dequeue(session.idle_timeout) => dequeued,
                    };
                    match dequeued {
                        Some(track) => track,
                        None => {
                            if !session.begin_close() {
                                // Un enqueue ganó la carrera contra el timeout.
                                continue;
                            }
                            info!(
                                "💤 Sesión de {} inactiva, desconectando",
                                session.guild_id
                            );
                            match manager.upgrade() {
                                Some(manager) => manager.expire(&session).await,
                                None => session.shutdown().await,
                            }
                            return;
                        }
                    }
                }
            };

            let volume = session.state.lock().volume;
            let (control, finished) = match session.call.play(&track, volume).await {
                Ok(playing) => playing,
                Err(e) => {
                    // Se trata como fin de track: el loop sigue con la cola.
                    error!("❌ No se pudo reproducir {}: {e}", track.title());
                    session.state.lock().current = None;
                    continue;
                }
            };

            {
                let mut state = session.state.lock();
                state.current = Some(CurrentPlayback {
                    track: track.clone(),
                    control,
                    paused: false,
                });
            }

            info!("🎵 Reproduciendo: {} en {}", track.title(), session.guild_id);
            session.announcer.now_playing(&track).await;

            tokio::select! {
                _ = session.cancel.cancelled() => return,
                end = finished => match end {
                    Ok(TrackEnd::Errored(reason)) => {
                        warn!("⚠️ Track {} terminó con error: {reason}", track.title());
                    }
                    Ok(TrackEnd::Finished) | Err(_) => {
                        debug!("⏹️ Track {} terminado", track.title());
                    }
                },
            }

            let mut state = session.state.lock();
            if !state.looping {
                state.current = None;
            }
        }
    }
}
