//! Implementación del transporte de voz sobre songbird.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::cache::Cache;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::{HttpRequest, Input};
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::audio::track::Track;
use crate::error::MusicError;
use crate::voice::{TrackControl, TrackEnd, VoiceCall, VoiceGateway};

/// Gateway real: abre llamadas de voz a través del manager de songbird.
pub struct SongbirdGateway {
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    http: reqwest::Client,
}

impl SongbirdGateway {
    pub fn new(manager: Arc<Songbird>, cache: Arc<Cache>) -> Self {
        Self {
            manager,
            cache,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceCall>, MusicError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Transport(format!("no se pudo conectar: {e}")))?;

        info!("🔊 Conectado al canal de voz {} en {}", channel_id, guild_id);

        Ok(Arc::new(SongbirdCall {
            call,
            manager: self.manager.clone(),
            cache: self.cache.clone(),
            http: self.http.clone(),
            guild_id,
            channel_id,
        }))
    }
}

pub struct SongbirdCall {
    call: Arc<tokio::sync::Mutex<Call>>,
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    http: reqwest::Client,
    guild_id: GuildId,
    channel_id: ChannelId,
}

#[async_trait]
impl VoiceCall for SongbirdCall {
    async fn play(
        &self,
        track: &Track,
        volume: f32,
    ) -> Result<(Arc<dyn TrackControl>, oneshot::Receiver<TrackEnd>), MusicError> {
        let input = Input::from(HttpRequest::new(
            self.http.clone(),
            track.stream_url().to_string(),
        ));

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };
        let _ = handle.set_volume(volume);

        // El fin de reproducción (natural o con error) se convierte en una
        // señal one-shot; el primero de los dos eventos en disparar la envía.
        let (tx, rx) = oneshot::channel();
        let signal: EndSignal = Arc::new(Mutex::new(Some(tx)));
        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    signal: signal.clone(),
                    errored: false,
                },
            )
            .map_err(|e| MusicError::Transport(format!("no se pudo registrar evento: {e}")))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackEndNotifier {
                    signal,
                    errored: true,
                },
            )
            .map_err(|e| MusicError::Transport(format!("no se pudo registrar evento: {e}")))?;

        let control: Arc<dyn TrackControl> = Arc::new(SongbirdTrack { handle });
        Ok((control, rx))
    }

    async fn disconnect(&self) -> Result<(), MusicError> {
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| MusicError::Transport(format!("no se pudo desconectar: {e}")))
    }

    async fn listener_count(&self) -> usize {
        let Some(guild) = self.cache.guild(self.guild_id) else {
            return 0;
        };
        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(self.channel_id))
            .filter(|state| {
                guild
                    .members
                    .get(&state.user_id)
                    .map_or(true, |member| !member.user.bot)
            })
            .count()
    }
}

struct SongbirdTrack {
    handle: TrackHandle,
}

// Las operaciones de control de songbird son fire-and-forget: si el track ya
// terminó, fallan sin consecuencias.
impl TrackControl for SongbirdTrack {
    fn stop(&self) {
        let _ = self.handle.stop();
    }

    fn pause(&self) {
        let _ = self.handle.pause();
    }

    fn resume(&self) {
        let _ = self.handle.play();
    }

    fn set_volume(&self, volume: f32) {
        let _ = self.handle.set_volume(volume);
    }
}

type EndSignal = Arc<Mutex<Option<oneshot::Sender<TrackEnd>>>>;

struct TrackEndNotifier {
    signal: EndSignal,
    errored: bool,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let end = if self.errored {
            let detail = if let EventContext::Track(track_list) = ctx {
                track_list
                    .iter()
                    .map(|(state, _)| format!("{:?}", state.playing))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                "error de reproducción".to_string()
            };
            warn!("❌ Error en el driver de audio: {detail}");
            TrackEnd::Errored(detail)
        } else {
            TrackEnd::Finished
        };

        if let Some(tx) = self.signal.lock().take() {
            let _ = tx.send(end);
        }
        None
    }
}
