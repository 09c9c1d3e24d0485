use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::audio::session::{PlaybackSession, SHUTDOWN_GRACE};
use crate::audio::track::Track;
use crate::error::MusicError;
use crate::sources::SourceResolver;
use crate::voice::{Announcer, VoiceGateway};

/// Registro de sesiones de reproducción, una por servidor.
///
/// El get-or-create es atómico a través de la entry API del mapa: el primer
/// join crea la sesión y los joins concurrentes observan la misma. Una sesión
/// que ya empezó su cierre se trata como ausente y se reemplaza por una nueva.
pub struct SessionManager {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    gateway: Arc<dyn VoiceGateway>,
    resolver: Arc<dyn SourceResolver>,
    announcer: Arc<dyn Announcer>,
    default_volume: f32,
    idle_timeout: Duration,
}

impl TypeMapKey for SessionManager {
    type Value = Arc<SessionManager>;
}

impl SessionManager {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        resolver: Arc<dyn SourceResolver>,
        announcer: Arc<dyn Announcer>,
        default_volume: f32,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            gateway,
            resolver,
            announcer,
            default_volume,
            idle_timeout,
        })
    }

    /// Sesión viva del servidor, si existe.
    pub fn session(&self, guild_id: GuildId) -> Result<Arc<PlaybackSession>, MusicError> {
        self.live_session(guild_id).ok_or(MusicError::NotConnected)
    }

    fn live_session(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions
            .get(&guild_id)
            .map(|session| session.clone())
            .filter(|session| !session.is_closed())
    }

    /// Conecta al canal de voz y devuelve la sesión del servidor, creándola
    /// si hace falta. Falla con `AlreadyConnectedElsewhere` si la sesión viva
    /// está atada a otro canal.
    pub async fn join(
        self: &Arc<Self>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<PlaybackSession>, MusicError> {
        if let Some(existing) = self.live_session(guild_id) {
            return if existing.channel_id() == channel_id {
                Ok(existing)
            } else {
                Err(MusicError::AlreadyConnectedElsewhere)
            };
        }

        // La conexión ocurre fuera del lock del mapa; la entry API decide
        // después quién gana si hubo joins concurrentes.
        let call = self.gateway.connect(guild_id, channel_id).await?;
        let fresh = PlaybackSession::spawn(
            guild_id,
            channel_id,
            call,
            self.announcer.clone(),
            self.default_volume,
            self.idle_timeout,
            Arc::downgrade(self),
        );

        let winner = match self.sessions.entry(guild_id) {
            Entry::Vacant(entry) => {
                entry.insert(fresh.clone());
                fresh.clone()
            }
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    entry.insert(fresh.clone());
                    fresh.clone()
                } else {
                    entry.get().clone()
                }
            }
        };

        if !Arc::ptr_eq(&winner, &fresh) {
            // Otro join ganó mientras conectábamos; la conexión de voz es la
            // misma, así que solo se descarta la tarea sobrante.
            fresh.abandon().await;
            if winner.channel_id() != channel_id {
                return Err(MusicError::AlreadyConnectedElsewhere);
            }
        } else {
            info!("🔊 Sesión creada para {} en el canal {}", guild_id, channel_id);
        }

        Ok(winner)
    }

    /// Desconecta y destruye la sesión del servidor. Idempotente.
    pub async fn leave(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let Some((_, session)) = self.sessions.remove(&guild_id) else {
            return Err(MusicError::NotConnected);
        };
        session.shutdown().await;
        session.wait_stopped(SHUTDOWN_GRACE).await;
        Ok(())
    }

    /// Resuelve la búsqueda y encola el resultado, uniéndose al canal de voz
    /// si todavía no hay sesión. Un fallo de resolución no toca la cola.
    pub async fn play(
        self: &Arc<Self>,
        guild_id: GuildId,
        voice_channel: ChannelId,
        query: &str,
        requested_by: UserId,
        origin_channel: ChannelId,
    ) -> Result<Track, MusicError> {
        self.join(guild_id, voice_channel).await?;

        let track = self
            .resolver
            .resolve(query, requested_by, origin_channel)
            .await?;

        // La resolución puede tardar más que el timeout de inactividad; si la
        // sesión expiró mientras tanto, se crea una nueva y se reintenta.
        for _ in 0..2 {
            let session = self.join(guild_id, voice_channel).await?;
            match session.enqueue(track.clone()) {
                Ok(position) => {
                    debug!("🎶 {} encolado en posición {}", track.title(), position);
                    return Ok(track);
                }
                Err(MusicError::NotConnected) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(MusicError::NotConnected)
    }

    /// Retira una sesión vencida por inactividad. Solo elimina la entrada si
    /// sigue apuntando a esa misma sesión: un join concurrente que ya la
    /// reemplazó no se ve afectado.
    pub(crate) async fn expire(&self, session: &Arc<PlaybackSession>) {
        self.sessions
            .remove_if(&session.guild_id(), |_, current| Arc::ptr_eq(current, session));
        session.shutdown().await;
    }

    /// Cierra todas las sesiones vivas. Camino de apagado del proceso.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.sessions.clear();
        for session in sessions {
            session.shutdown().await;
        }
        info!("🛑 Todas las sesiones de voz cerradas");
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSourceResolver;
    use crate::voice::testing::{FakeGateway, NullAnnouncer};
    use pretty_assertions::assert_eq;

    fn manager_with(
        gateway: Arc<FakeGateway>,
        resolver: MockSourceResolver,
        idle_timeout: Duration,
    ) -> Arc<SessionManager> {
        SessionManager::new(
            gateway,
            Arc::new(resolver),
            Arc::new(NullAnnouncer),
            0.5,
            idle_timeout,
        )
    }

    fn resolver_for(titles: &'static [&'static str]) -> MockSourceResolver {
        let mut resolver = MockSourceResolver::new();
        resolver.expect_resolve().returning(move |query, user, channel| {
            if titles.contains(&query) {
                Ok(Track::new(
                    query.to_string(),
                    "uploader".to_string(),
                    format!("https://cdn.example/{query}"),
                    format!("https://example.com/{query}"),
                    user,
                    channel,
                ))
            } else {
                Err(MusicError::Resolution {
                    query: query.to_string(),
                    reason: "sin resultados".to_string(),
                })
            }
        });
        resolver
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("la condición no se cumplió a tiempo");
    }

    #[tokio::test(start_paused = true)]
    async fn join_reuses_the_session_for_the_same_channel() {
        let gateway = FakeGateway::new();
        let manager = manager_with(gateway.clone(), MockSourceResolver::new(), Duration::from_secs(300));

        let first = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        let second = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.session_count(), 1);

        let err = manager.join(GuildId::new(1), ChannelId::new(6)).await.unwrap_err();
        assert!(matches!(err, MusicError::AlreadyConnectedElsewhere));

        manager.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_joins_observe_the_same_session() {
        let gateway = FakeGateway::new();
        let manager = manager_with(gateway.clone(), MockSourceResolver::new(), Duration::from_secs(300));

        let (a, b) = tokio::join!(
            manager.join(GuildId::new(1), ChannelId::new(5)),
            manager.join(GuildId::new(1), ChannelId::new(5)),
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(manager.session_count(), 1);

        manager.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn leave_destroys_and_rejoin_creates_a_fresh_session() {
        let gateway = FakeGateway::new();
        let manager = manager_with(gateway.clone(), MockSourceResolver::new(), Duration::from_secs(300));

        let old = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        manager.leave(GuildId::new(1)).await.unwrap();
        assert_eq!(gateway.calls()[0].disconnect_count(), 1);
        assert_eq!(manager.session_count(), 0);

        // Dejar un servidor sin sesión se reporta, no se ignora.
        let err = manager.leave(GuildId::new(1)).await.unwrap_err();
        assert!(matches!(err, MusicError::NotConnected));

        let fresh = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(!fresh.is_closed());

        manager.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_and_leave_the_registry() {
        let gateway = FakeGateway::new();
        let manager = manager_with(gateway.clone(), MockSourceResolver::new(), Duration::from_millis(100));

        let session = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        wait_until(|| manager.session_count() == 0).await;
        assert!(session.is_closed());
        assert_eq!(gateway.calls()[0].disconnect_count(), 1);

        // El siguiente join crea una sesión nueva sin resucitar la vieja.
        let fresh = manager.join(GuildId::new(1), ChannelId::new(5)).await.unwrap();
        assert!(!Arc::ptr_eq(&session, &fresh));

        manager.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn play_resolves_joins_and_enqueues() {
        let gateway = FakeGateway::new();
        let manager = manager_with(
            gateway.clone(),
            resolver_for(&["una canción"]),
            Duration::from_secs(300),
        );

        let track = manager
            .play(
                GuildId::new(1),
                ChannelId::new(5),
                "una canción",
                UserId::new(9),
                ChannelId::new(77),
            )
            .await
            .unwrap();
        assert_eq!(track.title(), "una canción");
        assert_eq!(track.requested_by(), UserId::new(9));

        let session = manager.session(GuildId::new(1)).unwrap();
        wait_until(|| session.now_playing().is_some()).await;
        assert_eq!(session.now_playing().unwrap().title(), "una canción");

        manager.shutdown_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_failure_does_not_touch_the_queue() {
        let gateway = FakeGateway::new();
        let manager = manager_with(
            gateway.clone(),
            resolver_for(&[]),
            Duration::from_secs(300),
        );

        let err = manager
            .play(
                GuildId::new(1),
                ChannelId::new(5),
                "nada de nada",
                UserId::new(9),
                ChannelId::new(77),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MusicError::Resolution { .. }));

        let session = manager.session(GuildId::new(1)).unwrap();
        assert_eq!(session.queue_len(), 0);
        assert!(session.now_playing().is_none());

        manager.shutdown_all().await;
    }
}
