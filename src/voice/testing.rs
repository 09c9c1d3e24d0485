//! Dobles en memoria del transporte de voz para las pruebas.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::audio::track::Track;
use crate::error::MusicError;
use crate::voice::{Announcer, TrackControl, TrackEnd, VoiceCall, VoiceGateway};

type EndSlot = Arc<Mutex<Option<oneshot::Sender<TrackEnd>>>>;

pub struct FakeControl {
    end: EndSlot,
    stops: AtomicUsize,
    paused: AtomicBool,
    volume: Mutex<f32>,
}

impl FakeControl {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }
}

impl TrackControl for FakeControl {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.end.lock().take() {
            let _ = tx.send(TrackEnd::Finished);
        }
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
    }
}

/// Conexión de voz simulada: registra reproducciones y desconexiones y deja
/// terminar tracks a demanda.
#[derive(Default)]
pub struct FakeCall {
    listeners: AtomicUsize,
    attempts: AtomicUsize,
    played: Mutex<Vec<(String, f32)>>,
    disconnects: AtomicUsize,
    fail_next_play: AtomicBool,
    current_end: Mutex<Option<EndSlot>>,
    current_control: Mutex<Option<Arc<FakeControl>>>,
}

impl FakeCall {
    pub fn with_listeners(listeners: usize) -> Arc<Self> {
        let call = Arc::new(Self::default());
        call.listeners.store(listeners, Ordering::SeqCst);
        call
    }

    /// Dispara la señal de fin del track en curso.
    pub fn finish_current(&self) {
        let slot = self.current_end.lock().clone();
        if let Some(slot) = slot {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(TrackEnd::Finished);
            }
        }
    }

    pub fn fail_next_play(&self) {
        self.fail_next_play.store(true, Ordering::SeqCst);
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().len()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.played.lock().iter().map(|(title, _)| title.clone()).collect()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn current_control(&self) -> Arc<FakeControl> {
        self.current_control
            .lock()
            .clone()
            .expect("no hay ningún track en reproducción")
    }
}

#[async_trait]
impl VoiceCall for FakeCall {
    async fn play(
        &self,
        track: &Track,
        volume: f32,
    ) -> Result<(Arc<dyn TrackControl>, oneshot::Receiver<TrackEnd>), MusicError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_play.swap(false, Ordering::SeqCst) {
            return Err(MusicError::Transport("fallo simulado".into()));
        }
        let (tx, rx) = oneshot::channel();
        let slot: EndSlot = Arc::new(Mutex::new(Some(tx)));
        let control = Arc::new(FakeControl {
            end: slot.clone(),
            stops: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            volume: Mutex::new(volume),
        });
        *self.current_end.lock() = Some(slot);
        *self.current_control.lock() = Some(control.clone());
        self.played.lock().push((track.title().to_string(), volume));
        let control: Arc<dyn TrackControl> = control;
        Ok((control, rx))
    }

    async fn disconnect(&self) -> Result<(), MusicError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }
}

/// Gateway simulado: entrega una [`FakeCall`] nueva por conexión.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Arc<FakeCall>>>,
    listeners: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        let gateway = Arc::new(Self::default());
        gateway.listeners.store(2, Ordering::SeqCst);
        gateway
    }

    pub fn calls(&self) -> Vec<Arc<FakeCall>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn connect(
        &self,
        _guild_id: GuildId,
        _channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceCall>, MusicError> {
        let call = FakeCall::with_listeners(self.listeners.load(Ordering::SeqCst));
        self.calls.lock().push(call.clone());
        Ok(call)
    }
}

pub struct NullAnnouncer;

#[async_trait]
impl Announcer for NullAnnouncer {
    async fn now_playing(&self, _track: &Track) {}
}
