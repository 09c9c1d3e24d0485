use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use crate::audio::track::Track;
use crate::error::MusicError;

/// Cola de reproducción ordenada con dequeue bloqueante.
///
/// Los productores (handlers de comandos) encolan sin bloquear; el único
/// consumidor es la tarea de fondo de la sesión, que espera en [`dequeue`]
/// hasta que haya un track o venza el timeout de inactividad.
///
/// [`dequeue`]: TrackQueue::dequeue
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: Mutex<VecDeque<Track>>,
    notify: Notify,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola. Nunca bloquea.
    pub fn enqueue(&self, track: Track) {
        debug!("➕ Encolado: {}", track.title());
        self.items.lock().push_back(track);
        self.notify.notify_one();
    }

    /// Espera el siguiente track en orden FIFO.
    ///
    /// Devuelve `None` si el timeout vence sin que nada se encole. El timeout
    /// se mide desde la entrada: los despertares espurios no lo extienden.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Track> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // El futuro de notificación se crea antes de mirar la cola para
            // no perder un enqueue que llegue entre el chequeo y la espera.
            let notified = self.notify.notified();
            if let Some(track) = self.items.lock().pop_front() {
                return Some(track);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Permuta la cola en su lugar de forma uniforme.
    pub fn shuffle(&self) {
        let mut items = self.items.lock();
        items.make_contiguous().shuffle(&mut thread_rng());
    }

    /// Elimina el track en `index` (0-based).
    pub fn remove(&self, index: usize) -> Result<Track, MusicError> {
        let mut items = self.items.lock();
        let len = items.len();
        items.remove(index).ok_or(MusicError::OutOfRange { index, len })
    }

    /// Vacía la cola y devuelve cuántos tracks se descartaron.
    /// Los consumidores en espera siguen esperando.
    pub fn clear(&self) -> usize {
        let mut items = self.items.lock();
        let cleared = items.len();
        items.clear();
        cleared
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Página de la cola para mostrar (1-based, como la ve el usuario).
    pub fn page(&self, page: usize, per_page: usize) -> QueuePage {
        let items = self.items.lock();
        let total_items = items.len();
        let safe_page = page.max(1);
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(per_page)
        };
        let start = (safe_page - 1) * per_page;
        let end = (start + per_page).min(total_items);
        let page_items = if start < total_items {
            items.iter().skip(start).take(end - start).cloned().collect()
        } else {
            Vec::new()
        };

        QueuePage {
            items: page_items,
            current_page: safe_page,
            total_pages,
            total_items,
        }
    }
}

/// Una página de la cola lista para renderizar.
#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serenity::model::id::{ChannelId, UserId};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn track(title: &str) -> Track {
        Track::new(
            title.to_string(),
            "uploader".to_string(),
            format!("https://cdn.example/{title}"),
            format!("https://example.com/{title}"),
            UserId::new(1),
            ChannelId::new(1),
        )
    }

    #[tokio::test]
    async fn dequeue_preserves_fifo_order() {
        let queue = TrackQueue::new();
        for title in ["a", "b", "c"] {
            queue.enqueue(track(title));
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            let t = queue.dequeue(Duration::from_secs(1)).await.unwrap();
            seen.push(t.title().to_string());
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_times_out_on_empty_queue() {
        let queue = TrackQueue::new();
        let got = queue.dequeue(Duration::from_secs(300)).await;
        assert!(got.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_wakes_up_on_enqueue() {
        let queue = Arc::new(TrackQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(300)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.enqueue(track("late"));

        let got = consumer.await.unwrap().unwrap();
        assert_eq!(got.title(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_does_not_wake_waiting_consumers() {
        let queue = Arc::new(TrackQueue::new());
        queue.enqueue(track("gone"));
        queue.clear();

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(10)).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!consumer.is_finished());

        // Aún debe poder recibir un track nuevo después del clear.
        queue.enqueue(track("fresh"));
        let got = consumer.await.unwrap().unwrap();
        assert_eq!(got.title(), "fresh");
    }

    #[test]
    fn shuffle_keeps_the_same_tracks() {
        let queue = TrackQueue::new();
        let titles: Vec<String> = (0..20).map(|i| format!("track-{i}")).collect();
        for title in &titles {
            queue.enqueue(track(title));
        }

        queue.shuffle();

        let after: HashSet<String> = queue
            .page(1, 100)
            .items
            .iter()
            .map(|t| t.title().to_string())
            .collect();
        assert_eq!(after, titles.iter().cloned().collect::<HashSet<_>>());
        assert_eq!(queue.len(), 20);
    }

    #[test]
    fn shuffle_on_single_track_is_a_noop() {
        let queue = TrackQueue::new();
        queue.enqueue(track("only"));
        queue.shuffle();
        assert_eq!(queue.page(1, 10).items[0].title(), "only");
    }

    #[test]
    fn remove_out_of_range_fails_without_mutation() {
        let queue = TrackQueue::new();
        queue.enqueue(track("a"));
        queue.enqueue(track("b"));

        let err = queue.remove(2).unwrap_err();
        assert!(matches!(err, MusicError::OutOfRange { index: 2, len: 2 }));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn remove_in_range_returns_the_track() {
        let queue = TrackQueue::new();
        queue.enqueue(track("a"));
        queue.enqueue(track("b"));
        queue.enqueue(track("c"));

        let removed = queue.remove(1).unwrap();
        assert_eq!(removed.title(), "b");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn page_splits_in_chunks_of_ten() {
        let queue = TrackQueue::new();
        for i in 0..23 {
            queue.enqueue(track(&format!("t{i}")));
        }

        let page = queue.page(3, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 23);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].title(), "t20");
    }
}
