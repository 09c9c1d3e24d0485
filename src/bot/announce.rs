use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use std::sync::Arc;
use tracing::warn;

use crate::audio::track::Track;
use crate::ui::embeds;
use crate::voice::Announcer;

/// Anuncia el "now playing" por HTTP en el canal de texto de origen.
pub struct HttpAnnouncer {
    http: Arc<Http>,
}

impl HttpAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for HttpAnnouncer {
    async fn now_playing(&self, track: &Track) {
        let message = CreateMessage::new().embed(embeds::create_now_playing_embed(track));
        // Un mensaje fallido no interrumpe la reproducción.
        if let Err(e) = track.origin_channel().send_message(&self.http, message).await {
            warn!("⚠️ No se pudo anunciar {}: {e}", track.title());
        }
    }
}
