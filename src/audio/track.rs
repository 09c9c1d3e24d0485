use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, UserId};
use std::time::Duration;

/// Representa un track ya resuelto, listo para reproducirse.
///
/// Inmutable una vez creado por el resolver: los metadatos, la URL de stream
/// y la identidad del solicitante no cambian durante la vida del track.
#[derive(Debug, Clone)]
pub struct Track {
    title: String,
    uploader: String,
    duration: Option<Duration>,
    stream_url: String,
    webpage_url: String,
    thumbnail: Option<String>,
    requested_by: UserId,
    origin_channel: ChannelId,
    requested_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        title: String,
        uploader: String,
        stream_url: String,
        webpage_url: String,
        requested_by: UserId,
        origin_channel: ChannelId,
    ) -> Self {
        Self {
            title,
            uploader,
            duration: None,
            stream_url,
            webpage_url,
            thumbnail: None,
            requested_by,
            origin_channel,
            requested_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    // Getters

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn uploader(&self) -> &str {
        &self.uploader
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn webpage_url(&self) -> &str {
        &self.webpage_url
    }

    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    /// Canal de texto desde el que se pidió el track; ahí se anuncia
    /// el "now playing".
    pub fn origin_channel(&self) -> ChannelId {
        self.origin_channel
    }

    #[allow(dead_code)]
    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}
