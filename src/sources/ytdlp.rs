use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::{ChannelId, UserId};
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::audio::track::Track;
use crate::error::MusicError;
use crate::sources::SourceResolver;

/// Resolver basado en yt-dlp: extrae metadatos y la URL directa de audio
/// sin descargar el archivo.
pub struct YtDlpResolver;

impl YtDlpResolver {
    pub fn new() -> Self {
        Self
    }

    /// Verifica que yt-dlp esté instalado y pueda ejecutarse.
    pub async fn verify_dependencies() -> anyhow::Result<()> {
        let output = tokio::process::Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp versión: {}", version.trim());
                Ok(())
            }
            _ => {
                error!("❌ yt-dlp no encontrado. Instala con: pip install yt-dlp");
                anyhow::bail!("yt-dlp no disponible")
            }
        }
    }

    fn is_url(input: &str) -> bool {
        Url::parse(input)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    fn resolution_error(query: &str, reason: impl Into<String>) -> MusicError {
        MusicError::Resolution {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn resolve(
        &self,
        query: &str,
        requested_by: UserId,
        origin_channel: ChannelId,
    ) -> Result<Track, MusicError> {
        // Las búsquedas libres pasan por ytsearch; las URLs van directo.
        let target = if Self::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{query}")
        };

        debug!("🔍 Resolviendo: {}", target);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-playlist",
                "--format",
                "bestaudio/best",
                "--default-search",
                "ytsearch",
                "--socket-timeout",
                "30",
                "--retries",
                "3",
                "--no-warnings",
                "--quiet",
            ])
            .arg(&target)
            .output()
            .await
            .map_err(|e| {
                Self::resolution_error(query, format!("no se pudo ejecutar yt-dlp: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::resolution_error(query, stderr.trim().to_string()));
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout).map_err(|e| {
            Self::resolution_error(query, format!("respuesta de yt-dlp ilegible: {e}"))
        })?;

        Ok(info.into_track(requested_by, origin_channel))
    }
}

/// Subconjunto del JSON de `yt-dlp --dump-json` que nos interesa.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    webpage_url: String,
    /// URL directa del stream de audio elegido por `--format`
    url: String,
}

impl VideoInfo {
    fn into_track(self, requested_by: UserId, origin_channel: ChannelId) -> Track {
        let mut track = Track::new(
            self.title,
            self.uploader.unwrap_or_else(|| "desconocido".to_string()),
            self.url,
            self.webpage_url,
            requested_by,
            origin_channel,
        );
        if let Some(duration) = self.duration {
            track = track.with_duration(Duration::from_secs_f64(duration));
        }
        if let Some(thumbnail) = self.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn url_detection() {
        assert!(YtDlpResolver::is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(YtDlpResolver::is_url("http://example.com/audio.mp3"));
        assert!(!YtDlpResolver::is_url("lofi hip hop radio"));
        assert!(!YtDlpResolver::is_url("ftp://example.com/file"));
    }

    #[test]
    fn video_info_maps_to_track() {
        let raw = r#"{
            "title": "Una Canción",
            "uploader": "Alguien",
            "duration": 215.0,
            "thumbnail": "https://i.ytimg.com/vi/abc/hq720.jpg",
            "webpage_url": "https://www.youtube.com/watch?v=abc",
            "url": "https://cdn.example/audio.webm",
            "view_count": 12345
        }"#;

        let info: VideoInfo = serde_json::from_str(raw).unwrap();
        let track = info.into_track(UserId::new(3), ChannelId::new(4));

        assert_eq!(track.title(), "Una Canción");
        assert_eq!(track.uploader(), "Alguien");
        assert_eq!(track.duration(), Some(Duration::from_secs(215)));
        assert_eq!(track.stream_url(), "https://cdn.example/audio.webm");
        assert_eq!(track.webpage_url(), "https://www.youtube.com/watch?v=abc");
        assert_eq!(track.requested_by(), UserId::new(3));
    }

    #[test]
    fn missing_optional_fields_do_not_break_parsing() {
        let raw = r#"{
            "title": "Stream en vivo",
            "webpage_url": "https://www.youtube.com/watch?v=live",
            "url": "https://cdn.example/live"
        }"#;

        let info: VideoInfo = serde_json::from_str(raw).unwrap();
        let track = info.into_track(UserId::new(1), ChannelId::new(1));
        assert_eq!(track.uploader(), "desconocido");
        assert_eq!(track.duration(), None);
        assert_eq!(track.thumbnail(), None);
    }
}
