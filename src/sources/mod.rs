//! Resolución de búsquedas y URLs a tracks reproducibles.

pub mod ytdlp;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, UserId};

use crate::audio::track::Track;
use crate::error::MusicError;

pub use ytdlp::YtDlpResolver;

/// Convierte una búsqueda o URL en un [`Track`] con metadatos y stream.
///
/// El resolver es el único punto de contacto con el mundo exterior para
/// obtener audio; un fallo aquí se reporta al usuario y nunca toca la cola.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync + 'static {
    async fn resolve(
        &self,
        query: &str,
        requested_by: UserId,
        origin_channel: ChannelId,
    ) -> Result<Track, MusicError>;
}
