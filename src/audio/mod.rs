//! # Audio Module
//!
//! Playback core of Brisk Music.
//!
//! One [`PlaybackSession`] exists per guild, owning a [`TrackQueue`], the
//! skip-vote state and a single background consumer task that plays tracks
//! one at a time. The [`SessionManager`] is the process-wide registry with
//! atomic get-or-create, and the only structure shared across guilds.
//!
//! Sessions end in exactly two ways: an explicit `/leave` (or external
//! disconnect) and the idle timeout of the consumer task. Both paths run the
//! same explicit shutdown; nothing relies on destructors.
//!
//! [`PlaybackSession`]: session::PlaybackSession
//! [`TrackQueue`]: queue::TrackQueue
//! [`SessionManager`]: manager::SessionManager

pub mod manager;
pub mod queue;
pub mod session;
pub mod track;
pub mod votes;
