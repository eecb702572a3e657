//! Gapless dual-slot audio playback core.
//!
//! This crate is the playback engine of a terminal music player: it turns an
//! ordered playlist of audio files into a continuous stream of PCM samples,
//! pre-loading the next track while the current one plays so that track
//! boundaries produce zero silent samples when formats allow it.
//!
//! Tag extraction, cover art, MPRIS/D-Bus transport and library scanning are
//! external collaborators reached through the [`event_bus::PlaybackEventSink`],
//! [`metadata::MetadataProvider`] and [`playlist::PlaylistStore`] traits.

pub mod callback;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod event_bus;
pub mod format;
pub mod gain;
pub mod metadata;
pub mod pipeline;
pub mod playlist;
pub mod track;

pub use controller::{PlaybackController, PlaybackPhase, PlaybackState};
pub use event_bus::{Event, EventBus, PlaybackEventSink};
pub use format::AudioFormat;
pub use pipeline::Pipeline;
pub use playlist::{Playlist, RepeatMode};
pub use track::Track;
