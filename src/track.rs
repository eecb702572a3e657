//! Playlist track metadata.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TRACK_ID: AtomicU32 = AtomicU32::new(1);

/// An immutable playlist entry.
///
/// `id` is assigned once, on enqueue, and is never reused within a session
/// even if the track is later removed from the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u32,
    pub file_path: String,
    pub duration_s: f64,
    pub avg_bitrate_kbps: u32,
    pub replaygain_track_db: Option<f64>,
    pub replaygain_album_db: Option<f64>,
}

impl Track {
    /// Build a track from its file path and whatever metadata the caller
    /// already has on hand (typically supplied by an external
    /// `MetadataProvider`). Assigns the next monotonic id.
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        duration_s: f64,
        avg_bitrate_kbps: u32,
        replaygain_track_db: Option<f64>,
        replaygain_album_db: Option<f64>,
    ) -> Self {
        Self {
            id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
            file_path: file_path.into(),
            duration_s,
            avg_bitrate_kbps,
            replaygain_track_db,
            replaygain_album_db,
        }
    }
}

