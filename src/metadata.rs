//! Trait boundaries for collaborators this crate does not implement: tag
//! extraction/cover art, and `.m3u` playlist persistence. Both are treated
//! as external per the purpose-and-scope boundary; this module only
//! defines the shapes the core needs from them.

use std::path::Path;

/// Metadata an external tag-reading collaborator supplies for a file path.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_s: Option<f64>,
    pub replaygain_track_db: Option<f64>,
    pub replaygain_album_db: Option<f64>,
    pub cover_bytes: Option<Vec<u8>>,
}

/// Given a file path, returns whatever tag/cover-art data is available.
/// Implemented outside this crate (ID3/Vorbis-comment/MP4-atom readers are
/// not part of the playback core).
pub trait MetadataProvider: Send + Sync {
    fn read(&self, path: &Path) -> TrackMetadata;
}

/// Reads and writes the plain-text `.m3u` format: one absolute or relative
/// path per line, `#`-prefixed lines ignored. Implemented outside this
/// crate; the core only needs the resulting path list to build a
/// `Playlist`.
pub trait PlaylistStore: Send + Sync {
    fn load_paths(&self, path: &Path) -> std::io::Result<Vec<String>>;
    fn save_paths(&self, path: &Path, entries: &[String]) -> std::io::Result<()>;
}
