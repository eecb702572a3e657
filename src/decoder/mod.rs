//! Codec-polymorphic, seekable PCM data source.

mod builtin;
mod m4a;
mod opus;
mod vorbis;
mod webm;

pub use builtin::BuiltinDecoder;
pub use m4a::M4aDecoder;
pub use opus::OpusDecoder;
pub use vorbis::VorbisDecoder;
pub use webm::WebmDecoder;

use std::fmt;
use std::path::Path;

use crate::format::AudioFormat;

/// Errors a `Decoder` implementation can raise.
#[derive(Debug)]
pub enum DecoderError {
    Io(std::io::Error),
    UnsupportedFormat(String),
    CorruptFile(String),
    NotSeekable,
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::Io(e) => write!(f, "I/O error: {e}"),
            DecoderError::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
            DecoderError::CorruptFile(msg) => write!(f, "corrupt file: {msg}"),
            DecoderError::NotSeekable => write!(f, "stream has no frame index, cannot seek"),
        }
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecoderError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecoderError {
    fn from(e: std::io::Error) -> Self {
        DecoderError::Io(e)
    }
}

/// A uniform, seekable PCM interface over a single audio file, implemented
/// once per supported container/codec combination.
///
/// Implementations decode on demand: `read_frames` must not materialize the
/// whole file, since the pipeline pulls bounded batches while the track is
/// still playing.
pub trait Decoder: Send {
    /// Open `path`, probe its container/codec and ready the decoder for
    /// reading. Must not read audio data beyond what's needed to determine
    /// the format.
    fn open(path: &Path) -> Result<Self, DecoderError>
    where
        Self: Sized;

    /// Read up to `requested` interleaved PCM frames into `out_buf`
    /// (appended, not overwritten). Returns the number of frames actually
    /// read; 0 means end of stream.
    fn read_frames(&mut self, out_buf: &mut Vec<f32>, requested: u64) -> Result<u64, DecoderError>;

    /// Seek to an absolute frame position. Streams without a frame index
    /// (e.g. bare ADTS AAC) return `NotSeekable`.
    fn seek_to_frame(&mut self, target: u64) -> Result<(), DecoderError>;

    fn format(&self) -> AudioFormat;

    /// `None` for streams of unknown total length.
    fn total_frames(&self) -> Option<u64>;

    fn cursor_frames(&self) -> u64;
}

/// Open `path` with the decoder implementation registered for its extension,
/// falling back to `BuiltinDecoder`'s content-sniffing probe when the
/// extension is missing or unrecognized.
pub fn open(path: &Path) -> Result<Box<dyn Decoder>, DecoderError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("opus") => Ok(Box::new(OpusDecoder::open(path)?)),
        Some("ogg") => Ok(Box::new(VorbisDecoder::open(path)?)),
        Some("webm") => Ok(Box::new(WebmDecoder::open(path)?)),
        Some("m4a") | Some("aac") => Ok(Box::new(M4aDecoder::open(path)?)),
        // wav/flac/mp3 and anything unrecognized fall through to the
        // built-in probe, which sniffs content when the extension hint
        // fails to resolve a format.
        _ => Ok(Box::new(BuiltinDecoder::open(path)?)),
    }
}
