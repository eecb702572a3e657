use std::path::PathBuf;

use voiceforge::decoder::{self, BuiltinDecoder, Decoder, DecoderError, M4aDecoder, OpusDecoder, VorbisDecoder, WebmDecoder};
use voiceforge::format::SampleFormat;

/// Writes a short mono or stereo 16-bit PCM WAV fixture and returns its path.
/// The file lives under `dir` (a `tempfile::TempDir` kept alive by the
/// caller) so it's cleaned up automatically.
fn write_wav_fixture(dir: &std::path::Path, name: &str, sample_rate: u32, channels: u16, frames: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("failed to create wav fixture");
    for i in 0..frames {
        // A simple ramp rather than silence, so reads are distinguishable.
        let sample = ((i % 1000) as i16) - 500;
        for _ in 0..channels {
            writer.write_sample(sample).expect("failed to write wav sample");
        }
    }
    writer.finalize().expect("failed to finalize wav fixture");
    path
}

#[test]
fn builtin_decoder_reports_format_from_wav_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_wav_fixture(dir.path(), "stereo.wav", 44_100, 2, 4_410);

    let dec = BuiltinDecoder::open(&path).expect("open wav fixture");
    let format = dec.format();
    assert_eq!(format.sample_format, SampleFormat::F32);
    assert_eq!(format.channels, 2);
    assert_eq!(format.sample_rate, 44_100);
    assert_eq!(dec.total_frames(), Some(4_410));
    assert_eq!(dec.cursor_frames(), 0);
}

#[test]
fn builtin_decoder_reads_all_frames_across_batches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_wav_fixture(dir.path(), "mono.wav", 48_000, 1, 2_000);

    let mut dec = BuiltinDecoder::open(&path).expect("open wav fixture");
    let mut out = Vec::new();
    let mut total = 0u64;

    loop {
        let before = out.len();
        let read = dec.read_frames(&mut out, 256).expect("read_frames");
        total += read;
        if read == 0 {
            break;
        }
        assert_eq!(out.len() - before, read as usize);
    }

    assert_eq!(total, 2_000);
    assert_eq!(dec.cursor_frames(), 2_000);
    // A second read past EOF is a no-op, not an error.
    let read = dec.read_frames(&mut out, 256).expect("read past eof");
    assert_eq!(read, 0);
}

#[test]
fn builtin_decoder_seek_resets_cursor_and_replays_from_target() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_wav_fixture(dir.path(), "seek.wav", 44_100, 1, 1_000);

    let mut dec = BuiltinDecoder::open(&path).expect("open wav fixture");
    let mut out = Vec::new();
    dec.read_frames(&mut out, 500).expect("initial read");
    assert_eq!(dec.cursor_frames(), 500);

    dec.seek_to_frame(100).expect("seek");
    assert_eq!(dec.cursor_frames(), 100);

    out.clear();
    let read = dec.read_frames(&mut out, 50).expect("read after seek");
    assert_eq!(read, 50);
    assert_eq!(dec.cursor_frames(), 150);
}

#[test]
fn builtin_decoder_rejects_non_audio_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.wav");
    std::fs::write(&path, b"this is not a wav file").expect("write garbage");

    let err = BuiltinDecoder::open(&path).expect_err("garbage bytes must not probe as audio");
    assert!(matches!(err, DecoderError::UnsupportedFormat(_)));
}

#[test]
fn open_dispatches_unrecognized_extension_to_builtin_probe() {
    let dir = tempfile::tempdir().expect("tempdir");
    // No extension at all: must still land on BuiltinDecoder's content sniff.
    let path = write_wav_fixture(dir.path(), "no_extension", 44_100, 1, 100);
    let dec = decoder::open(&path).expect("open via extension-less dispatch");
    assert_eq!(dec.format().sample_rate, 44_100);
}

#[test]
fn open_missing_file_is_an_io_error_for_every_extension() {
    for ext in ["wav", "flac", "mp3", "ogg", "opus", "webm", "m4a", "aac"] {
        let path = PathBuf::from(format!("/nonexistent/track.{ext}"));
        let err = decoder::open(&path).expect_err("missing file must not open");
        assert!(matches!(err, DecoderError::Io(_)), "extension {ext} did not surface an I/O error");
    }
}

#[test]
fn opus_decoder_rejects_non_ogg_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.opus");
    std::fs::write(&path, b"not an ogg opus stream").expect("write garbage");

    let err = OpusDecoder::open(&path).expect_err("garbage bytes must not probe as ogg");
    assert!(matches!(err, DecoderError::UnsupportedFormat(_)));
}

#[test]
fn vorbis_decoder_rejects_non_ogg_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.ogg");
    std::fs::write(&path, b"not an ogg vorbis stream").expect("write garbage");

    let err = VorbisDecoder::open(&path).expect_err("garbage bytes must not probe as ogg");
    assert!(matches!(err, DecoderError::UnsupportedFormat(_)));
}

#[test]
fn webm_decoder_rejects_non_matroska_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.webm");
    std::fs::write(&path, b"not a matroska container").expect("write garbage");

    let err = WebmDecoder::open(&path).expect_err("garbage bytes must not probe as matroska");
    assert!(matches!(err, DecoderError::UnsupportedFormat(_)));
}

#[test]
fn m4a_decoder_rejects_content_that_is_neither_mp4_nor_adts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.m4a");
    std::fs::write(&path, b"not an mp4 box or adts stream").expect("write garbage");

    let err = M4aDecoder::open(&path).expect_err("garbage bytes must not probe as mp4 or adts");
    assert!(matches!(err, DecoderError::UnsupportedFormat(_)));
}
