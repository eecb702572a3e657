use std::fs::File;
use std::path::Path;

use audiopus::coder::Decoder as OpusCoder;
use audiopus::{Channels as OpusChannels, SampleRate as OpusSampleRate};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia_format_ogg::OggReader;

use super::{Decoder, DecoderError};
use crate::format::{AudioFormat, SampleFormat};

/// libopus always decodes at one of a handful of fixed rates; 48kHz is the
/// native Opus rate and what every Ogg Opus encoder in practice targets.
const OPUS_DECODE_RATE: u32 = 48_000;
/// Largest Opus frame is 120ms; at 48kHz that's 5760 samples per channel.
const MAX_FRAME_SAMPLES_PER_CHANNEL: usize = 5_760;

/// Opus-in-Ogg. `symphonia-format-ogg` only demuxes the container; Symphonia
/// ships no Opus codec, so decoding itself goes through `audiopus`'s libopus
/// bindings, the same crate the pack's Discord-voice examples use for Opus.
pub struct OpusDecoder {
    reader: OggReader,
    coder: OpusCoder,
    track_id: u32,
    audio_format: AudioFormat,
    total_frames: Option<u64>,
    cursor_frames: u64,
    pcm_scratch: Vec<f32>,
}

fn opus_channels(count: u8) -> Result<OpusChannels, DecoderError> {
    match count {
        1 => Ok(OpusChannels::Mono),
        2 => Ok(OpusChannels::Stereo),
        n => Err(DecoderError::UnsupportedFormat(format!("unsupported opus channel count: {n}"))),
    }
}

impl Decoder for OpusDecoder {
    fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let reader = OggReader::try_new(mss, &FormatOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        let track = reader
            .default_track()
            .ok_or_else(|| DecoderError::UnsupportedFormat("no opus track found".into()))?;

        let track_id = track.id;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u8)
            .ok_or_else(|| DecoderError::UnsupportedFormat("unknown channel layout".into()))?;
        let total_frames = track.codec_params.n_frames;

        let coder = OpusCoder::new(OpusSampleRate::Hz48000, opus_channels(channels)?)
            .map_err(|e| DecoderError::UnsupportedFormat(format!("opus decoder init failed: {e}")))?;

        let audio_format = AudioFormat {
            sample_format: SampleFormat::F32,
            channels,
            sample_rate: OPUS_DECODE_RATE,
        };

        Ok(Self {
            reader,
            coder,
            track_id,
            audio_format,
            total_frames,
            cursor_frames: 0,
            pcm_scratch: vec![0.0; MAX_FRAME_SAMPLES_PER_CHANNEL * channels as usize],
        })
    }

    fn read_frames(&mut self, out_buf: &mut Vec<f32>, requested: u64) -> Result<u64, DecoderError> {
        let mut frames_read = 0u64;

        while frames_read < requested {
            let packet = match self.reader.next_packet() {
                Ok(pkt) => pkt,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(DecoderError::CorruptFile(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let samples_per_channel = match self.coder.decode_float(Some(packet.data()), &mut self.pcm_scratch, false) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("dropping malformed opus packet: {e}");
                    continue;
                }
            };
            let channels = self.audio_format.channels as usize;
            out_buf.extend_from_slice(&self.pcm_scratch[..samples_per_channel * channels]);

            frames_read += samples_per_channel as u64;
            self.cursor_frames += samples_per_channel as u64;
        }

        Ok(frames_read)
    }

    fn seek_to_frame(&mut self, target: u64) -> Result<(), DecoderError> {
        use symphonia::core::formats::{SeekMode, SeekTo};
        use symphonia::core::units::TimeStamp;

        self.reader
            .seek(
                SeekMode::Coarse,
                SeekTo::TimeStamp {
                    ts: target as TimeStamp,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| DecoderError::CorruptFile(e.to_string()))?;
        self.coder.reset_state().map_err(|e| DecoderError::CorruptFile(e.to_string()))?;
        self.cursor_frames = target;
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.audio_format
    }

    fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    fn cursor_frames(&self) -> u64 {
        self.cursor_frames
    }
}
