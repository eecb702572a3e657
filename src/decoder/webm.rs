use std::fs::File;
use std::path::Path;

use audiopus::coder::Decoder as OpusCoder;
use audiopus::{Channels as OpusChannels, SampleRate as OpusSampleRate};
use matroska_demuxer::{Frame, MatroskaFile, TrackType};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, Decoder as SymphoniaDecoder, DecoderOptions, CODEC_TYPE_VORBIS};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;

use super::{Decoder, DecoderError};
use crate::format::{AudioFormat, SampleFormat};

const OPUS_DECODE_RATE: u32 = 48_000;
const MAX_FRAME_SAMPLES_PER_CHANNEL: usize = 5_760;

enum CodecBackend {
    /// Symphonia has no Opus codec of its own; WebM's Opus audio is decoded
    /// directly through libopus via `audiopus`, the same crate the pack's
    /// Discord-voice examples use for Opus.
    Opus { coder: OpusCoder, pcm_scratch: Vec<f32> },
    Vorbis { decoder: Box<dyn SymphoniaDecoder>, sample_buf: Option<SampleBuffer<f32>> },
}

fn opus_channels(count: u8) -> Result<OpusChannels, DecoderError> {
    match count {
        1 => Ok(OpusChannels::Mono),
        2 => Ok(OpusChannels::Stereo),
        n => Err(DecoderError::UnsupportedFormat(format!("unsupported opus channel count: {n}"))),
    }
}

/// WebM via `matroska-demuxer`, a narrowly-scoped container parser. Vorbis
/// audio is handed to the same symphonia codec object `VorbisDecoder` above
/// uses; Opus audio is decoded via `audiopus`. `FormatProbe::compatible`
/// treats this decoder's reported format the same as every other one, no
/// WebM special case: a track boundary only forces a device rebuild when
/// the sample format, channel count, or sample rate actually changes.
pub struct WebmDecoder {
    mkv: MatroskaFile<File>,
    track_number: u64,
    backend: CodecBackend,
    audio_format: AudioFormat,
    cursor_frames: u64,
    frame: Frame,
}

impl Decoder for WebmDecoder {
    fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path)?;
        let mkv = MatroskaFile::open(file).map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        let track = mkv
            .tracks()
            .iter()
            .find(|t| t.track_type() == TrackType::Audio)
            .ok_or_else(|| DecoderError::UnsupportedFormat("no audio track found".into()))?;

        let track_number = track.track_number().get();
        let codec_id = track.codec_id().to_string();

        let sample_rate = track
            .audio()
            .map(|a| a.sampling_frequency() as u32)
            .ok_or_else(|| DecoderError::UnsupportedFormat("unknown sample rate".into()))?;
        let channels = track
            .audio()
            .map(|a| a.channels() as u8)
            .ok_or_else(|| DecoderError::UnsupportedFormat("unknown channel layout".into()))?;

        let (backend, audio_format) = if codec_id.contains("OPUS") {
            let coder = OpusCoder::new(OpusSampleRate::Hz48000, opus_channels(channels)?)
                .map_err(|e| DecoderError::UnsupportedFormat(format!("opus decoder init failed: {e}")))?;
            let format = AudioFormat {
                sample_format: SampleFormat::F32,
                channels,
                sample_rate: OPUS_DECODE_RATE,
            };
            (
                CodecBackend::Opus { coder, pcm_scratch: vec![0.0; MAX_FRAME_SAMPLES_PER_CHANNEL * channels as usize] },
                format,
            )
        } else if codec_id.contains("VORBIS") {
            let mut codec_params = CodecParameters::new();
            codec_params
                .for_codec(CODEC_TYPE_VORBIS)
                .with_sample_rate(sample_rate)
                .with_channels(symphonia::core::audio::Channels::from_bits_truncate((1u32 << channels) - 1));
            if let Some(priv_data) = track.codec_private() {
                codec_params.with_extra_data(priv_data.to_vec().into_boxed_slice());
            }
            let decoder = symphonia::default::get_codecs()
                .make(&codec_params, &DecoderOptions::default())
                .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;
            let format = AudioFormat { sample_format: SampleFormat::F32, channels, sample_rate };
            (CodecBackend::Vorbis { decoder, sample_buf: None }, format)
        } else {
            return Err(DecoderError::UnsupportedFormat(format!("unsupported WebM audio codec: {codec_id}")));
        };

        Ok(Self {
            mkv,
            track_number,
            backend,
            audio_format,
            cursor_frames: 0,
            frame: Frame::default(),
        })
    }

    fn read_frames(&mut self, out_buf: &mut Vec<f32>, requested: u64) -> Result<u64, DecoderError> {
        let mut frames_read = 0u64;

        while frames_read < requested {
            let got = self
                .mkv
                .next_frame(&mut self.frame)
                .map_err(|e| DecoderError::CorruptFile(e.to_string()))?;
            if !got {
                break;
            }
            if self.frame.track != self.track_number {
                continue;
            }

            let frames = match &mut self.backend {
                CodecBackend::Opus { coder, pcm_scratch } => {
                    let samples_per_channel = match coder.decode_float(Some(&self.frame.data), pcm_scratch, false) {
                        Ok(n) => n,
                        Err(e) => {
                            log::warn!("dropping malformed opus packet: {e}");
                            continue;
                        }
                    };
                    let channels = self.audio_format.channels as usize;
                    out_buf.extend_from_slice(&pcm_scratch[..samples_per_channel * channels]);
                    samples_per_channel as u64
                }
                CodecBackend::Vorbis { decoder, sample_buf } => {
                    let packet = Packet::new_from_slice(0, self.frame.timestamp, 0, &self.frame.data);
                    let audio_buf = match decoder.decode(&packet) {
                        Ok(buf) => buf,
                        Err(SymphoniaError::DecodeError(_)) => continue,
                        Err(e) => return Err(DecoderError::CorruptFile(e.to_string())),
                    };

                    let spec = *audio_buf.spec();
                    let frames = audio_buf.frames() as u64;

                    let buf = match sample_buf {
                        Some(existing) if existing.capacity() >= frames as usize * spec.channels.count() => existing,
                        _ => {
                            *sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
                            sample_buf.as_mut().expect("sample_buf was just assigned Some")
                        }
                    };
                    buf.copy_interleaved_ref(audio_buf);
                    out_buf.extend_from_slice(buf.samples());
                    frames
                }
            };

            frames_read += frames;
            self.cursor_frames += frames;
        }

        Ok(frames_read)
    }

    fn seek_to_frame(&mut self, target: u64) -> Result<(), DecoderError> {
        let sample_rate = self.audio_format.sample_rate as u64;
        if sample_rate == 0 {
            return Err(DecoderError::NotSeekable);
        }
        let ts_ns = target.saturating_mul(1_000_000_000) / sample_rate;
        self.mkv
            .seek(ts_ns)
            .map_err(|e| DecoderError::CorruptFile(e.to_string()))?;
        match &mut self.backend {
            CodecBackend::Opus { coder, .. } => {
                coder.reset_state().map_err(|e| DecoderError::CorruptFile(e.to_string()))?;
            }
            CodecBackend::Vorbis { decoder, .. } => decoder.reset(),
        }
        self.cursor_frames = target;
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.audio_format
    }

    fn total_frames(&self) -> Option<u64> {
        // matroska-demuxer exposes container duration, not a sample-accurate
        // frame count; treated as unknown like raw AAC.
        None
    }

    fn cursor_frames(&self) -> u64 {
        self.cursor_frames
    }
}
