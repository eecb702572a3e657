use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder as SymphoniaDecoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia_format_ogg::OggReader;

use super::{Decoder, DecoderError};
use crate::format::{AudioFormat, SampleFormat};

/// Ogg Vorbis via `symphonia-format-ogg` for demuxing and
/// `symphonia-codec-vorbis` for decoding, registered through symphonia's
/// codec table rather than symphonia's default probe since the extension
/// already disambiguates the container.
pub struct VorbisDecoder {
    reader: OggReader,
    decoder: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    audio_format: AudioFormat,
    total_frames: Option<u64>,
    cursor_frames: u64,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl Decoder for VorbisDecoder {
    fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let reader = OggReader::try_new(mss, &FormatOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        let track = reader
            .default_track()
            .ok_or_else(|| DecoderError::UnsupportedFormat("no vorbis track found".into()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecoderError::UnsupportedFormat("unknown sample rate".into()))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u8)
            .ok_or_else(|| DecoderError::UnsupportedFormat("unknown channel layout".into()))?;

        let audio_format = AudioFormat {
            sample_format: SampleFormat::F32,
            channels,
            sample_rate,
        };
        let total_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            audio_format,
            total_frames,
            cursor_frames: 0,
            sample_buf: None,
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

            let audio_buf = match self.decoder.decode(&packet) {
                Ok(buf) => buf,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(DecoderError::CorruptFile(e.to_string())),
            };

            let spec = *audio_buf.spec();
            let frames = audio_buf.frames() as u64;

            let buf = match &mut self.sample_buf {
                Some(existing) if existing.capacity() >= frames as usize * spec.channels.count() => existing,
                _ => {
                    self.sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
                    self.sample_buf.as_mut().expect("sample_buf was just assigned Some")
                }
            };
            buf.copy_interleaved_ref(audio_buf);
            out_buf.extend_from_slice(buf.samples());

            frames_read += frames;
            self.cursor_frames += frames;
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
        self.decoder.reset();
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
