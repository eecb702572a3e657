use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder as SymphoniaDecoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;
use symphonia_codec_aac::AdtsReader;
use symphonia_format_isomp4::IsoMp4Reader;

use super::{Decoder, DecoderError};
use crate::format::{AudioFormat, SampleFormat};

/// Either of the two containers `kew` distinguishes for AAC: an MP4/M4A
/// box structure with a seekable sample table, or a bare ADTS elementary
/// stream with no frame index at all.
enum Container {
    Mp4(IsoMp4Reader),
    Adts(AdtsReader),
}

impl Container {
    fn next_packet(&mut self) -> symphonia::core::errors::Result<symphonia::core::formats::Packet> {
        match self {
            Container::Mp4(r) => r.next_packet(),
            Container::Adts(r) => r.next_packet(),
        }
    }

    fn seek(
        &mut self,
        mode: symphonia::core::formats::SeekMode,
        to: symphonia::core::formats::SeekTo,
    ) -> symphonia::core::errors::Result<symphonia::core::formats::SeekedTo> {
        match self {
            Container::Mp4(r) => r.seek(mode, to),
            Container::Adts(r) => r.seek(mode, to),
        }
    }
}

/// `.m4a` (ISO-BMFF container, seekable) and bare `.aac` (ADTS elementary
/// stream, not seekable — `total_frames` is `None` and `seek_to_frame`
/// always returns `NotSeekable`).
pub struct M4aDecoder {
    container: Container,
    decoder: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    audio_format: AudioFormat,
    total_frames: Option<u64>,
    seekable: bool,
    cursor_frames: u64,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl Decoder for M4aDecoder {
    fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        // Try the ISO-BMFF container first; if the box structure doesn't
        // parse, fall back to treating the file as bare ADTS.
        let (container, seekable) = match IsoMp4Reader::try_new(mss, &FormatOptions::default()) {
            Ok(reader) => (Container::Mp4(reader), true),
            Err(_) => {
                let file = File::open(path)?;
                let mss = MediaSourceStream::new(Box::new(file), Default::default());
                let reader = AdtsReader::try_new(mss, &FormatOptions::default())
                    .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;
                (Container::Adts(reader), false)
            }
        };

        let track = match &container {
            Container::Mp4(r) => r.default_track(),
            Container::Adts(r) => r.default_track(),
        }
        .ok_or_else(|| DecoderError::UnsupportedFormat("no AAC track found".into()))?;

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
        // ADTS has no sample table; total length is unknown until EOF.
        let total_frames = if seekable { track.codec_params.n_frames } else { None };

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        Ok(Self {
            container,
            decoder,
            track_id,
            audio_format,
            total_frames,
            seekable,
            cursor_frames: 0,
            sample_buf: None,
        })
    }

    fn read_frames(&mut self, out_buf: &mut Vec<f32>, requested: u64) -> Result<u64, DecoderError> {
        let mut frames_read = 0u64;

        while frames_read < requested {
            let packet = match self.container.next_packet() {
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
        if !self.seekable {
            return Err(DecoderError::NotSeekable);
        }

        use symphonia::core::formats::{SeekMode, SeekTo};
        use symphonia::core::units::TimeStamp;

        self.container
            .seek(
                SeekMode::Accurate,
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
