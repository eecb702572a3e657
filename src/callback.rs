//! Real-time audio callback: pulls PCM frames from the active pipeline
//! slot, applies replay-gain, and feeds a visualizer ring buffer.
//!
//! try-lock only, no allocation on the hot path beyond the bounded scratch
//! buffer reused call to call, acquire/release atomics for cross-thread
//! flags.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use ringbuf::traits::Producer;
use ringbuf::HeapProd;

use crate::format::SampleFormat;
use crate::gain::{GainCalc, GainPreference};
use crate::pipeline::Pipeline;

/// Shared, lock-free signaling between the controller and the callback.
/// All fields are single-producer/single-consumer.
#[derive(Clone)]
pub struct CallbackFlags {
    pub phase_playing: Arc<AtomicBool>,
    pub skip_to_next: Arc<AtomicBool>,
    pub seek_requested: Arc<AtomicBool>,
    /// Target position for a pending seek, expressed as a fraction of
    /// `total_frames` in the 0..=1_000_000 range (fixed-point so it fits an
    /// atomic without a lock).
    pub seek_percent_micros: Arc<AtomicU32>,
    pub gain_pref: Arc<AtomicU8>,
}

impl Default for CallbackFlags {
    fn default() -> Self {
        Self {
            phase_playing: Arc::new(AtomicBool::new(false)),
            skip_to_next: Arc::new(AtomicBool::new(false)),
            seek_requested: Arc::new(AtomicBool::new(false)),
            seek_percent_micros: Arc::new(AtomicU32::new(0)),
            gain_pref: Arc::new(AtomicU8::new(GainPreference::Off as u8)),
        }
    }
}

impl CallbackFlags {
    fn gain_preference(&self) -> GainPreference {
        match self.gain_pref.load(Ordering::Relaxed) {
            1 => GainPreference::TrackFirst,
            2 => GainPreference::AlbumFirst,
            _ => GainPreference::Off,
        }
    }
}

/// A single frame batch's worth of bookkeeping the controller needs after
/// the callback runs: whether a track boundary or seek was serviced this
/// invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackReport {
    pub switched_track: Option<(u32, crate::format::AudioFormat)>,
    pub seek_applied: bool,
    pub reached_eof: bool,
}

/// Everything the real-time callback closure needs, captured once at
/// device-init time.
pub struct AudioCallback {
    pipeline: Arc<Pipeline>,
    flags: CallbackFlags,
    track_gain_db: Arc<std::sync::Mutex<(Option<f64>, Option<f64>)>>,
    device_channels: usize,
    scratch: Vec<f32>,
    visualizer: Option<HeapProd<f32>>,
    vis_scratch: Vec<f32>,
}

impl AudioCallback {
    #[must_use]
    pub fn new(
        pipeline: Arc<Pipeline>,
        flags: CallbackFlags,
        track_gain_db: Arc<std::sync::Mutex<(Option<f64>, Option<f64>)>>,
        device_channels: usize,
        visualizer: Option<HeapProd<f32>>,
    ) -> Self {
        Self {
            pipeline,
            flags,
            track_gain_db,
            device_channels,
            scratch: Vec::new(),
            visualizer,
            vis_scratch: Vec::new(),
        }
    }

    /// One real-time invocation: fill `output` (interleaved, `T`-typed
    /// samples at `device_channels` per frame) or silence it. Never blocks,
    /// never allocates on the steady-state path (the scratch buffers are
    /// cleared, not freed, between calls).
    pub fn write<T: cpal::SizedSample + cpal::FromSample<f32>>(&mut self, output: &mut [T]) -> CallbackReport {
        let silence = T::from_sample(0.0f32);
        let mut report = CallbackReport::default();

        // Step 1: stopped or paused writes silence and returns immediately.
        if !self.flags.phase_playing.load(Ordering::Acquire) {
            output.iter_mut().for_each(|s| *s = silence);
            return report;
        }

        // Step 2: try-lock pipeline; on contention, write silence for this
        // batch only — never block the real-time thread.
        // (Pipeline internally try-locks its own slot mutex; nothing here
        // blocks.)

        // Step 3: service a pending slot switch.
        if self.pipeline.switch_requested() {
            if let Some((track_id, format)) = self.pipeline.try_perform_switch() {
                report.switched_track = Some((track_id, format));
            } else {
                output.iter_mut().for_each(|s| *s = silence);
                return report;
            }
        }

        // Step 4: service a pending seek.
        if self.flags.seek_requested.swap(false, Ordering::AcqRel) {
            let percent = self.flags.seek_percent_micros.load(Ordering::Acquire) as f64 / 1_000_000.0;
            if let Some(total) = self.pipeline.try_active_total_frames() {
                let target = (percent * total as f64) as u64;
                if self.pipeline.try_seek_active(target).is_some() {
                    report.seek_applied = true;
                }
            }
        }

        // Step 5: read up to one frame batch from the active slot.
        let format = self.pipeline.active_format();
        let src_channels = format.map_or(self.device_channels, |f| f.channels as usize).max(1);
        let frames_wanted = (output.len() / self.device_channels.max(1)) as u64;

        self.scratch.clear();
        let read = self.pipeline.try_read_active(&mut self.scratch, frames_wanted);

        let Some(Ok(outcome)) = read else {
            output.iter_mut().for_each(|s| *s = silence);
            return report;
        };

        // Step 6: replay-gain.
        let (track_db, album_db) = *self.track_gain_db.lock().expect("gain mutex poisoned");
        let pref = self.flags.gain_preference();
        let db = GainCalc::effective_db(pref, track_db, album_db);
        let linear = GainCalc::db_to_linear(db);
        if linear != 1.0 {
            for sample in &mut self.scratch {
                *sample = GainCalc::apply(*sample, linear, SampleFormat::F32);
            }
        }

        // Step 7: down-mix to mono, publish to the visualizer ring buffer.
        self.publish_visualizer(src_channels);

        // Write interleaved frames to the device, remapping channel counts
        // if the decoder's layout differs from the device's.
        let dev_channels = self.device_channels.max(1);
        let mut src_idx = 0usize;
        for frame in output.chunks_mut(dev_channels) {
            for (ch, sample) in frame.iter_mut().enumerate() {
                let s = src_idx + (ch % src_channels);
                *sample = if s < self.scratch.len() {
                    T::from_sample(self.scratch[s])
                } else {
                    silence
                };
            }
            src_idx += src_channels;
        }

        // Step 8: decide whether to request the next switch.
        if outcome.reached_eof || self.flags.skip_to_next.swap(false, Ordering::AcqRel) {
            self.pipeline.mark_eof();
            report.reached_eof = true;
            if self.pipeline.is_next_ready() {
                self.pipeline.request_switch();
            }
        }

        report
    }

    fn publish_visualizer(&mut self, src_channels: usize) {
        let Some(producer) = self.visualizer.as_mut() else {
            return;
        };
        self.vis_scratch.clear();
        for frame in self.scratch.chunks(src_channels.max(1)) {
            let sum: f32 = frame.iter().sum();
            self.vis_scratch.push(sum / frame.len().max(1) as f32);
        }
        for sample in self.vis_scratch.drain(..) {
            let _ = producer.try_push(sample);
        }
    }
}
