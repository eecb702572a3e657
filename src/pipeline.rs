//! Dual-slot pre-load pipeline.
//!
//! Owns the two `DecoderSlot`s the real-time callback reads from. The
//! callback never blocks on `slots`: it uses `try_lock` and writes silence
//! for the batch if the loader or controller currently holds the lock.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::decoder::{self, Decoder, DecoderError};
use crate::format::{AudioFormat, FormatProbe};

const LOAD_FIRST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSlot {
    A,
    B,
}

impl ActiveSlot {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            ActiveSlot::A => ActiveSlot::B,
            ActiveSlot::B => ActiveSlot::A,
        }
    }

    fn from_tag(tag: u8) -> Self {
        if tag == 0 {
            ActiveSlot::A
        } else {
            ActiveSlot::B
        }
    }

    fn tag(self) -> u8 {
        match self {
            ActiveSlot::A => 0,
            ActiveSlot::B => 1,
        }
    }
}

/// One of the pipeline's two decoder storage locations.
pub struct DecoderSlot {
    pub decoder: Box<dyn Decoder>,
    pub track_id: u32,
    pub format: AudioFormat,
    pub total_frames: Option<u64>,
    pub cursor_frames: u64,
    /// Marked semantically empty while memory is still being reclaimed —
    /// lets `stop()` cancel an in-flight preload without racing the loader.
    pub deleted: bool,
}

#[derive(Debug)]
pub enum PipelineError {
    Decoder(DecoderError),
    LoadTimeout,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Decoder(e) => write!(f, "{e}"),
            PipelineError::LoadTimeout => write!(f, "load_first did not complete within 10s"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<DecoderError> for PipelineError {
    fn from(e: DecoderError) -> Self {
        PipelineError::Decoder(e)
    }
}

struct Slots {
    slot_a: Option<DecoderSlot>,
    slot_b: Option<DecoderSlot>,
}

/// Outcome of a try-locked read from the active slot, reported back to the
/// callback for it to decide whether to advance to the next slot.
pub struct ReadOutcome {
    pub frames_read: u64,
    pub reached_eof: bool,
    pub track_id: u32,
}

pub struct Pipeline {
    slots: Mutex<Slots>,
    active: AtomicU8,
    loading: AtomicBool,
    switch_requested: AtomicBool,
    eof_reached: AtomicBool,
    impl_switch_reached: AtomicBool,
    /// Bumped on every `preload_next`/`cancel_preload` call; a loader thread
    /// compares its captured generation before writing its result so a
    /// superseded load is silently discarded.
    generation: AtomicU64,
    device_format: Mutex<Option<AudioFormat>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots { slot_a: None, slot_b: None }),
            active: AtomicU8::new(ActiveSlot::A.tag()),
            loading: AtomicBool::new(false),
            switch_requested: AtomicBool::new(false),
            eof_reached: AtomicBool::new(false),
            impl_switch_reached: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            device_format: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn active(&self) -> ActiveSlot {
        ActiveSlot::from_tag(self.active.load(Ordering::Acquire))
    }

    /// Synchronously open `path` into slot A. Blocks the caller (the
    /// controller, on the UI thread) until the decoder reports ready or
    /// `LOAD_FIRST_TIMEOUT` elapses. The open itself runs on a worker thread
    /// so a stalled `decoder::open` (a wedged network mount, a corrupt file
    /// symphonia's probe spins on) can't block the UI thread past the bound
    /// — the worker is abandoned and its eventual result dropped.
    pub fn load_first(&self, path: &PathBuf, track_id: u32) -> Result<AudioFormat, PipelineError> {
        let path = path.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::Builder::new()
            .name("pipeline-load-first".into())
            .spawn(move || {
                let _ = tx.send(decoder::open(&path));
            })
            .expect("failed to spawn load_first worker thread");

        let dec = match rx.recv_timeout(LOAD_FIRST_TIMEOUT) {
            Ok(opened) => opened?,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => return Err(PipelineError::LoadTimeout),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(PipelineError::LoadTimeout);
            }
        };

        let format = dec.format();
        let slot = DecoderSlot {
            total_frames: dec.total_frames(),
            cursor_frames: dec.cursor_frames(),
            decoder: dec,
            track_id,
            format,
            deleted: false,
        };

        let mut slots = self.slots.lock().expect("pipeline slots mutex poisoned");
        slots.slot_a = Some(slot);
        slots.slot_b = None;
        drop(slots);

        self.active.store(ActiveSlot::A.tag(), Ordering::Release);
        self.eof_reached.store(false, Ordering::Release);
        self.switch_requested.store(false, Ordering::Release);
        *self.device_format.lock().expect("device format mutex poisoned") = Some(format);

        Ok(format)
    }

    /// Spawn a loader thread that fills the currently inactive slot with
    /// `path`. Non-blocking; a later call before this one finishes
    /// supersedes it via the generation counter.
    pub fn preload_next(self: &Arc<Self>, path: PathBuf, track_id: u32) {
        let my_gen = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.loading.store(true, Ordering::Release);

        let pipeline = Arc::clone(self);
        std::thread::Builder::new()
            .name("pipeline-loader".into())
            .spawn(move || {
                let opened = decoder::open(&path);

                // A newer preload (or a cancel) arrived while we were
                // decoding the header; discard our result.
                if pipeline.generation.load(Ordering::Acquire) != my_gen {
                    pipeline.loading.store(false, Ordering::Release);
                    return;
                }

                let dec = match opened {
                    Ok(dec) => dec,
                    Err(e) => {
                        log::warn!("preload of {} failed: {e}", path.display());
                        pipeline.loading.store(false, Ordering::Release);
                        return;
                    }
                };

                let format = dec.format();
                let slot = DecoderSlot {
                    total_frames: dec.total_frames(),
                    cursor_frames: dec.cursor_frames(),
                    decoder: dec,
                    track_id,
                    format,
                    deleted: false,
                };

                let mut slots = pipeline.slots.lock().expect("pipeline slots mutex poisoned");
                if pipeline.generation.load(Ordering::Acquire) != my_gen {
                    return;
                }
                match pipeline.active() {
                    ActiveSlot::A => slots.slot_b = Some(slot),
                    ActiveSlot::B => slots.slot_a = Some(slot),
                }
                drop(slots);
                pipeline.loading.store(false, Ordering::Release);
            })
            .expect("failed to spawn pipeline loader thread");
    }

    /// Cancel any in-flight preload; the loader will observe the bumped
    /// generation and discard its result instead of writing into a slot
    /// `stop()` is about to tear down.
    pub fn cancel_preload(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.loading.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_next_ready(&self) -> bool {
        let slots = self.slots.lock().expect("pipeline slots mutex poisoned");
        match self.active() {
            ActiveSlot::A => slots.slot_b.as_ref().is_some_and(|s| !s.deleted),
            ActiveSlot::B => slots.slot_a.as_ref().is_some_and(|s| !s.deleted),
        }
    }

    pub fn request_switch(&self) {
        self.switch_requested.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn switch_requested(&self) -> bool {
        self.switch_requested.load(Ordering::Acquire)
    }

    pub fn mark_eof(&self) {
        self.eof_reached.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn take_eof(&self) -> bool {
        self.eof_reached.swap(false, Ordering::AcqRel)
    }

    pub fn mark_impl_switch_reached(&self) {
        self.impl_switch_reached.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn take_impl_switch_reached(&self) -> bool {
        self.impl_switch_reached.swap(false, Ordering::AcqRel)
    }

    /// Try to flip the active slot, used by the audio callback. Returns
    /// `None` immediately if the slots mutex is contended (the callback
    /// must then write silence for this buffer and retry next time).
    #[must_use]
    pub fn try_perform_switch(&self) -> Option<(u32, AudioFormat)> {
        let mut slots = self.slots.try_lock().ok()?;
        let new_active = self.active().flipped();
        self.active.store(new_active.tag(), Ordering::Release);
        self.switch_requested.store(false, Ordering::Release);

        let slot = match new_active {
            ActiveSlot::A => slots.slot_a.as_mut(),
            ActiveSlot::B => slots.slot_b.as_mut(),
        }?;
        slot.cursor_frames = 0;
        Some((slot.track_id, slot.format))
    }

    /// Try to read up to `requested` frames from the active slot. `None`
    /// means the lock was contended; the callback writes silence instead.
    pub fn try_read_active(&self, out_buf: &mut Vec<f32>, requested: u64) -> Option<Result<ReadOutcome, DecoderError>> {
        let mut slots = self.slots.try_lock().ok()?;
        let slot = match self.active() {
            ActiveSlot::A => slots.slot_a.as_mut(),
            ActiveSlot::B => slots.slot_b.as_mut(),
        }?;

        let track_id = slot.track_id;
        match slot.decoder.read_frames(out_buf, requested) {
            Ok(frames_read) => {
                slot.cursor_frames += frames_read;
                let exhausted_by_count = slot
                    .total_frames
                    .is_some_and(|total| slot.cursor_frames >= total);
                Some(Ok(ReadOutcome {
                    frames_read,
                    reached_eof: frames_read < requested || exhausted_by_count,
                    track_id,
                }))
            }
            // Mid-stream read failure is treated as EOF for this track.
            Err(e) => {
                log::warn!("read error on active slot, treating as EOF: {e}");
                Some(Ok(ReadOutcome {
                    frames_read: 0,
                    reached_eof: true,
                    track_id,
                }))
            }
        }
    }

    /// Try to seek the active slot. `None` means the lock was contended;
    /// the controller should retry the seek on a later callback iteration.
    pub fn try_seek_active(&self, target_frame: u64) -> Option<Result<(), DecoderError>> {
        let mut slots = self.slots.try_lock().ok()?;
        let slot = match self.active() {
            ActiveSlot::A => slots.slot_a.as_mut(),
            ActiveSlot::B => slots.slot_b.as_mut(),
        }?;
        Some(match slot.decoder.seek_to_frame(target_frame) {
            Ok(()) => {
                slot.cursor_frames = target_frame;
                Ok(())
            }
            Err(e) => {
                log::warn!("seek cancelled: {e}");
                Err(e)
            }
        })
    }

    #[must_use]
    pub fn active_format(&self) -> Option<AudioFormat> {
        let slots = self.slots.lock().expect("pipeline slots mutex poisoned");
        match self.active() {
            ActiveSlot::A => slots.slot_a.as_ref().map(|s| s.format),
            ActiveSlot::B => slots.slot_b.as_ref().map(|s| s.format),
        }
    }

    /// Non-blocking: `None` both when the lock is contended and when the
    /// active track's length is genuinely unknown. Either way the caller
    /// (the real-time callback, computing a seek target) should skip this
    /// batch and retry later.
    #[must_use]
    pub fn try_active_total_frames(&self) -> Option<u64> {
        let slots = self.slots.try_lock().ok()?;
        match self.active() {
            ActiveSlot::A => slots.slot_a.as_ref().and_then(|s| s.total_frames),
            ActiveSlot::B => slots.slot_b.as_ref().and_then(|s| s.total_frames),
        }
    }

    /// Compare `next_format` against the currently initialized device
    /// format; if incompatible, drop both slots so the controller can
    /// reinitialize the device from scratch. The callback is guaranteed not
    /// to be invoked during this window because the controller stops the
    /// stream before calling this.
    pub fn rebuild_if_incompatible(&self, next_format: AudioFormat) -> bool {
        let mut device_format = self.device_format.lock().expect("device format mutex poisoned");
        let incompatible = match *device_format {
            Some(current) => !FormatProbe::compatible(&current, &next_format),
            None => false,
        };
        if incompatible {
            let mut slots = self.slots.lock().expect("pipeline slots mutex poisoned");
            slots.slot_a = None;
            slots.slot_b = None;
            *device_format = Some(next_format);
        }
        incompatible
    }

    pub fn set_device_format(&self, format: AudioFormat) {
        *self.device_format.lock().expect("device format mutex poisoned") = Some(format);
    }

    #[must_use]
    pub fn device_format(&self) -> Option<AudioFormat> {
        *self.device_format.lock().expect("device format mutex poisoned")
    }

    /// Seek the active slot to frame 0, used by `stop()`.
    pub fn rewind_active(&self) {
        let mut slots = self.slots.lock().expect("pipeline slots mutex poisoned");
        if let Some(slot) = match self.active() {
            ActiveSlot::A => slots.slot_a.as_mut(),
            ActiveSlot::B => slots.slot_b.as_mut(),
        } {
            let _ = slot.decoder.seek_to_frame(0);
            slot.cursor_frames = 0;
        }
    }
}

