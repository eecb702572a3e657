//! Publish/subscribe event bus connecting the playback core to external
//! sinks (MPRIS, Discord RPC, desktop notifications — none implemented
//! here, all external per the purpose-and-scope boundary).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::controller::PlaybackPhase;
use crate::format::AudioFormat;
use crate::playlist::RepeatMode;

/// Debounce interval for `PositionChanged`; every other event is emitted
/// immediately.
const POSITION_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub track_id: u32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_path: Option<String>,
    pub duration_s: f64,
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone)]
pub enum Event {
    TrackChanged(TrackInfo),
    PlaybackStatus(PlaybackPhase),
    /// Already debounced to `POSITION_DEBOUNCE` by the bus.
    PositionChanged(u64),
    Seeked(u64),
    VolumeChanged(u8),
    LoopStatus(RepeatMode),
    ShuffleChanged(bool),
    /// The pipeline tore down both decoder slots because a track boundary
    /// crossed an incompatible format; the host must rebuild its output
    /// stream before playback resumes.
    DeviceRebuildRequired(AudioFormat),
}

/// A non-blocking consumer of bus events. Sinks that would otherwise block
/// (network I/O, D-Bus calls) are expected to buffer internally or drop.
pub trait PlaybackEventSink: Send + Sync {
    fn on_event(&self, event: &Event);
}

struct Inner {
    sinks: Vec<Box<dyn PlaybackEventSink>>,
    last_position_emit: Option<Instant>,
}

/// Registers sinks and forwards events to each in publication order,
/// debouncing `PositionChanged`.
pub struct EventBus {
    inner: Mutex<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { sinks: Vec::new(), last_position_emit: None }),
        }
    }

    pub fn subscribe(&self, sink: Box<dyn PlaybackEventSink>) {
        self.inner.lock().expect("event bus mutex poisoned").sinks.push(sink);
    }

    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock().expect("event bus mutex poisoned");

        if let Event::PositionChanged(_) = &event {
            let now = Instant::now();
            let should_emit = match inner.last_position_emit {
                Some(last) => now.duration_since(last) >= POSITION_DEBOUNCE,
                None => true,
            };
            if !should_emit {
                return;
            }
            inner.last_position_emit = Some(now);
        }

        for sink in &inner.sinks {
            sink.on_event(&event);
        }
    }
}

/// Reference sink that forwards every event over a `crossbeam_channel`,
/// used by the test suite and by `main.rs`'s status-line printer. Mirrors
/// the "each sink is non-blocking" contract with a bounded, try-send-only
/// channel: a sink that can't keep up drops events rather than stalling
/// the publisher.
pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl PlaybackEventSink for ChannelSink {
    fn on_event(&self, event: &Event) {
        let _ = self.tx.try_send(event.clone());
    }
}
