//! User-facing playback state machine.
//!
//! Runs on the UI thread. Talks to the `Pipeline` for decode state and to
//! the `Playlist` for track order; publishes `EventBus` events for every
//! transition an external sink (MPRIS, Discord RPC, notifications) cares
//! about.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::callback::{CallbackFlags, CallbackReport};
use crate::decoder::DecoderError;
use crate::event_bus::{Event, EventBus, TrackInfo};
use crate::format::FormatProbe;
use crate::pipeline::{Pipeline, PipelineError};
use crate::playlist::{NodeRef, Playlist, RepeatMode};
use crate::track::Track;

/// Shared with the real-time callback: the current track's replay-gain tags,
/// `(track_db, album_db)`.
pub type TrackGain = Arc<Mutex<(Option<f64>, Option<f64>)>>;

/// Two rapid skip presses within this window: the second is dropped.
const SKIP_COOLDOWN: Duration = Duration::from_millis(500);
/// Within this window of the track start, `skip_prev` goes to the previous
/// track instead of rewinding the current one.
const SKIP_PREV_REWIND_WINDOW: Duration = Duration::from_secs(2);
/// Consecutive decoder-open failures tolerated before surfacing
/// `PlaylistExhausted` to the user.
const MAX_CONSECUTIVE_LOAD_FAILURES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
pub enum ControllerError {
    Pipeline(PipelineError),
    PlaylistEmpty,
    PlaylistExhausted,
    DeviceInitFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Pipeline(e) => write!(f, "{e}"),
            ControllerError::PlaylistEmpty => write!(f, "playlist is empty"),
            ControllerError::PlaylistExhausted => {
                write!(f, "too many consecutive tracks failed to load")
            }
            ControllerError::DeviceInitFailed(msg) => write!(f, "device init failed: {msg}"),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<PipelineError> for ControllerError {
    fn from(e: PipelineError) -> Self {
        ControllerError::Pipeline(e)
    }
}

struct State {
    current_node: Option<NodeRef>,
    next_node: Option<NodeRef>,
    phase: PlaybackPhase,
    elapsed_s: f64,
    seek_accum_s: f64,
    repeat_mode: RepeatMode,
    shuffle: bool,
    volume_percent: u8,
    song_loading: bool,
    skipping: bool,
    force_skip: bool,
    song_has_errors: bool,
    has_silently_switched: bool,
    pause_instant: Option<Instant>,
    total_pause_secs: f64,
    last_skip_at: Option<Instant>,
    track_started_at: Option<Instant>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            current_node: None,
            next_node: None,
            phase: PlaybackPhase::Stopped,
            elapsed_s: 0.0,
            seek_accum_s: 0.0,
            repeat_mode: RepeatMode::Off,
            shuffle: false,
            volume_percent: 100,
            song_loading: false,
            skipping: false,
            force_skip: false,
            song_has_errors: false,
            has_silently_switched: false,
            pause_instant: None,
            total_pause_secs: 0.0,
            last_skip_at: None,
            track_started_at: None,
        }
    }
}

/// The backing state plus the atomics callback.rs reads. Kept as a
/// separate struct so `PlaybackController` can expose it read-only for
/// tests and UI polling.
pub struct PlaybackState {
    state: Mutex<State>,
}

impl PlaybackState {
    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.state.lock().expect("controller state mutex poisoned").phase
    }

    #[must_use]
    pub fn elapsed_s(&self) -> f64 {
        self.state.lock().expect("controller state mutex poisoned").elapsed_s
    }

    #[must_use]
    pub fn volume_percent(&self) -> u8 {
        self.state.lock().expect("controller state mutex poisoned").volume_percent
    }

    #[must_use]
    pub fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().expect("controller state mutex poisoned").repeat_mode
    }

    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.state.lock().expect("controller state mutex poisoned").shuffle
    }
}

pub struct PlaybackController {
    playlist: Arc<Playlist>,
    pipeline: Arc<Pipeline>,
    events: Arc<EventBus>,
    flags: CallbackFlags,
    track_gain: TrackGain,
    state: PlaybackState,
}

impl PlaybackController {
    #[must_use]
    pub fn new(
        playlist: Arc<Playlist>,
        pipeline: Arc<Pipeline>,
        events: Arc<EventBus>,
        flags: CallbackFlags,
        track_gain: TrackGain,
    ) -> Self {
        Self {
            playlist,
            pipeline,
            events,
            flags,
            track_gain,
            state: PlaybackState { state: Mutex::new(State::default()) },
        }
    }

    /// Publish `track`'s replay-gain tags into the state the real-time
    /// callback reads, so the next batch it writes is scaled for the track
    /// that's actually playing rather than whatever was current before.
    fn update_gain(&self, track: &Track) {
        *self.track_gain.lock().expect("gain mutex poisoned") = (track.replaygain_track_db, track.replaygain_album_db);
    }

    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    fn track_info(&self, node: NodeRef, track: &Track) -> TrackInfo {
        TrackInfo {
            track_id: track.id,
            title: track.file_path.clone(),
            artist: String::new(),
            album: String::new(),
            cover_path: None,
            duration_s: track.duration_s,
            can_go_prev: self.playlist.prev_from(node).is_some(),
            can_go_next: self.playlist.next_from(node, RepeatMode::Off).is_some(),
        }
    }

    /// Load and start playing `node`. Advances past up to
    /// `MAX_CONSECUTIVE_LOAD_FAILURES` errored tracks before surfacing
    /// `PlaylistExhausted` — the iterative replacement for the source's
    /// recursive re-entrant `play()`.
    pub fn play(&self, node: NodeRef) -> Result<(), ControllerError> {
        let mut candidate = Some(node);
        let mut consecutive_failures = 0u8;

        while let Some(n) = candidate {
            let Some(track) = self.playlist.track(n) else {
                candidate = self.playlist.next_from(n, RepeatMode::Off);
                continue;
            };

            {
                let mut st = self.state.state.lock().expect("controller state mutex poisoned");
                st.song_loading = true;
            }

            let prior_device_format = self.pipeline.device_format();
            match self.pipeline.load_first(&PathBuf::from(&track.file_path), track.id) {
                Ok(format) => {
                    let mut st = self.state.state.lock().expect("controller state mutex poisoned");
                    st.current_node = Some(n);
                    st.next_node = self.playlist.next_from(n, st.repeat_mode);
                    st.phase = PlaybackPhase::Playing;
                    st.elapsed_s = 0.0;
                    st.song_loading = false;
                    st.song_has_errors = false;
                    st.track_started_at = Some(Instant::now());
                    let force_skip_pending = std::mem::take(&mut st.force_skip);
                    drop(st);

                    if prior_device_format.is_some_and(|prior| !FormatProbe::compatible(&prior, &format)) {
                        self.events.publish(Event::DeviceRebuildRequired(format));
                    }

                    self.flags.phase_playing.store(true, Ordering::Release);
                    self.update_gain(&track);
                    self.events.publish(Event::TrackChanged(self.track_info(n, &track)));
                    self.events.publish(Event::PlaybackStatus(PlaybackPhase::Playing));

                    if let Some(next) = self.playlist.next_from(n, self.state.repeat_mode()) {
                        if let Some(next_track) = self.playlist.track(next) {
                            self.pipeline.preload_next(PathBuf::from(next_track.file_path), next_track.id);
                        }
                    }

                    // A skip that arrived while this load was still in
                    // flight is applied now that the load has settled,
                    // rather than being silently dropped.
                    if force_skip_pending {
                        self.skip_next();
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("skipping {}: {e}", track.file_path);
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_LOAD_FAILURES {
                        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
                        st.song_loading = false;
                        st.song_has_errors = true;
                        st.phase = PlaybackPhase::Stopped;
                        drop(st);
                        self.events.publish(Event::PlaybackStatus(PlaybackPhase::Stopped));
                        return Err(ControllerError::PlaylistExhausted);
                    }
                    candidate = self.playlist.next_from(n, RepeatMode::Off);
                }
            }
        }

        Err(ControllerError::PlaylistEmpty)
    }

    pub fn pause(&self) {
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        if st.phase != PlaybackPhase::Playing {
            return;
        }
        st.pause_instant = Some(Instant::now());
        st.phase = PlaybackPhase::Paused;
        drop(st);
        self.flags.phase_playing.store(false, Ordering::Release);
        self.events.publish(Event::PlaybackStatus(PlaybackPhase::Paused));
    }

    pub fn resume(&self) {
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        if st.phase != PlaybackPhase::Paused {
            return;
        }
        if let Some(paused_at) = st.pause_instant.take() {
            st.total_pause_secs += paused_at.elapsed().as_secs_f64();
        }
        st.phase = PlaybackPhase::Playing;
        drop(st);
        self.flags.phase_playing.store(true, Ordering::Release);
        self.events.publish(Event::PlaybackStatus(PlaybackPhase::Playing));
    }

    pub fn stop(&self) {
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        st.phase = PlaybackPhase::Stopped;
        st.elapsed_s = 0.0;
        st.seek_accum_s = 0.0;
        drop(st);
        self.flags.phase_playing.store(false, Ordering::Release);
        self.pipeline.rewind_active();
        self.pipeline.cancel_preload();
        self.events.publish(Event::PlaybackStatus(PlaybackPhase::Stopped));
    }

    /// Returns true if the second of two rapid presses should be dropped.
    fn skip_on_cooldown(&self, st: &mut State) -> bool {
        let now = Instant::now();
        let on_cooldown = st.last_skip_at.is_some_and(|last| now.duration_since(last) < SKIP_COOLDOWN);
        if !on_cooldown {
            st.last_skip_at = Some(now);
        }
        on_cooldown
    }

    pub fn skip_next(&self) {
        let was_playing;
        {
            let mut st = self.state.state.lock().expect("controller state mutex poisoned");
            if self.skip_on_cooldown(&mut st) {
                return;
            }
            if st.song_loading {
                st.force_skip = true;
                return;
            }
            was_playing = st.phase == PlaybackPhase::Playing;
        }

        let Some(current) = self.current_node() else { return };
        let repeat_mode = self.state.repeat_mode();
        let Some(next) = self.playlist.next_from(current, repeat_mode) else {
            self.stop();
            return;
        };

        if was_playing {
            self.flags.skip_to_next.store(true, Ordering::Release);
            self.pipeline.request_switch();
        } else {
            self.silent_switch(next);
        }
    }

    fn silent_switch(&self, next: NodeRef) {
        let Some(track) = self.playlist.track(next) else { return };
        let prior_device_format = self.pipeline.device_format();
        let format = match self.pipeline.load_first(&PathBuf::from(&track.file_path), track.id) {
            Ok(format) => format,
            Err(_) => return,
        };
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        st.current_node = Some(next);
        st.next_node = self.playlist.next_from(next, st.repeat_mode);
        st.elapsed_s = 0.0;
        st.has_silently_switched = true;
        let phase = st.phase;
        drop(st);

        if prior_device_format.is_some_and(|prior| !FormatProbe::compatible(&prior, &format)) {
            self.events.publish(Event::DeviceRebuildRequired(format));
        }
        self.update_gain(&track);
        self.events.publish(Event::TrackChanged(self.track_info(next, &track)));
        self.events.publish(Event::PlaybackStatus(phase));
    }

    pub fn skip_prev(&self) {
        let Some(current) = self.current_node() else { return };
        let within_rewind_window = {
            let st = self.state.state.lock().expect("controller state mutex poisoned");
            st.track_started_at.is_some_and(|t| t.elapsed() < SKIP_PREV_REWIND_WINDOW)
        };

        if within_rewind_window {
            if let Some(prev) = self.playlist.prev_from(current) {
                let was_playing = self.state.phase() == PlaybackPhase::Playing;
                if was_playing {
                    self.play(prev).ok();
                } else {
                    self.silent_switch(prev);
                }
                return;
            }
        }

        self.set_position_us(0);
    }

    pub fn skip_to(&self, node: NodeRef) {
        let was_playing = self.state.phase() == PlaybackPhase::Playing;
        if was_playing {
            self.play(node).ok();
        } else {
            self.silent_switch(node);
        }
    }

    pub fn skip_to_last(&self) {
        let tracks = self.playlist.ordered_tracks();
        if let Some(last) = tracks.last() {
            if let Some(node) = self.playlist.find_by_id(last.id) {
                self.skip_to(node);
            }
        }
    }

    /// Accumulate a relative seek; drained by the audio callback on its
    /// next iteration.
    pub fn seek(&self, delta_seconds: f64) {
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        if st.phase != PlaybackPhase::Playing {
            // Seeking while paused/stopped is a no-op until resume.
            return;
        }
        st.seek_accum_s += delta_seconds;
        let target = (st.elapsed_s + st.seek_accum_s).max(0.0);
        drop(st);
        self.request_seek_to_fraction(target);
    }

    pub fn set_position(&self, absolute_microseconds: u64) {
        self.set_position_us(absolute_microseconds);
    }

    fn set_position_us(&self, absolute_microseconds: u64) {
        let target_s = absolute_microseconds as f64 / 1_000_000.0;
        self.request_seek_to_fraction(target_s);
        self.events.publish(Event::Seeked(absolute_microseconds));
    }

    fn request_seek_to_fraction(&self, target_seconds: f64) {
        if let Some(total) = self.pipeline.try_active_total_frames() {
            let sample_rate = self
                .pipeline
                .active_format()
                .map(|f| f.sample_rate as f64)
                .unwrap_or(44_100.0);
            let target_frame = (target_seconds * sample_rate).max(0.0) as u64;
            let fraction = (target_frame as f64 / total.max(1) as f64).clamp(0.0, 1.0);
            self.flags
                .seek_percent_micros
                .store((fraction * 1_000_000.0) as u32, Ordering::Release);
            self.flags.seek_requested.store(true, Ordering::Release);
        }
    }

    pub fn toggle_shuffle(&self) {
        let Some(current) = self.current_node() else {
            let mut st = self.state.state.lock().expect("controller state mutex poisoned");
            st.shuffle = !st.shuffle;
            return;
        };

        let enabling = {
            let mut st = self.state.state.lock().expect("controller state mutex poisoned");
            st.shuffle = !st.shuffle;
            st.shuffle
        };

        if enabling {
            self.playlist.shuffle_from(current);
        } else {
            self.playlist.restore_ordered();
        }
        self.events.publish(Event::ShuffleChanged(enabling));
    }

    pub fn toggle_repeat(&self) {
        let mode = {
            let mut st = self.state.state.lock().expect("controller state mutex poisoned");
            st.repeat_mode = st.repeat_mode.cycle();
            st.repeat_mode
        };
        self.events.publish(Event::LoopStatus(mode));
    }

    pub fn set_volume(&self, percent: i32) {
        let clamped = percent.clamp(0, 100) as u8;
        {
            let mut st = self.state.state.lock().expect("controller state mutex poisoned");
            st.volume_percent = clamped;
        }
        self.events.publish(Event::VolumeChanged(clamped));
    }

    #[must_use]
    pub fn current_node(&self) -> Option<NodeRef> {
        self.state.state.lock().expect("controller state mutex poisoned").current_node
    }

    /// Drain a `CallbackReport` produced by the real-time thread. Called
    /// from the event-loop thread so that event publication and the
    /// follow-up preload never happen on the audio thread itself.
    pub fn handle_callback_report(&self, report: CallbackReport) {
        if let Some((track_id, format)) = report.switched_track {
            let Some(current) = self.current_node() else { return };
            let repeat_mode = self.state.repeat_mode();
            let Some(next) = self.playlist.next_from(current, repeat_mode) else {
                self.stop();
                return;
            };
            let Some(track) = self.playlist.track(next) else { return };
            debug_assert_eq!(track.id, track_id, "pipeline slot switched to an unexpected track");

            // The callback already swapped the active slot onto this
            // track's decoder before this report reached us. If its format
            // can't be chained gaplessly against the currently initialized
            // device, the pipeline just tore down both slots: stop the
            // real-time thread, let the host rebuild its output stream, then
            // reload this track into a fresh slot before resuming.
            if self.pipeline.rebuild_if_incompatible(format) {
                self.flags.phase_playing.store(false, Ordering::Release);
                self.events.publish(Event::DeviceRebuildRequired(format));
                if self.pipeline.load_first(&PathBuf::from(&track.file_path), track.id).is_err() {
                    log::warn!("failed to reload {} after device rebuild", track.file_path);
                    self.stop();
                    return;
                }
                self.flags.phase_playing.store(true, Ordering::Release);
            }

            {
                let mut st = self.state.state.lock().expect("controller state mutex poisoned");
                st.current_node = Some(next);
                st.next_node = self.playlist.next_from(next, repeat_mode);
                st.elapsed_s = 0.0;
                st.track_started_at = Some(Instant::now());
            }

            self.update_gain(&track);
            self.events.publish(Event::TrackChanged(self.track_info(next, &track)));

            if let Some(upcoming) = self.playlist.next_from(next, repeat_mode) {
                if let Some(upcoming_track) = self.playlist.track(upcoming) {
                    self.pipeline.preload_next(PathBuf::from(upcoming_track.file_path), upcoming_track.id);
                }
            }
        }

        if report.seek_applied {
            let elapsed_us = (self.state.elapsed_s() * 1_000_000.0) as u64;
            self.events.publish(Event::Seeked(elapsed_us));
        }

        if report.reached_eof && report.switched_track.is_none() && !self.pipeline.is_next_ready() {
            let at_end = self.current_node().and_then(|n| self.playlist.next_from(n, RepeatMode::Off)).is_none();
            if at_end && self.state.repeat_mode() != RepeatMode::List {
                self.stop();
            }
        }
    }

    /// Advance `elapsed_s` between callback invocations; called from the
    /// event-loop thread on a short tick, independent of the debounced
    /// `PositionChanged` event.
    pub fn tick(&self, delta_seconds: f64) {
        let mut st = self.state.state.lock().expect("controller state mutex poisoned");
        if st.phase != PlaybackPhase::Playing {
            return;
        }
        st.elapsed_s += delta_seconds;
        let elapsed_us = (st.elapsed_s * 1_000_000.0) as u64;
        drop(st);
        self.events.publish(Event::PositionChanged(elapsed_us));
    }
}

impl From<DecoderError> for ControllerError {
    fn from(e: DecoderError) -> Self {
        ControllerError::Pipeline(PipelineError::Decoder(e))
    }
}
