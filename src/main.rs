//! Thin CLI entry point wiring the playback core together.
//!
//! Terminal UI rendering, visualizers and album art are out of scope for
//! this crate; this binary is a minimal driver that plays a playlist given
//! on the command line and prints status lines to stdout, the way an
//! external front-end would otherwise consume the event bus.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};

use voiceforge::callback::{AudioCallback, CallbackFlags, CallbackReport};
use voiceforge::config::{self, PlayerConfig};
use voiceforge::controller::TrackGain;
use voiceforge::event_bus::{ChannelSink, Event, EventBus};
use voiceforge::pipeline::Pipeline;
use voiceforge::playlist::Playlist;
use voiceforge::track::Track;
use voiceforge::{PlaybackController, PlaybackPhase};

struct PlaybackError(String);

impl std::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "playback error: {}", self.0)
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: AudioCallback,
    report_tx: crossbeam_channel::Sender<CallbackReport>,
    sample_format: cpal::SampleFormat,
) -> Result<Stream, cpal::BuildStreamError> {
    match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _| {
                let report = callback.write(data);
                let _ = report_tx.try_send(report);
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _| {
                let report = callback.write(data);
                let _ = report_tx.try_send(report);
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        ),
        _ => device.build_output_stream(
            config,
            move |data: &mut [u16], _| {
                let report = callback.write(data);
                let _ = report_tx.try_send(report);
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        ),
    }
}

/// Build (or rebuild) the cpal output stream against the current default
/// device, updating `pipeline`'s device format and starting playback. Used
/// both at startup and whenever `Event::DeviceRebuildRequired` fires.
fn start_stream(
    pipeline: &Arc<Pipeline>,
    flags: &CallbackFlags,
    track_gain: &TrackGain,
    report_tx: &crossbeam_channel::Sender<CallbackReport>,
) -> Result<Stream, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError("no output audio device found".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError(format!("no supported output config: {e}")))?;

    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();

    pipeline.set_device_format(voiceforge::AudioFormat {
        sample_format: voiceforge::format::SampleFormat::F32,
        channels: stream_config.channels as u8,
        sample_rate: stream_config.sample_rate.0,
    });

    let callback = AudioCallback::new(
        Arc::clone(pipeline),
        flags.clone(),
        Arc::clone(track_gain),
        stream_config.channels as usize,
        None,
    );

    let stream = build_stream(&device, &stream_config, callback, report_tx.clone(), sample_format)
        .map_err(|e| PlaybackError(format!("failed to build output stream: {e}")))?;
    stream.play().map_err(|e| PlaybackError(format!("failed to start stream: {e}")))?;

    Ok(stream)
}

fn config_path() -> PathBuf {
    dirs_next_fallback().join("voiceforge-state.toml")
}

/// Minimal stand-in for a `dirs`-style config directory lookup: the
/// configuration layer is ambient stack, not a feature worth a whole extra
/// dependency for a single path join in a demo binary.
fn dirs_next_fallback() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() {
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: voiceforge <file> [file...]");
        std::process::exit(1);
    }

    let saved = config::load(&config_path()).unwrap_or_default();

    let playlist = Arc::new(Playlist::new());
    for path in &paths {
        playlist.enqueue(Track::new(path.clone(), 0.0, 0, None, None));
    }

    let pipeline = Arc::new(Pipeline::new());
    let events = Arc::new(EventBus::new());
    let (sink, rx) = ChannelSink::new(256);
    events.subscribe(Box::new(sink));

    let flags = CallbackFlags::default();
    let track_gain: TrackGain = Arc::new(Mutex::new((None, None)));
    let controller = PlaybackController::new(
        Arc::clone(&playlist),
        Arc::clone(&pipeline),
        Arc::clone(&events),
        flags.clone(),
        Arc::clone(&track_gain),
    );
    controller.set_volume(saved.volume_percent as i32);

    let Some(first_node) = playlist.find_by_path(&paths[0]) else {
        eprintln!("failed to enqueue {}", paths[0]);
        std::process::exit(1);
    };

    if let Err(e) = controller.play(first_node) {
        eprintln!("playback failed to start: {e}");
        std::process::exit(1);
    }

    let (report_tx, report_rx) = crossbeam_channel::bounded(256);
    let mut stream = match start_stream(&pipeline, &flags, &track_gain, &report_tx) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Event-loop thread: drains callback reports and prints bus events.
    // Stands in for the MPRIS/Discord/notification sinks this crate treats
    // as external.
    loop {
        if let Ok(report) = report_rx.recv_timeout(Duration::from_millis(100)) {
            controller.handle_callback_report(report);
        } else {
            controller.tick(0.1);
        }

        while let Ok(event) = rx.try_recv() {
            if let Event::DeviceRebuildRequired(_) = &event {
                drop(stream);
                stream = match start_stream(&pipeline, &flags, &track_gain, &report_tx) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("failed to rebuild output stream: {e}");
                        std::process::exit(1);
                    }
                };
            }
            print_event(&event);
        }

        if controller.state().phase() == PlaybackPhase::Stopped {
            break;
        }
    }

    let mut final_config = PlayerConfig::default();
    final_config.volume_percent = controller.state().volume_percent();
    final_config.set_repeat_mode(controller.state().repeat_mode());
    final_config.shuffle = controller.state().shuffle();
    final_config.last_run_unix_secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Err(e) = config::save(&config_path(), &final_config) {
        log::warn!("failed to persist state: {e}");
    }
}

fn print_event(event: &Event) {
    match event {
        Event::TrackChanged(info) => println!("Now playing: {} ({:.1}s)", info.title, info.duration_s),
        Event::PlaybackStatus(phase) => println!("status: {phase:?}"),
        Event::PositionChanged(us) => println!("position: {:.1}s", *us as f64 / 1_000_000.0),
        Event::Seeked(us) => println!("seeked to {:.1}s", *us as f64 / 1_000_000.0),
        Event::VolumeChanged(pct) => println!("volume: {pct}%"),
        Event::LoopStatus(mode) => println!("repeat: {mode:?}"),
        Event::ShuffleChanged(on) => println!("shuffle: {on}"),
        Event::DeviceRebuildRequired(format) => {
            println!("rebuilding output device for {}Hz/{}ch", format.sample_rate, format.channels)
        }
    }
}
