use std::sync::Arc;
use std::time::Instant;

use voiceforge::callback::CallbackFlags;
use voiceforge::pipeline::Pipeline;
use voiceforge::playlist::{Playlist, RepeatMode};
use voiceforge::track::Track;
use voiceforge::{EventBus, PlaybackController};

fn make_controller() -> (PlaybackController, Arc<Playlist>) {
    let playlist = Arc::new(Playlist::new());
    let pipeline = Arc::new(Pipeline::new());
    let events = Arc::new(EventBus::new());
    let flags = CallbackFlags::default();
    (PlaybackController::new(Arc::clone(&playlist), pipeline, events, flags), playlist)
}

#[test]
fn play_on_a_dequeued_node_fails() {
    let (controller, playlist) = make_controller();
    let node = playlist.enqueue(Track::new("x.mp3", 1.0, 1, None, None));
    playlist.dequeue(node);
    assert!(controller.play(node).is_err());
}

#[test]
fn set_volume_clamps_to_valid_range() {
    let (controller, _pl) = make_controller();
    controller.set_volume(150);
    assert_eq!(controller.state().volume_percent(), 100);
    controller.set_volume(-20);
    assert_eq!(controller.state().volume_percent(), 0);
}

#[test]
fn toggle_repeat_cycles_through_all_three_modes() {
    let (controller, _pl) = make_controller();
    assert_eq!(controller.state().repeat_mode(), RepeatMode::Off);
    controller.toggle_repeat();
    assert_eq!(controller.state().repeat_mode(), RepeatMode::Track);
    controller.toggle_repeat();
    assert_eq!(controller.state().repeat_mode(), RepeatMode::List);
    controller.toggle_repeat();
    assert_eq!(controller.state().repeat_mode(), RepeatMode::Off);
}

#[test]
fn skip_next_with_no_current_track_does_not_panic() {
    let (controller, _pl) = make_controller();
    controller.skip_next();
    controller.skip_next();
    let _ = Instant::now();
}
