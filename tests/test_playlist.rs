use voiceforge::playlist::{Playlist, RepeatMode};
use voiceforge::track::Track;

fn track(path: &str) -> Track {
    Track::new(path, 180.0, 320, None, None)
}

#[test]
fn enqueue_dequeue_preserves_set_sizes() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let _b = pl.enqueue(track("b.mp3"));
    let c = pl.enqueue(track("c.mp3"));
    assert_eq!(pl.ordered_len(), 3);
    pl.dequeue(a);
    assert_eq!(pl.ordered_len(), 2);
    assert!(pl.track(c).is_some());
}

#[test]
fn shuffle_then_restore_round_trips() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let _b = pl.enqueue(track("b.mp3"));
    let _c = pl.enqueue(track("c.mp3"));
    let _d = pl.enqueue(track("d.mp3"));
    let before = pl.ordered_tracks();

    pl.shuffle_from(a);
    assert_eq!(pl.current_head(), Some(a));

    pl.restore_ordered();
    assert!(!pl.is_shuffled());
    assert_eq!(pl.ordered_tracks(), before);
}

#[test]
fn shuffle_preserves_anchor_identity() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    pl.enqueue(track("b.mp3"));
    pl.enqueue(track("c.mp3"));
    pl.enqueue(track("d.mp3"));
    pl.enqueue(track("e.mp3"));

    pl.shuffle_from(a);
    assert_eq!(pl.current_head(), Some(a));
}

#[test]
fn next_from_off_stops_at_tail() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let b = pl.enqueue(track("b.mp3"));
    assert_eq!(pl.next_from(a, RepeatMode::Off), Some(b));
    assert_eq!(pl.next_from(b, RepeatMode::Off), None);
}

#[test]
fn next_from_list_wraps_to_head() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let b = pl.enqueue(track("b.mp3"));
    assert_eq!(pl.next_from(b, RepeatMode::List), Some(a));
}

#[test]
fn next_from_track_repeats_self() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    pl.enqueue(track("b.mp3"));
    assert_eq!(pl.next_from(a, RepeatMode::Track), Some(a));
}

#[test]
fn stale_node_ref_resolves_to_nothing_after_reuse() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    pl.dequeue(a);
    let _reused = pl.enqueue(track("z.mp3"));
    assert!(pl.track(a).is_none());
}

#[test]
fn move_up_swaps_with_the_previous_entry() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let b = pl.enqueue(track("b.mp3"));
    pl.enqueue(track("c.mp3"));

    assert!(pl.move_up(b));
    let order: Vec<String> = pl.ordered_tracks().into_iter().map(|t| t.file_path).collect();
    assert_eq!(order, vec!["b.mp3", "a.mp3", "c.mp3"]);
    let _ = a;
}

#[test]
fn move_down_swaps_with_the_next_entry() {
    let pl = Playlist::new();
    pl.enqueue(track("a.mp3"));
    let b = pl.enqueue(track("b.mp3"));
    pl.enqueue(track("c.mp3"));

    assert!(pl.move_down(b));
    let order: Vec<String> = pl.ordered_tracks().into_iter().map(|t| t.file_path).collect();
    assert_eq!(order, vec!["a.mp3", "c.mp3", "b.mp3"]);
}

#[test]
fn find_by_id_and_path_locate_existing_entries() {
    let pl = Playlist::new();
    let a = pl.enqueue(track("a.mp3"));
    let a_track = pl.track(a).expect("track exists");

    assert_eq!(pl.find_by_id(a_track.id), Some(a));
    assert_eq!(pl.find_by_path("a.mp3"), Some(a));
    assert_eq!(pl.find_by_path("missing.mp3"), None);
}
