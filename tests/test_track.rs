use voiceforge::track::Track;

#[test]
fn ids_are_monotonic_and_unique() {
    let a = Track::new("a.flac", 180.0, 900, None, None);
    let b = Track::new("b.flac", 200.0, 900, None, None);
    assert!(b.id > a.id);
}
