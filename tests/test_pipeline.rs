use std::path::PathBuf;

use voiceforge::pipeline::{ActiveSlot, Pipeline};

#[test]
fn active_slot_flips() {
    assert_eq!(ActiveSlot::A.flipped(), ActiveSlot::B);
    assert_eq!(ActiveSlot::B.flipped(), ActiveSlot::A);
}

#[test]
fn new_pipeline_starts_on_slot_a_with_nothing_loaded() {
    let pipeline = Pipeline::new();
    assert_eq!(pipeline.active(), ActiveSlot::A);
    assert!(!pipeline.is_next_ready());
    assert!(!pipeline.switch_requested());
}

#[test]
fn load_first_missing_file_errors() {
    let pipeline = Pipeline::new();
    let err = pipeline.load_first(&PathBuf::from("/nonexistent/track.wav"), 1);
    assert!(err.is_err());
}

#[test]
fn cancel_preload_is_idempotent_on_a_pipeline_with_nothing_loading() {
    let pipeline = Pipeline::new();
    pipeline.cancel_preload();
    assert!(!pipeline.is_loading());
}
