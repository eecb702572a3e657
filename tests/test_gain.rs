use voiceforge::format::SampleFormat;
use voiceforge::gain::{GainCalc, GainPreference};

#[test]
fn unity_gain_at_zero_db() {
    assert!((GainCalc::db_to_linear(0.0) - 1.0).abs() < 1e-9);
}

#[test]
fn minus_six_db_is_about_half() {
    assert!((GainCalc::db_to_linear(-6.0) - 0.501_187).abs() < 1e-3);
}

#[test]
fn track_first_skips_missing_values() {
    let db = GainCalc::effective_db(GainPreference::TrackFirst, Some(-60.0), Some(-4.0));
    assert!((db - -4.0).abs() < 1e-9);
}

#[test]
fn off_preference_is_always_unity() {
    let db = GainCalc::effective_db(GainPreference::Off, Some(-6.0), Some(-6.0));
    assert_eq!(db, 0.0);
}

#[test]
fn apply_clamps_to_format_range() {
    let out = GainCalc::apply(1.0, GainCalc::db_to_linear(20.0), SampleFormat::F32);
    assert!((out - 1.0).abs() < 1e-6);
}

#[test]
fn replay_gain_scenario_minus_six_db_track_first() {
    // -6 dB track gain, track_first preference, no album tag.
    let db = GainCalc::effective_db(GainPreference::TrackFirst, Some(-6.0), None);
    let linear = GainCalc::db_to_linear(db);
    assert!((linear - 0.501_187).abs() < 1e-3);
    let sample = GainCalc::apply(0.8, linear, SampleFormat::F32);
    assert!((sample - 0.8 * 0.501_187).abs() < 1e-3);
}
