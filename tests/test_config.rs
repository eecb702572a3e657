use voiceforge::config::{self, PlayerConfig};
use voiceforge::playlist::RepeatMode;

#[test]
fn round_trips_through_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.toml");

    let mut cfg = PlayerConfig::default();
    cfg.volume_percent = 42;
    cfg.shuffle = true;
    cfg.set_repeat_mode(RepeatMode::List);
    cfg.last_run_unix_secs = 1_732_000_000;

    config::save(&path, &cfg).expect("save");
    let loaded = config::load(&path).expect("load");

    assert_eq!(loaded.volume_percent, 42);
    assert!(loaded.shuffle);
    assert_eq!(loaded.repeat_mode(), RepeatMode::List);
    assert_eq!(loaded.last_run_unix_secs, 1_732_000_000);
}

#[test]
fn missing_file_yields_default_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("does-not-exist.toml");
    let cfg = config::load(&path).expect("load should not error on missing file");
    assert_eq!(cfg.volume_percent, 100);
    assert_eq!(cfg.repeat_mode(), RepeatMode::Off);
}
