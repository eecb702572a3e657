//! Persisted playback state: the handful of fields the core asks the host
//! application to carry across restarts.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::playlist::RepeatMode;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum RepeatModeConfig {
    Off,
    Track,
    List,
}

impl From<RepeatMode> for RepeatModeConfig {
    fn from(m: RepeatMode) -> Self {
        match m {
            RepeatMode::Off => RepeatModeConfig::Off,
            RepeatMode::Track => RepeatModeConfig::Track,
            RepeatMode::List => RepeatModeConfig::List,
        }
    }
}

impl From<RepeatModeConfig> for RepeatMode {
    fn from(m: RepeatModeConfig) -> Self {
        match m {
            RepeatModeConfig::Off => RepeatMode::Off,
            RepeatModeConfig::Track => RepeatMode::Track,
            RepeatModeConfig::List => RepeatMode::List,
        }
    }
}

/// Written on clean exit, read on startup. `last_run_unix_secs` is consumed
/// by the library scanner, external to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub volume_percent: u8,
    repeat_mode: RepeatModeConfig,
    pub shuffle: bool,
    pub last_run_unix_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume_percent: 100,
            repeat_mode: RepeatModeConfig::Off,
            shuffle: false,
            last_run_unix_secs: 0,
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode.into()
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode.into();
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
            ConfigError::Serialize(e) => write!(f, "failed to serialize config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Read `path` if present, otherwise return the default config (no file on
/// first run is not an error).
pub fn load(path: &Path) -> Result<PlayerConfig, ConfigError> {
    if !path.exists() {
        return Ok(PlayerConfig::default());
    }
    let text = fs::read_to_string(path)?;
    toml::from_str(&text).map_err(ConfigError::Parse)
}

pub fn save(path: &Path, config: &PlayerConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    fs::write(path, text)?;
    Ok(())
}
