//! Replay-gain dB → linear conversion.

use crate::format::SampleFormat;

/// Replay-gain value below which a tag is treated as "missing" rather than
/// an intentional (very quiet) normalization target.
const MISSING_DB_THRESHOLD: f64 = -50.0;

/// Which replay-gain tag the user prefers when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainPreference {
    Off,
    TrackFirst,
    AlbumFirst,
}

pub struct GainCalc;

impl GainCalc {
    /// Pick the effective dB value for a track given the user's preference,
    /// skipping values below -50 dB as missing and falling back to the
    /// other tag (then to 0 dB, i.e. unity gain) if the preferred one is
    /// absent.
    #[must_use]
    pub fn effective_db(
        pref: GainPreference,
        track_db: Option<f64>,
        album_db: Option<f64>,
    ) -> f64 {
        let present = |v: Option<f64>| v.filter(|db| *db >= MISSING_DB_THRESHOLD);
        match pref {
            GainPreference::Off => 0.0,
            GainPreference::TrackFirst => present(track_db).or_else(|| present(album_db)).unwrap_or(0.0),
            GainPreference::AlbumFirst => present(album_db).or_else(|| present(track_db)).unwrap_or(0.0),
        }
    }

    /// Convert a decibel value to a linear amplitude multiplier.
    #[must_use]
    pub fn db_to_linear(db: f64) -> f64 {
        10f64.powf(db / 20.0)
    }

    /// Apply `gain` to `sample` with a saturating clamp to `format`'s range.
    #[must_use]
    pub fn apply(sample: f32, gain: f64, format: SampleFormat) -> f32 {
        let max_abs = format.max_abs();
        let scaled = sample as f64 * gain;
        scaled.clamp(-max_abs, max_abs) as f32
    }
}

