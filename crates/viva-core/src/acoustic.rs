//! Acoustic delivery metrics and the banded delivery scorer.
//!
//! The scorer is a pure mapping from [`AcousticMetrics`] to a 0–40 integer,
//! re-derivable from stored raw metrics for audit. Band edges come from the
//! Korean speech-delivery literature the service was calibrated against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum acoustic sub-score (pause 0–20 + speech rate 0–20).
pub const MAX_ACOUSTIC_SCORE: u8 = 40;

/// A metric reported by the acoustic collaborator fell outside its
/// declared range. Never clamped — the run fails instead.
#[derive(Debug, Clone, Error)]
pub enum MetricsRangeError {
    /// `pause_ratio` must be a finite fraction in `[0, 1]`.
    #[error("pause_ratio out of range: {0}")]
    PauseRatio(f64),

    /// `speech_rate` must be finite and non-negative.
    #[error("speech_rate out of range: {0}")]
    SpeechRate(f64),
}

/// Delivery metrics derived once per run from the normalized audio asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcousticMetrics {
    /// Fraction of total duration classified as silence, `0.0–1.0`.
    pub pause_ratio: f64,
    /// Average speech rate in syllables per second.
    pub speech_rate: f64,
}

impl AcousticMetrics {
    /// Build validated metrics. Rejects NaN/infinite values and values
    /// outside the declared ranges.
    pub fn new(pause_ratio: f64, speech_rate: f64) -> Result<Self, MetricsRangeError> {
        if !pause_ratio.is_finite() || !(0.0..=1.0).contains(&pause_ratio) {
            return Err(MetricsRangeError::PauseRatio(pause_ratio));
        }
        if !speech_rate.is_finite() || speech_rate < 0.0 {
            return Err(MetricsRangeError::SpeechRate(speech_rate));
        }
        Ok(Self {
            pause_ratio,
            speech_rate,
        })
    }
}

/// Pause-ratio sub-score.
///
/// | pause ratio        | score |
/// |--------------------|-------|
/// | `r < 0.17`         | 20    |
/// | `0.17 ≤ r < 0.25`  | 10    |
/// | `r ≥ 0.25`         | 0     |
pub fn pause_score(pause_ratio: f64) -> u8 {
    if pause_ratio < 0.17 {
        20
    } else if pause_ratio < 0.25 {
        10
    } else {
        0
    }
}

/// Speech-rate sub-score in syllables per second.
///
/// The preferred band `[5.22, 5.76]` is closed; the bands flanking it are
/// half-open away from it, so every rate maps to exactly one band.
///
/// | rate (SPS)                         | score |
/// |------------------------------------|-------|
/// | `5.22 ≤ r ≤ 5.76`                  | 20    |
/// | `4.68 ≤ r < 5.22` or `5.76 < r ≤ 6.12` | 15 |
/// | `4.50 ≤ r < 4.68` or `6.12 < r ≤ 6.48` | 10 |
/// | anything else                      | 0     |
pub fn speech_rate_score(speech_rate: f64) -> u8 {
    let r = speech_rate;
    if (5.22..=5.76).contains(&r) {
        20
    } else if (4.68..5.22).contains(&r) || (r > 5.76 && r <= 6.12) {
        15
    } else if (4.50..4.68).contains(&r) || (r > 6.12 && r <= 6.48) {
        10
    } else {
        0
    }
}

/// Total acoustic sub-score: sum of the two banded lookups, `0–40`.
pub fn acoustic_score(metrics: &AcousticMetrics) -> u8 {
    pause_score(metrics.pause_ratio) + speech_rate_score(metrics.speech_rate)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
