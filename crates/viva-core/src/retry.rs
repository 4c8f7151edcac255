//! Retry configuration and backoff calculation.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy for one external-call stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempt ceiling, including the first attempt.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Backoff before retry number `attempt` (1-based): exponential doubling
/// capped at `max_delay_ms`, with ±25% jitter to spread contending runs.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let base = config
        .base_delay_ms
        .saturating_mul(1u64 << exp)
        .min(config.max_delay_ms);
    let jittered = (base as f64 * rand::rng().random_range(0.75..=1.25)) as u64;
    Duration::from_millis(jittered.min(config.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.base_delay_ms, 500);
        assert_eq!(cfg.max_delay_ms, 8_000);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let cfg = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        // Jitter is ±25%, so check envelopes rather than exact values.
        let first = backoff_delay(&cfg, 1).as_millis() as u64;
        assert!((75..=125).contains(&first), "first retry: {first}ms");

        let second = backoff_delay(&cfg, 2).as_millis() as u64;
        assert!((150..=250).contains(&second), "second retry: {second}ms");

        // Deep attempts never exceed the cap.
        for attempt in 3..12 {
            assert!(backoff_delay(&cfg, attempt).as_millis() as u64 <= 1_000);
        }
    }

    #[test]
    fn backoff_never_overflows_on_huge_attempt_numbers() {
        let cfg = RetryConfig::default();
        let d = backoff_delay(&cfg, u32::MAX);
        assert!(d.as_millis() as u64 <= cfg.max_delay_ms);
    }
}
