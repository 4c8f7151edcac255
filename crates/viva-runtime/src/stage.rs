//! Per-stage retry wrapper.
//!
//! Every external call runs through [`run_stage`]: a per-attempt timeout,
//! transient failures retried with bounded exponential backoff, permanent
//! failures surfaced immediately. The sequential loop guarantees at most
//! one in-flight call per stage per run.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::warn;
use viva_core::errors::Classify;
use viva_core::retry::{RetryConfig, backoff_delay};

use crate::error::Stage;

/// Why a stage gave up.
#[derive(Debug)]
pub(crate) enum StageFailure<E> {
    /// A non-transient error — not retried.
    Permanent(E),
    /// The transient-retry ceiling was exhausted.
    Exhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Description of the last failure.
        detail: String,
    },
}

/// Run one stage with timeout + retry. A per-attempt timeout counts as a
/// transient failure.
pub(crate) async fn run_stage<T, E, F, Fut>(
    stage: Stage,
    retry: &RetryConfig,
    call_timeout: Duration,
    mut op: F,
) -> Result<T, StageFailure<E>>
where
    E: Classify + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let detail = match tokio::time::timeout(call_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) if !error.is_transient() => {
                return Err(StageFailure::Permanent(error));
            }
            Ok(Err(error)) => error.to_string(),
            Err(_) => format!("timed out after {}ms", call_timeout.as_millis()),
        };

        if attempt >= retry.max_attempts {
            return Err(StageFailure::Exhausted {
                attempts: attempt,
                detail,
            });
        }

        counter!("pipeline_stage_retries_total", "stage" => stage.as_str()).increment(1);
        let delay = backoff_delay(retry, attempt);
        warn!(%stage, attempt, delay_ms = delay.as_millis() as u64, %detail, "transient stage failure, retrying");
        tokio::time::sleep(delay).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use thiserror::Error;
    use viva_core::errors::ErrorClass;

    #[derive(Debug, Error)]
    #[error("{message}")]
    struct FakeError {
        message: String,
        class: ErrorClass,
    }

    impl Classify for FakeError {
        fn class(&self) -> ErrorClass {
            self.class
        }
    }

    fn transient(message: &str) -> FakeError {
        FakeError {
            message: message.into(),
            class: ErrorClass::Transient,
        }
    }

    fn permanent(message: &str) -> FakeError {
        FakeError {
            message: message.into(),
            class: ErrorClass::Permanent,
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[tokio::test]
    async fn success_passes_through() {
        let result: Result<u32, StageFailure<FakeError>> = run_stage(
            Stage::Transcription,
            &fast_retry(3),
            Duration::from_secs(1),
            || async { Ok(7) },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn transient_failure_then_success_matches_immediate_success() {
        let calls = AtomicU32::new(0);
        let result = run_stage(
            Stage::Transcription,
            &fast_retry(3),
            Duration::from_secs(1),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(transient("connection reset"))
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_ceiling_reports_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = run_stage(
            Stage::RubricEvaluation,
            &fast_retry(3),
            Duration::from_secs(1),
            || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient("still down")) }
            },
        )
        .await;
        assert_matches!(
            result.unwrap_err(),
            StageFailure::Exhausted { attempts: 3, detail } if detail.contains("still down")
        );
        // At-most-one in-flight call per stage: exactly ceiling calls, made
        // sequentially.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = run_stage(
            Stage::RubricEvaluation,
            &fast_retry(3),
            Duration::from_secs(1),
            || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { Err(permanent("malformed response")) }
            },
        )
        .await;
        assert_matches!(result.unwrap_err(), StageFailure::Permanent(e) if e.message == "malformed response");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_transient() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, StageFailure<FakeError>> = run_stage(
            Stage::AcousticAnalysis,
            &fast_retry(2),
            Duration::from_millis(10),
            || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(1)
                }
            },
        )
        .await;
        assert_matches!(
            result.unwrap_err(),
            StageFailure::Exhausted { attempts: 2, detail } if detail.contains("timed out")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
