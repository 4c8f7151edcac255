//! Speech collaborator error types.

use thiserror::Error;
use viva_core::acoustic::MetricsRangeError;
use viva_core::errors::{Classify, ErrorClass, class_for_status};

/// Errors from the acoustic-analysis and transcription adapters.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The audio asset could not be read from local storage.
    #[error("audio asset unreadable: {0}")]
    UnreadableAsset(String),

    /// Acoustic analysis cannot proceed: zero-duration asset or the
    /// collaborator reported an analysis failure. Indicates malformed
    /// input, never retried.
    #[error("acoustic analysis failed: {0}")]
    AcousticAnalysis(String),

    /// Non-success HTTP status from the transcription collaborator.
    #[error("speech collaborator returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        message: String,
    },

    /// Transport-level failure (connect, timeout, decode).
    #[error("speech collaborator request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator returned metrics outside their declared ranges.
    #[error("invalid metrics from collaborator: {0}")]
    InvalidMetrics(#[from] MetricsRangeError),
}

impl Classify for SpeechError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::UnreadableAsset(_) | Self::AcousticAnalysis(_) | Self::InvalidMetrics(_) => {
                ErrorClass::Permanent
            }
            Self::Api { status, .. } => class_for_status(*status),
            Self::Http(e) => {
                if e.is_decode() || e.is_builder() {
                    ErrorClass::Permanent
                } else {
                    ErrorClass::Transient
                }
            }
        }
    }
}
