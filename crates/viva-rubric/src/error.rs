//! Rubric evaluation error types.

use thiserror::Error;
use viva_core::errors::{Classify, ErrorClass, class_for_status};

use crate::config::RubricConfigError;
use crate::format::RubricParseError;

/// Errors from rubric configuration or evaluation.
#[derive(Debug, Error)]
pub enum RubricError {
    /// Configuration failed load-time validation.
    #[error(transparent)]
    Config(#[from] RubricConfigError),

    /// The collaborator response violated the output-format contract.
    /// Never retried — an ambiguous prompt response does not become
    /// well-formed by retrying.
    #[error("evaluation response unparseable: {0}")]
    Parse(#[from] RubricParseError),

    /// The collaborator answered without any message content.
    #[error("evaluation response carried no content")]
    EmptyResponse,

    /// Non-success HTTP status from the collaborator.
    #[error("evaluation collaborator returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        message: String,
    },

    /// Transport-level failure.
    #[error("evaluation collaborator request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Classify for RubricError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::Parse(_) | Self::EmptyResponse => ErrorClass::Permanent,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_permanent() {
        let err = RubricError::Parse(RubricParseError::MissingScoreLine);
        assert!(!err.is_transient());
    }

    #[test]
    fn rate_limit_is_transient() {
        let err = RubricError::Api {
            status: 429,
            message: "slow down".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn auth_failure_is_permanent() {
        let err = RubricError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert!(!err.is_transient());
    }
}
