//! Persistence error types.

use thiserror::Error;
use viva_core::errors::{Classify, ErrorClass, class_for_status};

/// Errors from either persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Relational store failure (after its own busy-retry policy).
    #[error("relational store error: {0}")]
    Relational(#[from] rusqlite::Error),

    /// Connection pool exhausted or broken.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Document store returned a non-success status.
    #[error("document store returned {status}: {message}")]
    Document {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        message: String,
    },

    /// Document store transport failure.
    #[error("document store request failed: {0}")]
    DocumentHttp(#[from] reqwest::Error),

    /// Run document could not be serialized.
    #[error("failed to serialize run document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Relational(_) | Self::Pool(_) | Self::Serialize(_) => ErrorClass::Permanent,
            Self::Document { status, .. } => class_for_status(*status),
            Self::DocumentHttp(e) => {
                if e.is_decode() || e.is_builder() {
                    ErrorClass::Permanent
                } else {
                    ErrorClass::Transient
                }
            }
        }
    }
}
