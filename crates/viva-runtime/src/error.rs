//! Pipeline error taxonomy.

use std::fmt;

use thiserror::Error;
use viva_core::aggregate::AggregateError;
use viva_store::StoreError;

/// One external-call stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Asset retrieval from the object store.
    FetchAsset,
    /// Acoustic feature extraction.
    AcousticAnalysis,
    /// Speech-to-text.
    Transcription,
    /// One category evaluation call.
    RubricEvaluation,
}

impl Stage {
    /// Stable label used in logs, metrics, and error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchAsset => "fetch_asset",
            Self::AcousticAnalysis => "acoustic_analysis",
            Self::Transcription => "transcription",
            Self::RubricEvaluation => "rubric_evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal pipeline failure. No partial result accompanies any of these —
/// a run produces exactly one [`viva_core::result::AggregatedResult`] or
/// one of these errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request cannot be evaluated (e.g. a question number with no
    /// configured categories).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transient failures exhausted the retry ceiling for a stage.
    #[error("stage {stage} failed after {attempts} attempts: {detail}")]
    StageFailed {
        /// The stage that gave up.
        stage: Stage,
        /// Attempts made, including the first.
        attempts: u32,
        /// Description of the last failure.
        detail: String,
    },

    /// A collaborator response was malformed or permanently rejected.
    #[error("validation failed at {stage}: {detail}")]
    Validation {
        /// The stage whose response was invalid.
        stage: Stage,
        /// What was wrong.
        detail: String,
    },

    /// Unreadable or zero-duration audio, or an analysis failure reported
    /// by the acoustic collaborator.
    #[error("acoustic analysis failed: {0}")]
    AcousticAnalysis(String),

    /// The category result set did not match configuration — a fan-out
    /// bug, not a collaborator problem.
    #[error(transparent)]
    AggregationMismatch(#[from] AggregateError),

    /// The relational store write failed after its own retry policy. The
    /// run is reported failed even though scoring succeeded.
    #[error("required persistence failed: {0}")]
    RequiredPersistence(#[from] StoreError),

    /// A task panicked or was aborted unexpectedly.
    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable error kind for the HTTP surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::StageFailed { .. } => "stage_failed",
            Self::Validation { .. } => "validation",
            Self::AcousticAnalysis(_) => "acoustic_analysis",
            Self::AggregationMismatch(_) => "aggregation_mismatch",
            Self::RequiredPersistence(_) => "required_persistence",
            Self::Internal(_) => "internal",
        }
    }
}
