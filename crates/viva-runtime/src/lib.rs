//! # viva-runtime
//!
//! The analysis pipeline orchestrator.
//!
//! [`orchestrator::PipelineOrchestrator`] sequences one run end to end:
//! asset fetch → acoustic analysis ∥ transcription → bounded rubric
//! fan-out → aggregation → dual-store persistence. It owns the per-stage
//! retry/timeout policy ([`stage`]) and the asset retrieval seam
//! ([`asset::AssetStore`]).
//!
//! ## Crate Position
//!
//! Depends on viva-core, viva-speech, viva-rubric, viva-store.
//! Depended on by viva-server.

#![deny(unsafe_code)]

pub mod asset;
pub mod error;
pub mod orchestrator;
pub(crate) mod stage;

pub use asset::{AssetError, AssetStore, HttpAssetStore};
pub use error::{PipelineError, Stage};
pub use orchestrator::{AnalysisOutcome, OrchestratorConfig, PipelineOrchestrator};
