//! # viva-core
//!
//! Foundation types and pure scoring logic for the Viva interview scoring
//! service.
//!
//! This crate provides the shared vocabulary that all other viva crates
//! depend on:
//!
//! - **Requests**: [`request::AnalysisRequest`] and [`request::Gender`]
//! - **Categories**: [`category::CategoryId`] newtype shared by rubric,
//!   aggregation, and persistence
//! - **Acoustic metrics + banded scorer**: [`acoustic::AcousticMetrics`],
//!   [`acoustic::acoustic_score`]
//! - **Transcripts**: [`transcript::Transcript`]
//! - **Results**: [`result::CategoryScore`], [`result::AggregatedResult`],
//!   [`result::PerformanceBand`]
//! - **Aggregation**: [`aggregate::aggregate`] — deterministic fan-in of
//!   sub-scores
//! - **Errors**: [`errors::ErrorClass`] and the [`errors::Classify`] trait
//!   used by the pipeline retry policy
//! - **Retry**: [`retry::RetryConfig`] and backoff calculation
//!
//! ## Crate Position
//!
//! Foundation crate. Pure — no I/O, no async. Depended on by all other
//! viva crates.

#![deny(unsafe_code)]

pub mod acoustic;
pub mod aggregate;
pub mod category;
pub mod errors;
pub mod request;
pub mod result;
pub mod retry;
pub mod transcript;
