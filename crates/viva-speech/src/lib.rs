//! # viva-speech
//!
//! Audio asset handle and thin HTTP adapters for the two speech
//! collaborators:
//!
//! - [`analyzer::AcousticAnalyzer`] — multipart POST to the acoustic
//!   feature-extraction sidecar, producing validated
//!   [`viva_core::acoustic::AcousticMetrics`]
//! - [`transcribe::TranscriptionAdapter`] — multipart POST to the STT
//!   sidecar, producing a [`viva_core::transcript::Transcript`]
//!
//! Both adapters assume the asset has already been normalized (mono WAV,
//! fixed sample rate) by the upstream conversion collaborator.
//!
//! ## Crate Position
//!
//! Depends on viva-core. Depended on by viva-runtime.

#![deny(unsafe_code)]

pub mod analyzer;
pub mod asset;
pub mod error;
pub mod transcribe;

pub use analyzer::AcousticAnalyzer;
pub use asset::AudioAsset;
pub use error::SpeechError;
pub use transcribe::TranscriptionAdapter;
