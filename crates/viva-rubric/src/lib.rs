//! # viva-rubric
//!
//! Rubric-based content evaluation:
//!
//! - [`config::RubricConfig`] / [`config::RubricSet`] — externally authored
//!   evaluation criteria, parsed into a statically validated structure at
//!   load time and shared immutably across runs
//! - [`format`] — the exact textual contract the text-evaluation
//!   collaborator must follow (score line + strength/weakness keyword
//!   blocks), emitted into every instruction and parsed fail-closed
//! - [`evaluator::RubricEvaluator`] — one evaluation call per category
//!   against the chat-completions-style collaborator
//!
//! ## Crate Position
//!
//! Depends on viva-core. Depended on by viva-runtime.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod format;

pub use config::{Criterion, RubricConfig, RubricSet};
pub use error::RubricError;
pub use evaluator::{EvaluatorOptions, RubricEvaluator};
pub use format::RubricParseError;
