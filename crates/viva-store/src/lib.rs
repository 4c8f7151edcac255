//! # viva-store
//!
//! Dual-store persistence for aggregated results:
//!
//! - [`relational`] — the correctness-critical store: normalized score rows
//!   in `SQLite` behind an r2d2 pool, written in one transaction
//! - [`document`] — the best-effort store: one detailed JSON document per
//!   run, `PUT` to an external document service
//! - [`gateway::PersistenceGateway`] — combines both with the
//!   partial-failure contract: relational failure is fatal, document
//!   failure degrades the outcome but never rolls anything back
//!
//! ## Crate Position
//!
//! Depends on viva-core. Depended on by viva-runtime and viva-server.

#![deny(unsafe_code)]

pub mod document;
pub mod error;
pub mod gateway;
pub mod relational;

pub use document::{DocumentClient, RunDocument};
pub use error::StoreError;
pub use gateway::{PersistenceGateway, PersistenceOutcome, RunRecord};
pub use relational::{ConnectionPool, ScoreRepo, open_pool, run_migrations};
