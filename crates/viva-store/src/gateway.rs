//! Persistence gateway — the dual-store write with partial-failure
//! semantics.
//!
//! The relational write is correctness-critical: it runs first, retries
//! `SQLITE_BUSY` contention, and its failure fails the run. The document
//! write is best-effort: its failure degrades the outcome and is never
//! rolled back against the relational write.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use viva_core::acoustic::AcousticMetrics;
use viva_core::category::CategoryId;
use viva_core::result::AggregatedResult;
use viva_core::transcript::Transcript;

use crate::document::{DocumentCategory, DocumentClient, RunDocument};
use crate::error::StoreError;
use crate::relational::{CategoryScoreRow, ConnectionPool, ScoreRepo, ScoreRow, is_busy};

const BUSY_MAX_RETRIES: u32 = 8;

/// Everything the gateway needs to project one finished run into both
/// stores.
#[derive(Debug)]
pub struct RunRecord<'a> {
    /// Candidate identifier.
    pub user_id: &'a str,
    /// Question number.
    pub question_num: u8,
    /// Raw acoustic metrics.
    pub metrics: AcousticMetrics,
    /// Full transcript.
    pub transcript: &'a Transcript,
    /// The aggregated result.
    pub result: &'a AggregatedResult,
    /// Korean display names per category.
    pub display_names: &'a HashMap<CategoryId, String>,
}

/// Outcome of a persistence attempt that did not fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceOutcome {
    /// True when the document write failed and only the relational rows
    /// landed.
    pub degraded: bool,
}

/// Dual-store persistence gateway.
pub struct PersistenceGateway {
    pool: ConnectionPool,
    document: Option<DocumentClient>,
}

impl PersistenceGateway {
    /// Create a gateway. `document: None` disables document writes
    /// entirely (outcomes are then always non-degraded).
    #[must_use]
    pub fn new(pool: ConnectionPool, document: Option<DocumentClient>) -> Self {
        Self { pool, document }
    }

    /// Persist one run: relational rows first (fatal on failure), then the
    /// best-effort run document.
    #[instrument(skip_all, fields(user_id = %record.user_id, question = record.question_num))]
    pub async fn persist(&self, record: &RunRecord<'_>) -> Result<PersistenceOutcome, StoreError> {
        self.write_relational(record).await?;

        let mut degraded = false;
        if let Some(client) = &self.document {
            let document = build_document(record);
            if let Err(error) = client.put_run(&document).await {
                warn!(error = %error, "document store write failed, outcome degraded");
                degraded = true;
            }
        }

        info!(
            total = record.result.total_score,
            degraded, "run persisted"
        );
        Ok(PersistenceOutcome { degraded })
    }

    async fn write_relational(&self, record: &RunRecord<'_>) -> Result<(), StoreError> {
        let row = ScoreRow {
            user_id: record.user_id.to_string(),
            question_num: record.question_num,
            acoustic_score: record.result.acoustic_score,
            total_score: record.result.total_score,
            performance_band: record.result.performance_band.as_str().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let categories: Vec<CategoryScoreRow> = record
            .result
            .category_scores
            .iter()
            .map(|c| CategoryScoreRow {
                category: c.category.as_str().to_string(),
                score: c.score,
            })
            .collect();

        let mut attempts = 0;
        loop {
            let result = {
                let mut conn = self.pool.get()?;
                ScoreRepo::upsert(&mut conn, &row, &categories)
            };
            match result {
                Ok(()) => return Ok(()),
                Err(error) if is_busy(&error) && attempts < BUSY_MAX_RETRIES => {
                    attempts += 1;
                    warn!(attempts, "relational store busy, retrying");
                    tokio::time::sleep(Duration::from_millis(u64::from(attempts) * 10)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn build_document(record: &RunRecord<'_>) -> RunDocument {
    let categories = record
        .result
        .category_scores
        .iter()
        .map(|c| DocumentCategory {
            category: c.category.as_str().to_string(),
            name: record
                .display_names
                .get(&c.category)
                .cloned()
                .unwrap_or_else(|| c.category.as_str().to_string()),
            score: c.score,
            strengths: c.strengths.clone(),
            weaknesses: c.weaknesses.clone(),
        })
        .collect();

    RunDocument {
        run_id: format!("run_{}", Uuid::now_v7()),
        user_id: record.user_id.to_string(),
        question_num: record.question_num,
        metrics: record.metrics,
        transcript: record.transcript.clone(),
        acoustic_score: record.result.acoustic_score,
        categories,
        total_score: record.result.total_score,
        performance_band: record.result.performance_band.as_str().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
