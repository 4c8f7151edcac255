//! Best-effort document store client.
//!
//! One detailed JSON document per run, addressed by (user, question) so a
//! later run's document supersedes the previous one.

use serde::Serialize;
use tracing::{debug, instrument};
use viva_core::acoustic::AcousticMetrics;
use viva_core::transcript::Transcript;

use crate::error::StoreError;

/// Per-category detail block in the run document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentCategory {
    /// Category identifier.
    pub category: String,
    /// Korean display name.
    pub name: String,
    /// Awarded points.
    pub score: u8,
    /// Strength keywords.
    pub strengths: Vec<String>,
    /// Weakness keywords.
    pub weaknesses: Vec<String>,
}

/// The detailed projection of one run, written to the document store.
#[derive(Debug, Clone, Serialize)]
pub struct RunDocument {
    /// Unique run identifier.
    pub run_id: String,
    /// Candidate identifier.
    pub user_id: String,
    /// Question number.
    pub question_num: u8,
    /// Raw acoustic metrics, so the acoustic score is re-derivable.
    pub metrics: AcousticMetrics,
    /// Full transcript.
    pub transcript: Transcript,
    /// Acoustic sub-score.
    pub acoustic_score: u8,
    /// Per-category detail.
    pub categories: Vec<DocumentCategory>,
    /// Composite score.
    pub total_score: u8,
    /// Band label.
    pub performance_band: String,
    /// RFC3339 write timestamp.
    pub created_at: String,
}

/// HTTP client for the document store.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    client: reqwest::Client,
    base_url: String,
}

impl DocumentClient {
    /// Create a client sharing the process-wide HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Write one run document, replacing any previous document for the
    /// same (user, question) key.
    #[instrument(skip_all, fields(user_id = %document.user_id, question = document.question_num))]
    pub async fn put_run(&self, document: &RunDocument) -> Result<(), StoreError> {
        let url = format!(
            "{}/runs/{}/{}",
            self.base_url, document.user_id, document.question_num
        );
        let response = self.client.put(&url).json(document).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Document {
                status: status.as_u16(),
                message: message.chars().take(300).collect(),
            });
        }
        debug!("run document written");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
