//! # viva-server
//!
//! HTTP surface for the Viva scoring service:
//!
//! - `POST /analysis` — run the full pipeline for one recorded answer
//! - `GET /health` — liveness probe, no business logic
//! - `GET /metrics` — Prometheus text format
//!
//! Routing stays thin: handlers deserialize, call the orchestrator, and
//! map [`PipelineError`] kinds onto HTTP statuses with a structured error
//! body.

#![deny(unsafe_code)]

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;
use viva_core::request::AnalysisRequest;
use viva_core::result::{AggregatedResult, PerformanceBand};
use viva_runtime::{AnalysisOutcome, PipelineError, PipelineOrchestrator};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline orchestrator.
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Prometheus render handle, when metrics are installed.
    pub metrics: Option<PrometheusHandle>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/analysis", post(analyze))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Outbound scoring response.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// Composite score, 0–100.
    pub total_score: u8,
    /// Acoustic sub-score, 0–40.
    pub acoustic_score: u8,
    /// Per-category sub-scores in configured order.
    pub category_scores: Vec<CategoryScoreBody>,
    /// Merged strength keywords.
    pub strengths: Vec<String>,
    /// Merged weakness keywords.
    pub weaknesses: Vec<String>,
    /// Band label.
    pub performance_band: PerformanceBand,
    /// True when the document store write failed.
    pub degraded: bool,
}

/// One category entry in the response.
#[derive(Debug, Serialize)]
pub struct CategoryScoreBody {
    /// Category identifier.
    pub name: String,
    /// Awarded points.
    pub score: u8,
}

impl AnalysisResponse {
    fn from_outcome(outcome: AnalysisOutcome) -> Self {
        let AggregatedResult {
            acoustic_score,
            category_scores,
            total_score,
            performance_band,
            strengths,
            weaknesses,
        } = outcome.result;
        Self {
            total_score,
            acoustic_score,
            category_scores: category_scores
                .into_iter()
                .map(|c| CategoryScoreBody {
                    name: c.category.as_str().to_string(),
                    score: c.score,
                })
                .collect(),
            strengths,
            weaknesses,
            performance_band,
            degraded: outcome.degraded,
        }
    }
}

/// Structured error body: `{"error": {"kind": ..., "detail": ...}}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    detail: String,
}

/// Map a pipeline failure onto an HTTP status.
fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PipelineError::AcousticAnalysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::StageFailed { .. } | PipelineError::Validation { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PipelineError::AggregationMismatch(_)
        | PipelineError::RequiredPersistence(_)
        | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &PipelineError) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        error!(kind = error.kind(), detail = %error, "analysis run failed");
    }
    (
        status,
        Json(ErrorBody {
            error: ErrorDetail {
                kind: error.kind(),
                detail: error.to_string(),
            },
        }),
    )
        .into_response()
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    match state.orchestrator.run(&request).await {
        Ok(outcome) => Json(AnalysisResponse::from_outcome(outcome)).into_response(),
        Err(error) => error_response(&error),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not installed").into_response(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
