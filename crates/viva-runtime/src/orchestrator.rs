//! Pipeline orchestrator — one run, end to end.
//!
//! Stage order: fetch asset → acoustic analysis ∥ transcription → rubric
//! fan-out/fan-in → aggregation → persistence. Every external call goes
//! through the [`crate::stage`] retry wrapper. Dropping the returned
//! future cancels all in-flight child work for this run and reclaims the
//! temp asset; nothing persists before the final stage, so re-running the
//! same request after a crash is safe.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument};
use viva_core::acoustic;
use viva_core::aggregate::aggregate;
use viva_core::category::CategoryId;
use viva_core::request::AnalysisRequest;
use viva_core::result::{AggregatedResult, CategoryScore};
use viva_core::retry::RetryConfig;
use viva_core::transcript::Transcript;
use viva_rubric::config::RubricConfig;
use viva_rubric::{RubricError, RubricEvaluator, RubricSet};
use viva_speech::{AcousticAnalyzer, SpeechError, TranscriptionAdapter};
use viva_store::{PersistenceGateway, RunRecord};

use crate::asset::{AssetError, AssetStore};
use crate::error::{PipelineError, Stage};
use crate::stage::{StageFailure, run_stage};

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Retry policy for transient collaborator failures.
    pub retry: RetryConfig,
    /// Per-attempt timeout on every external call.
    pub call_timeout: Duration,
    /// Bounded width of the per-run category evaluation pool.
    pub rubric_concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(60),
            rubric_concurrency: 3,
        }
    }
}

/// A successful run: the aggregated result plus the persistence
/// degradation flag.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The composite scoring result.
    pub result: AggregatedResult,
    /// True when the document store write failed (relational rows landed).
    pub degraded: bool,
}

/// Sequences one analysis run across all collaborators.
pub struct PipelineOrchestrator {
    assets: Arc<dyn AssetStore>,
    analyzer: AcousticAnalyzer,
    transcriber: TranscriptionAdapter,
    evaluator: Arc<RubricEvaluator>,
    rubrics: Arc<RubricSet>,
    gateway: Arc<PersistenceGateway>,
    config: OrchestratorConfig,
    display_names: HashMap<CategoryId, String>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator over the shared collaborator clients.
    pub fn new(
        assets: Arc<dyn AssetStore>,
        analyzer: AcousticAnalyzer,
        transcriber: TranscriptionAdapter,
        evaluator: Arc<RubricEvaluator>,
        rubrics: Arc<RubricSet>,
        gateway: Arc<PersistenceGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        let display_names = rubrics
            .iter()
            .map(|c| (c.category.clone(), c.name.clone()))
            .collect();
        Self {
            assets,
            analyzer,
            transcriber,
            evaluator,
            rubrics,
            gateway,
            config,
            display_names,
        }
    }

    /// Run one request end to end.
    ///
    /// Returns exactly one [`AnalysisOutcome`] or a typed
    /// [`PipelineError`] — never a partial result.
    #[instrument(skip_all, fields(user_id = %request.user_id, question = request.question_num))]
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, PipelineError> {
        let configs = self.rubrics.for_question(request.question_num);
        if configs.is_empty() {
            return Err(PipelineError::InvalidRequest(format!(
                "no categories configured for question {}",
                request.question_num
            )));
        }
        counter!("pipeline_runs_total").increment(1);

        let asset = run_stage(Stage::FetchAsset, &self.config.retry, self.config.call_timeout, || {
            self.assets.fetch(&request.audio_reference)
        })
        .await
        .map_err(map_asset_failure)?;

        // No ordering dependency between the two speech stages.
        let (metrics_result, transcript_result) = tokio::join!(
            run_stage(
                Stage::AcousticAnalysis,
                &self.config.retry,
                self.config.call_timeout,
                || self.analyzer.analyze(&asset, request.gender),
            ),
            run_stage(
                Stage::Transcription,
                &self.config.retry,
                self.config.call_timeout,
                || self.transcriber.transcribe(&asset),
            ),
        );
        let metrics = metrics_result.map_err(|f| map_speech_failure(Stage::AcousticAnalysis, f))?;
        let transcript =
            transcript_result.map_err(|f| map_speech_failure(Stage::Transcription, f))?;

        // Both consumers are done with the audio; reclaim temp storage now
        // rather than at end of run.
        drop(asset);

        let category_scores = self.evaluate_categories(&configs, &transcript).await?;

        let acoustic_score = acoustic::acoustic_score(&metrics);
        let expected: Vec<CategoryId> = configs.iter().map(|c| c.category.clone()).collect();
        let result = aggregate(acoustic_score, &category_scores, &expected)?;

        let outcome = self
            .gateway
            .persist(&RunRecord {
                user_id: &request.user_id,
                question_num: request.question_num,
                metrics,
                transcript: &transcript,
                result: &result,
                display_names: &self.display_names,
            })
            .await?;

        info!(
            total = result.total_score,
            band = result.performance_band.as_str(),
            degraded = outcome.degraded,
            "analysis run complete"
        );
        Ok(AnalysisOutcome {
            result,
            degraded: outcome.degraded,
        })
    }

    /// Fan out category evaluations to a bounded pool and join them all.
    ///
    /// The first permanent failure aborts outstanding siblings and
    /// discards their partial results. Scores come back in configured
    /// category order regardless of completion order.
    async fn evaluate_categories(
        &self,
        configs: &[Arc<RubricConfig>],
        transcript: &Transcript,
    ) -> Result<Vec<CategoryScore>, PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.rubric_concurrency));
        let mut tasks: JoinSet<(usize, Result<CategoryScore, StageFailure<RubricError>>)> =
            JoinSet::new();

        for (index, config) in configs.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let evaluator = Arc::clone(&self.evaluator);
            let config = Arc::clone(config);
            let transcript = transcript.clone();
            let retry = self.config.retry;
            let call_timeout = self.config.call_timeout;
            let _ = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("rubric semaphore closed");
                let result = run_stage(Stage::RubricEvaluation, &retry, call_timeout, || {
                    evaluator.evaluate(&config, &transcript)
                })
                .await;
                (index, result)
            });
        }

        let mut scores: Vec<Option<CategoryScore>> = vec![None; configs.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) =
                joined.map_err(|e| PipelineError::Internal(format!("rubric task failed: {e}")))?;
            match result {
                Ok(score) => scores[index] = Some(score),
                Err(failure) => {
                    tasks.abort_all();
                    return Err(map_rubric_failure(failure));
                }
            }
        }

        // A hole here would be a fan-out bug; aggregation's category-set
        // check reports it as AggregationMismatch.
        Ok(scores.into_iter().flatten().collect())
    }
}

fn map_asset_failure(failure: StageFailure<AssetError>) -> PipelineError {
    match failure {
        StageFailure::Permanent(AssetError::NotFound(reference)) => {
            PipelineError::InvalidRequest(format!("asset not found: {reference}"))
        }
        StageFailure::Permanent(error) => PipelineError::Validation {
            stage: Stage::FetchAsset,
            detail: error.to_string(),
        },
        StageFailure::Exhausted { attempts, detail } => PipelineError::StageFailed {
            stage: Stage::FetchAsset,
            attempts,
            detail,
        },
    }
}

fn map_speech_failure(stage: Stage, failure: StageFailure<SpeechError>) -> PipelineError {
    match failure {
        StageFailure::Permanent(
            error @ (SpeechError::AcousticAnalysis(_) | SpeechError::UnreadableAsset(_)),
        ) if stage == Stage::AcousticAnalysis => {
            PipelineError::AcousticAnalysis(error.to_string())
        }
        StageFailure::Permanent(error) => PipelineError::Validation {
            stage,
            detail: error.to_string(),
        },
        StageFailure::Exhausted { attempts, detail } => PipelineError::StageFailed {
            stage,
            attempts,
            detail,
        },
    }
}

fn map_rubric_failure(failure: StageFailure<RubricError>) -> PipelineError {
    match failure {
        StageFailure::Permanent(error) => PipelineError::Validation {
            stage: Stage::RubricEvaluation,
            detail: error.to_string(),
        },
        StageFailure::Exhausted { attempts, detail } => PipelineError::StageFailed {
            stage: Stage::RubricEvaluation,
            attempts,
            detail,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::io::Write;
    use viva_core::request::Gender;
    use viva_rubric::EvaluatorOptions;
    use viva_rubric::config::Criterion;
    use viva_speech::AudioAsset;
    use viva_store::relational::{ScoreRepo, open_memory_pool};
    use viva_store::{ConnectionPool, DocumentClient};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Asset store backed by a fresh local temp file per fetch.
    struct FixtureAssetStore {
        duration_seconds: f64,
    }

    #[async_trait]
    impl AssetStore for FixtureAssetStore {
        async fn fetch(&self, _reference: &str) -> Result<AudioAsset, AssetError> {
            let mut file = tempfile::NamedTempFile::new()?;
            file.write_all(b"RIFF....WAVEfmt ")?;
            Ok(AudioAsset::from_temp(
                file.into_temp_path(),
                self.duration_seconds,
            ))
        }
    }

    fn rubric_set() -> Arc<RubricSet> {
        let communication = RubricConfig {
            category: CategoryId::from("communication"),
            name: "의사소통 능력".into(),
            allotment: 20,
            questions: vec![1, 2, 3, 4, 5, 6, 7],
            criteria: vec![Criterion {
                label: "명확성".into(),
                points: 20,
                bands: "20: 핵심이 분명함 / 10: 보통 / 0: 불분명".into(),
            }],
        };
        let org_fit = RubricConfig {
            category: CategoryId::from("org_fit"),
            name: "조직적합도".into(),
            allotment: 10,
            questions: vec![1, 2, 3, 4, 5, 6, 7],
            criteria: vec![Criterion {
                label: "협업".into(),
                points: 10,
                bands: "10: 우수 / 5: 보통 / 0: 미흡".into(),
            }],
        };
        Arc::new(RubricSet::from_configs(vec![communication, org_fit]).unwrap())
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            user_id: "u-1".into(),
            question_num: 5,
            audio_reference: "s3://bucket/u-1/5/answer.webm".into(),
            gender: Gender::Female,
        }
    }

    fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
            call_timeout: Duration::from_secs(5),
            rubric_concurrency: 3,
        }
    }

    fn orchestrator(
        speech: &MockServer,
        evaluator: &MockServer,
        pool: ConnectionPool,
        document: Option<DocumentClient>,
    ) -> PipelineOrchestrator {
        let client = reqwest::Client::new();
        PipelineOrchestrator::new(
            Arc::new(FixtureAssetStore {
                duration_seconds: 30.0,
            }),
            AcousticAnalyzer::new(client.clone(), speech.uri()),
            TranscriptionAdapter::new(client.clone(), speech.uri()),
            Arc::new(RubricEvaluator::new(
                client,
                EvaluatorOptions {
                    base_url: evaluator.uri(),
                    model: "gpt-4o-mini".into(),
                    api_key: Some("test-key".into()),
                    temperature: 0.3,
                    max_tokens: 1_500,
                },
            )),
            rubric_set(),
            Arc::new(PersistenceGateway::new(pool, document)),
            fast_config(),
        )
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    async fn mount_speech(server: &MockServer, pause_ratio: f64, speech_rate: f64, text: &str) {
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pause_ratio": pause_ratio,
                "speech_rate": speech_rate,
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": text, "segments": []})),
            )
            .mount(server)
            .await;
    }

    /// Evaluator answering per category: communication 17/20, org_fit 9/10.
    async fn mount_evaluator(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("의사소통 능력"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "평가총점 : 17\n강점:\n구체적 사례 제시\n약점:\n결론 미흡",
            )))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("조직적합도"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
                "평가총점 : 9\n강점:\n협업 경험\n약점:\n결론 미흡",
            )))
            .mount(server)
            .await;
    }

    // ── Happy path ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn full_run_aggregates_and_persists() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "저는 백엔드 개발자로 일했습니다").await;
        mount_evaluator(&evaluator).await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool.clone(), None);
        let outcome = orchestrator.run(&request()).await.unwrap();

        // Acoustic 40 (0.15 → 20, 5.5 → 20) + 17 + 9 = 66, average band.
        assert_eq!(outcome.result.acoustic_score, 40);
        assert_eq!(outcome.result.total_score, 66);
        assert_eq!(outcome.result.performance_band.as_str(), "average");
        assert!(!outcome.degraded);

        let ids: Vec<_> = outcome
            .result
            .category_scores
            .iter()
            .map(|c| c.category.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["communication", "org_fit"]);
        // "결론 미흡" appears in both categories, merged once.
        assert_eq!(outcome.result.weaknesses, vec!["결론 미흡"]);

        let conn = pool.get().unwrap();
        let row = ScoreRepo::get(&conn, "u-1", 5).unwrap().unwrap();
        assert_eq!(row.total_score, 66);
        assert_eq!(ScoreRepo::categories(&conn, "u-1", 5).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rerun_supersedes_previous_record_with_identical_result() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "동일한 답변").await;
        mount_evaluator(&evaluator).await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool.clone(), None);
        let first = orchestrator.run(&request()).await.unwrap();
        let second = orchestrator.run(&request()).await.unwrap();

        assert_eq!(first.result, second.result);
        let conn = pool.get().unwrap();
        assert_eq!(ScoreRepo::categories(&conn, "u-1", 5).unwrap().len(), 2);
    }

    // ── Retry behavior ──────────────────────────────────────────────────

    #[tokio::test]
    async fn transient_transcription_failure_recovers_to_same_result() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        // First transcription attempt fails transiently, second succeeds.
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .up_to_n_times(1)
            .mount(&speech)
            .await;
        mount_speech(&speech, 0.15, 5.5, "저는 백엔드 개발자로 일했습니다").await;
        mount_evaluator(&evaluator).await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool, None);
        let outcome = orchestrator.run(&request()).await.unwrap();
        assert_eq!(outcome.result.total_score, 66);
    }

    #[tokio::test]
    async fn exhausted_retry_ceiling_is_stage_failed() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(503).set_body_string("still down"))
            .mount(&speech)
            .await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pause_ratio": 0.15,
                "speech_rate": 5.5,
            })))
            .mount(&speech)
            .await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool.clone(), None);
        let err = orchestrator.run(&request()).await.unwrap_err();
        assert_matches!(
            err,
            PipelineError::StageFailed {
                stage: Stage::Transcription,
                attempts: 3,
                ..
            }
        );
        // Nothing persisted on a fatal failure.
        let conn = pool.get().unwrap();
        assert!(ScoreRepo::get(&conn, "u-1", 5).unwrap().is_none());
    }

    // ── Blank transcript ────────────────────────────────────────────────

    #[tokio::test]
    async fn blank_transcript_scores_zero_without_evaluator_calls() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&evaluator)
            .await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool, None);
        let outcome = orchestrator.run(&request()).await.unwrap();

        // Total is the acoustic score alone.
        assert_eq!(outcome.result.total_score, 40);
        for category in &outcome.result.category_scores {
            assert_eq!(category.score, 0);
            assert_eq!(category.strengths, vec!["발화 없음"]);
            assert_eq!(category.weaknesses, vec!["발화 없음"]);
        }
    }

    // ── Permanent failures ──────────────────────────────────────────────

    #[tokio::test]
    async fn malformed_rubric_response_fails_run_without_persisting() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "답변 내용").await;
        // communication gets a score above its 20-point allotment.
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("의사소통 능력"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body("평가총점 : 25\n강점:\n약점:")),
            )
            .mount(&evaluator)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("조직적합도"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body("평가총점 : 9\n강점:\n약점:")),
            )
            .mount(&evaluator)
            .await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool.clone(), None);
        let err = orchestrator.run(&request()).await.unwrap_err();
        assert_matches!(
            err,
            PipelineError::Validation {
                stage: Stage::RubricEvaluation,
                ..
            }
        );
        let conn = pool.get().unwrap();
        assert!(ScoreRepo::get(&conn, "u-1", 5).unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_duration_asset_is_acoustic_analysis_error() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "답변").await;

        let pool = open_memory_pool().unwrap();
        let client = reqwest::Client::new();
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FixtureAssetStore {
                duration_seconds: 0.0,
            }),
            AcousticAnalyzer::new(client.clone(), speech.uri()),
            TranscriptionAdapter::new(client.clone(), speech.uri()),
            Arc::new(RubricEvaluator::new(
                client,
                EvaluatorOptions {
                    base_url: evaluator.uri(),
                    model: "gpt-4o-mini".into(),
                    api_key: None,
                    temperature: 0.3,
                    max_tokens: 1_500,
                },
            )),
            rubric_set(),
            Arc::new(PersistenceGateway::new(pool, None)),
            fast_config(),
        );

        let err = orchestrator.run(&request()).await.unwrap_err();
        assert_matches!(err, PipelineError::AcousticAnalysis(_));
    }

    #[tokio::test]
    async fn unconfigured_question_is_invalid_request() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(&speech, &evaluator, pool, None);

        let mut bad = request();
        bad.question_num = 9;
        let err = orchestrator.run(&bad).await.unwrap_err();
        assert_matches!(err, PipelineError::InvalidRequest(_));
    }

    // ── Degraded persistence ────────────────────────────────────────────

    #[tokio::test]
    async fn document_store_failure_yields_degraded_success() {
        let speech = MockServer::start().await;
        let evaluator = MockServer::start().await;
        let documents = MockServer::start().await;
        mount_speech(&speech, 0.15, 5.5, "답변 내용").await;
        mount_evaluator(&evaluator).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&documents)
            .await;

        let pool = open_memory_pool().unwrap();
        let orchestrator = orchestrator(
            &speech,
            &evaluator,
            pool.clone(),
            Some(DocumentClient::new(reqwest::Client::new(), documents.uri())),
        );
        let outcome = orchestrator.run(&request()).await.unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.result.total_score, 66);

        // The relational write still landed.
        let conn = pool.get().unwrap();
        assert!(ScoreRepo::get(&conn, "u-1", 5).unwrap().is_some());
    }
}
