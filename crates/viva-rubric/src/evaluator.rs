//! Rubric evaluator — one collaborator call per category.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use viva_core::result::CategoryScore;
use viva_core::transcript::Transcript;

use crate::config::RubricConfig;
use crate::error::RubricError;
use crate::format::{self, NO_UTTERANCE_KEYWORD};

/// System role given to the text-evaluation collaborator.
const SYSTEM_PROMPT: &str = "당신은 전문 면접관으로서 지원자의 답변을 객관적이고 정확하게 평가하는 AI입니다. \
     각 카테고리의 배점 안에서 점수를 매기고, 구체적인 강점과 약점 키워드를 제시해야 합니다.";

/// Connection options for the text-evaluation collaborator.
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Base URL of the chat-completions-style endpoint.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Response token ceiling.
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the external text-evaluation collaborator.
pub struct RubricEvaluator {
    client: reqwest::Client,
    options: EvaluatorOptions,
}

impl RubricEvaluator {
    /// Create an evaluator sharing the process-wide HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, options: EvaluatorOptions) -> Self {
        Self { client, options }
    }

    /// Evaluate one category against a transcript.
    ///
    /// A blank transcript short-circuits to the fixed zero-score
    /// no-utterance result without calling the collaborator — the canned
    /// keywords are reproduced verbatim, never inferred from an
    /// empty-input prompt call.
    #[instrument(skip_all, fields(category = %config.category))]
    pub async fn evaluate(
        &self,
        config: &RubricConfig,
        transcript: &Transcript,
    ) -> Result<CategoryScore, RubricError> {
        if transcript.is_blank() {
            info!("blank transcript, returning canned no-utterance score");
            return Ok(no_utterance_score(config));
        }

        let prompt = build_prompt(config, transcript);
        let request = ChatRequest {
            model: &self.options.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.options.base_url))
            .json(&request);
        if let Some(key) = &self.options.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RubricError::Api {
                status: status.as_u16(),
                message: message.chars().take(300).collect(),
            });
        }

        let payload: ChatResponse = response.json().await?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(RubricError::EmptyResponse)?;

        let parsed = format::parse_response(&content, config.allotment)?;
        debug!(score = parsed.score, "category evaluated");
        Ok(CategoryScore {
            category: config.category.clone(),
            score: parsed.score,
            strengths: parsed.strengths,
            weaknesses: parsed.weaknesses,
        })
    }
}

/// The fixed result for an answer with no recognizable speech.
pub fn no_utterance_score(config: &RubricConfig) -> CategoryScore {
    CategoryScore {
        category: config.category.clone(),
        score: 0,
        strengths: vec![NO_UTTERANCE_KEYWORD.to_string()],
        weaknesses: vec![NO_UTTERANCE_KEYWORD.to_string()],
    }
}

/// Render the evaluation instruction from the rubric and the transcript.
fn build_prompt(config: &RubricConfig, transcript: &Transcript) -> String {
    use std::fmt::Write;

    let mut prompt = format!(
        "다음 면접 답변을 {} 관점에서 평가해주세요.\n\n답변 내용:\n\"{}\"\n\n평가 기준 (배점 {}점):\n",
        config.name, transcript.text, config.allotment
    );
    for criterion in &config.criteria {
        let _ = writeln!(
            prompt,
            "- {} ({}점): {}",
            criterion.label, criterion.points, criterion.bands
        );
    }
    let _ = write!(prompt, "\n{}", format::format_instruction(config.allotment));
    prompt
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
