//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON files are valid — missing fields get production defaults.

use serde::{Deserialize, Serialize};
use viva_core::retry::RetryConfig;

/// Root settings type for the Viva scoring service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VivaSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// HTTP server network settings.
    pub server: ServerSettings,
    /// Speech sidecar collaborator (acoustic analysis + transcription).
    pub speech: SpeechSettings,
    /// Text-evaluation collaborator.
    pub evaluator: EvaluatorSettings,
    /// Audio asset retrieval.
    pub assets: AssetSettings,
    /// Retry policy applied to transient collaborator failures.
    pub retry: RetryConfig,
    /// Pipeline fan-out settings.
    pub pipeline: PipelineSettings,
    /// Persistence settings.
    pub store: StoreSettings,
}

impl Default for VivaSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "viva".to_string(),
            server: ServerSettings::default(),
            speech: SpeechSettings::default(),
            evaluator: EvaluatorSettings::default(),
            assets: AssetSettings::default(),
            retry: RetryConfig::default(),
            pipeline: PipelineSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

/// HTTP server network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

/// Speech sidecar settings (acoustic feature extraction and transcription).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechSettings {
    /// Base URL of the sidecar, e.g. `http://localhost:9600`.
    pub base_url: String,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9600".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Text-evaluation collaborator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluatorSettings {
    /// Base URL of the chat-completions-style endpoint.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Bearer token. Usually supplied via `VIVA_EVALUATOR_API_KEY`
    /// rather than the settings file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Response token ceiling.
    pub max_tokens: u32,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1_500,
            timeout_ms: 45_000,
        }
    }
}

/// Audio asset retrieval settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetSettings {
    /// Download timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self { timeout_ms: 60_000 }
    }
}

/// Pipeline fan-out settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Bounded width of the per-run category evaluation pool.
    pub rubric_concurrency: usize,
    /// Directory of rubric configuration files.
    pub rubric_dir: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rubric_concurrency: 3,
            rubric_dir: "rubrics".to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Path of the relational `SQLite` database file.
    pub sqlite_path: String,
    /// Base URL of the optional document store. `None` disables document
    /// writes entirely (runs are then always non-degraded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_base_url: Option<String>,
    /// Document write timeout in milliseconds.
    pub document_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "viva.db".to_string(),
            document_base_url: None,
            document_timeout_ms: 10_000,
        }
    }
}
