//! Acoustic analysis adapter.
//!
//! Wraps the external feature-extraction sidecar: the asset bytes go out
//! as multipart, validated pause/rate metrics come back. The DSP itself
//! (silence detection, onset counting) is entirely the sidecar's concern.

use serde::Deserialize;
use tracing::{debug, instrument};
use viva_core::acoustic::AcousticMetrics;
use viva_core::request::Gender;

use crate::asset::AudioAsset;
use crate::error::SpeechError;

/// Sidecar response for `/analyze`.
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    pause_ratio: f64,
    speech_rate: f64,
}

/// HTTP adapter for the acoustic feature-extraction sidecar.
#[derive(Debug, Clone)]
pub struct AcousticAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl AcousticAnalyzer {
    /// Create an analyzer sharing the process-wide HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Derive delivery metrics for a normalized asset.
    ///
    /// Fails permanently on a zero-duration or unreadable asset and on any
    /// error the collaborator reports — those indicate malformed input, so
    /// retrying cannot help. Transport failures remain transient.
    #[instrument(skip_all, fields(duration_s = asset.duration_seconds()))]
    pub async fn analyze(
        &self,
        asset: &AudioAsset,
        gender: Gender,
    ) -> Result<AcousticMetrics, SpeechError> {
        if asset.duration_seconds() <= 0.0 {
            return Err(SpeechError::AcousticAnalysis(
                "zero-duration asset".to_string(),
            ));
        }

        let bytes = asset
            .read_bytes()
            .await
            .map_err(|e| SpeechError::UnreadableAsset(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("gender", gender.as_str());

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::AcousticAnalysis(format!(
                "collaborator returned {status}: {body}"
            )));
        }

        let payload: AnalyzeResponse = response.json().await?;
        debug!(
            pause_ratio = payload.pause_ratio,
            speech_rate = payload.speech_rate,
            "acoustic analysis complete"
        );
        Ok(AcousticMetrics::new(
            payload.pause_ratio,
            payload.speech_rate,
        )?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
