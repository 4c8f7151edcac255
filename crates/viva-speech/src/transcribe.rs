//! Transcription adapter.

use serde::Deserialize;
use tracing::{debug, instrument};
use viva_core::transcript::{Transcript, TranscriptSegment};

use crate::asset::AudioAsset;
use crate::error::SpeechError;

/// Sidecar response for `/transcribe`.
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    text: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
}

/// HTTP adapter for the speech-to-text sidecar.
///
/// Empty recognized text is a valid result and propagates — a silent
/// recording is scored downstream, not rejected here.
#[derive(Debug, Clone)]
pub struct TranscriptionAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl TranscriptionAdapter {
    /// Create an adapter sharing the process-wide HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Transcribe a normalized asset.
    #[instrument(skip_all, fields(duration_s = asset.duration_seconds()))]
    pub async fn transcribe(&self, asset: &AudioAsset) -> Result<Transcript, SpeechError> {
        let bytes = asset
            .read_bytes()
            .await
            .map_err(|e| SpeechError::UnreadableAsset(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = truncate(&response.text().await.unwrap_or_default(), 300);
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: TranscribeResponse = response.json().await?;
        let segments = payload
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                text: s.text,
                start_seconds: s.start,
                end_seconds: s.end,
            })
            .collect();
        let transcript = Transcript {
            segments,
            text: payload.text,
        };
        debug!(chars = transcript.text.chars().count(), "transcription complete");
        Ok(transcript)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
