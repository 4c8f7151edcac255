//! Audio asset retrieval seam.
//!
//! The pipeline only depends on the [`AssetStore`] trait; the shipped
//! [`HttpAssetStore`] downloads a normalized WAV over HTTP into temp
//! storage and reads duration/format from the container header. The
//! upstream conversion collaborator guarantees normalization — the header
//! check here only verifies that guarantee held.

use std::io::Write;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use viva_core::errors::{Classify, ErrorClass, class_for_status};
use viva_speech::AudioAsset;

/// Errors from asset retrieval.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The reference does not resolve to an object.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Non-success status from the object store.
    #[error("asset fetch returned {status}")]
    Api {
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure.
    #[error("asset fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The downloaded object is not a normalized mono WAV.
    #[error("asset is not a normalized recording: {0}")]
    Malformed(String),

    /// Temp storage failure.
    #[error("temp storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for AssetError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) | Self::Malformed(_) | Self::Io(_) => ErrorClass::Permanent,
            Self::Api { status } => class_for_status(*status),
            Self::Http(e) => {
                if e.is_decode() || e.is_builder() {
                    ErrorClass::Permanent
                } else {
                    ErrorClass::Transient
                }
            }
        }
    }
}

/// Retrieval of normalized audio assets by reference.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fetch the referenced recording into local temp storage.
    async fn fetch(&self, reference: &str) -> Result<AudioAsset, AssetError>;
}

/// Asset store that downloads the normalized WAV over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    client: reqwest::Client,
}

impl HttpAssetStore {
    /// Create a store sharing the process-wide HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    #[instrument(skip(self))]
    async fn fetch(&self, reference: &str) -> Result<AudioAsset, AssetError> {
        let response = self.client.get(reference).send().await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AssetError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            return Err(AssetError::Api {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&bytes)?;
        let temp = file.into_temp_path();

        let (duration_seconds, channels) = wav_header(&temp)?;
        if channels != 1 {
            return Err(AssetError::Malformed(format!(
                "expected mono audio, found {channels} channels"
            )));
        }
        debug!(duration_seconds, bytes = bytes.len(), "asset downloaded");
        Ok(AudioAsset::from_temp(temp, duration_seconds))
    }
}

/// Read (duration, channel count) from the WAV header.
fn wav_header(path: &std::path::Path) -> Result<(f64, u16), AssetError> {
    let reader = hound::WavReader::open(path).map_err(|e| AssetError::Malformed(e.to_string()))?;
    let spec = reader.spec();
    let duration_seconds = f64::from(reader.duration()) / f64::from(spec.sample_rate);
    Ok((duration_seconds, spec.channels))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
