//! Transcripts produced by the transcription collaborator.

use serde::{Deserialize, Serialize};

/// One recognized span of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Recognized text for the span.
    pub text: String,
    /// Start offset in seconds from the beginning of the recording.
    pub start_seconds: f64,
    /// End offset in seconds.
    pub end_seconds: f64,
}

/// Ordered recognized segments plus the concatenated answer text.
///
/// Owned by a single run and immutable once produced. An empty transcript
/// is a valid result — downstream rubric evaluation short-circuits on it
/// rather than treating it as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Recognized segments in temporal order.
    pub segments: Vec<TranscriptSegment>,
    /// Concatenation of all segment texts.
    pub text: String,
}

impl Transcript {
    /// Build a transcript from segments, concatenating their texts with a
    /// single space.
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self { segments, text }
    }

    /// Build a transcript from plain text with no segment timing.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: Vec::new(),
            text: text.into(),
        }
    }

    /// True when the concatenated text is empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
