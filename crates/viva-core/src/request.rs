//! Inbound analysis request types.

use serde::{Deserialize, Serialize};

/// Speaker gender, forwarded to the acoustic collaborator for F0 band
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male voice (75–300 Hz F0 band).
    Male,
    /// Female voice (100–500 Hz F0 band).
    Female,
}

impl Gender {
    /// Wire value sent to the speech sidecar.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// A request to score one spoken interview answer.
///
/// All fields are required. `audio_reference` addresses the external
/// retrieval collaborator (an object-store URL); the raw bytes never pass
/// through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Candidate identifier.
    pub user_id: String,
    /// Interview question number (1–7).
    pub question_num: u8,
    /// Reference to the recorded answer in the object store.
    pub audio_reference: String,
    /// Speaker gender.
    pub gender: Gender,
}
