//! Category identifiers.
//!
//! A category is one independent axis of content evaluation (communication,
//! job fit, ...). The set of categories is configuration-driven, so the
//! identifier is a validated string newtype rather than a closed enum.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an evaluation category (e.g. `communication`, `org_fit`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a category id from a snake_case identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
