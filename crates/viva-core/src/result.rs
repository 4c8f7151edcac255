//! Scoring result types.

use serde::{Deserialize, Serialize};

use crate::category::CategoryId;

/// One of the five ordered overall performance labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceBand {
    /// 0–39.
    VeryWeak,
    /// 40–59.
    Weak,
    /// 60–79.
    Average,
    /// 80–89.
    Good,
    /// 90–100.
    Excellent,
}

impl PerformanceBand {
    /// Map a total score (0–100) into its band.
    pub fn from_total(total: u8) -> Self {
        match total {
            90.. => Self::Excellent,
            80..=89 => Self::Good,
            60..=79 => Self::Average,
            40..=59 => Self::Weak,
            _ => Self::VeryWeak,
        }
    }

    /// Wire/storage label, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryWeak => "very_weak",
            Self::Weak => "weak",
            Self::Average => "average",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// Result of one rubric evaluation call for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category this score belongs to.
    pub category: CategoryId,
    /// Awarded points, bounded by the category's allotment.
    pub score: u8,
    /// Strength keyword phrases in response order.
    pub strengths: Vec<String>,
    /// Weakness keyword phrases in response order.
    pub weaknesses: Vec<String>,
}

/// The composite result of one analysis run.
///
/// Computed once per run; immutable. `total_score` always equals
/// `acoustic_score + Σ category_scores[].score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Acoustic delivery sub-score, 0–40.
    pub acoustic_score: u8,
    /// Per-category content sub-scores in configured category order.
    pub category_scores: Vec<CategoryScore>,
    /// Composite score, 0–100.
    pub total_score: u8,
    /// Band label resolved from `total_score`.
    pub performance_band: PerformanceBand,
    /// Merged strength keywords, category order preserved, exact-text
    /// repeats removed.
    pub strengths: Vec<String>,
    /// Merged weakness keywords, same ordering rules.
    pub weaknesses: Vec<String>,
}
