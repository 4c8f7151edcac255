//! Fan-in of acoustic and category sub-scores into an [`AggregatedResult`].
//!
//! Pure and deterministic: identical inputs always produce an identical
//! result, so a stored result can be re-derived from its stored sub-scores.

use std::collections::HashSet;

use thiserror::Error;

use crate::category::CategoryId;
use crate::result::{AggregatedResult, CategoryScore, PerformanceBand};

/// The supplied category result set does not match the configured set for
/// the request — a dropped or duplicated fan-out branch.
#[derive(Debug, Clone, Error)]
pub enum AggregateError {
    /// A configured category has no result.
    #[error("missing category result: {0}")]
    MissingCategory(CategoryId),

    /// The same category appears more than once.
    #[error("duplicate category result: {0}")]
    DuplicateCategory(CategoryId),

    /// A result was supplied for a category that is not configured for
    /// this request.
    #[error("unexpected category result: {0}")]
    UnexpectedCategory(CategoryId),

    /// Sub-scores summed past the 0–100 contract; indicates invalid
    /// upstream bounds rather than a fan-out bug.
    #[error("total score {0} exceeds 100")]
    TotalOutOfRange(u16),
}

/// Combine the acoustic sub-score and all category scores into one
/// [`AggregatedResult`].
///
/// `expected` is the configured category set for the request, in category
/// order. The supplied scores must cover exactly that set (any order, no
/// repeats); keyword merging follows the supplied order, which the
/// orchestrator keeps aligned with configuration order.
pub fn aggregate(
    acoustic_score: u8,
    category_scores: &[CategoryScore],
    expected: &[CategoryId],
) -> Result<AggregatedResult, AggregateError> {
    let mut seen: HashSet<&CategoryId> = HashSet::new();
    for cs in category_scores {
        if !seen.insert(&cs.category) {
            return Err(AggregateError::DuplicateCategory(cs.category.clone()));
        }
        if !expected.contains(&cs.category) {
            return Err(AggregateError::UnexpectedCategory(cs.category.clone()));
        }
    }
    for id in expected {
        if !seen.contains(id) {
            return Err(AggregateError::MissingCategory(id.clone()));
        }
    }

    let total: u16 =
        u16::from(acoustic_score) + category_scores.iter().map(|c| u16::from(c.score)).sum::<u16>();
    if total > 100 {
        return Err(AggregateError::TotalOutOfRange(total));
    }
    let total = total as u8;

    Ok(AggregatedResult {
        acoustic_score,
        category_scores: category_scores.to_vec(),
        total_score: total,
        performance_band: PerformanceBand::from_total(total),
        strengths: merge_keywords(category_scores.iter().map(|c| c.strengths.as_slice())),
        weaknesses: merge_keywords(category_scores.iter().map(|c| c.weaknesses.as_slice())),
    })
}

/// Merge keyword lists preserving input order, dropping exact-text repeats.
fn merge_keywords<'a>(lists: impl Iterator<Item = &'a [String]>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for keyword in list {
            if seen.insert(keyword.as_str()) {
                merged.push(keyword.clone());
            }
        }
    }
    merged
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn score(category: &str, score: u8, strengths: &[&str], weaknesses: &[&str]) -> CategoryScore {
        CategoryScore {
            category: CategoryId::from(category),
            score,
            strengths: strengths.iter().map(|s| (*s).to_string()).collect(),
            weaknesses: weaknesses.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn expected(ids: &[&str]) -> Vec<CategoryId> {
        ids.iter().copied().map(CategoryId::from).collect()
    }

    // ── Happy path ──────────────────────────────────────────────────────

    #[test]
    fn total_is_sum_of_sub_scores() {
        let scores = [
            score("communication", 18, &["명확한 전달"], &["속도 불균형"]),
            score("org_fit", 8, &["협업 경험"], &[]),
        ];
        let result = aggregate(35, &scores, &expected(&["communication", "org_fit"])).unwrap();
        assert_eq!(result.total_score, 61);
        assert_eq!(result.acoustic_score, 35);
        assert_eq!(result.performance_band, PerformanceBand::Average);
        assert_eq!(
            u16::from(result.total_score),
            u16::from(result.acoustic_score)
                + result
                    .category_scores
                    .iter()
                    .map(|c| u16::from(c.score))
                    .sum::<u16>()
        );
    }

    #[test]
    fn keywords_merge_in_category_order_with_dedup() {
        let scores = [
            score("communication", 10, &["구체적 사례", "명확한 전달"], &["없음"]),
            score("org_fit", 10, &["명확한 전달", "협업 경험"], &["없음", "근거 부족"]),
        ];
        let result = aggregate(20, &scores, &expected(&["communication", "org_fit"])).unwrap();
        assert_eq!(result.strengths, vec!["구체적 사례", "명확한 전달", "협업 경험"]);
        assert_eq!(result.weaknesses, vec!["없음", "근거 부족"]);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let scores = [
            score("communication", 17, &["a", "b"], &["c"]),
            score("problem_solving", 9, &["b", "d"], &["c", "e"]),
        ];
        let exp = expected(&["communication", "problem_solving"]);
        let first = aggregate(30, &scores, &exp).unwrap();
        let second = aggregate(30, &scores, &exp).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn zero_scores_aggregate_to_very_weak() {
        let scores = [score("communication", 0, &["발화 없음"], &["발화 없음"])];
        let result = aggregate(0, &scores, &expected(&["communication"])).unwrap();
        assert_eq!(result.total_score, 0);
        assert_eq!(result.performance_band, PerformanceBand::VeryWeak);
    }

    // ── Category set mismatches ─────────────────────────────────────────

    #[test]
    fn missing_category_is_rejected() {
        let scores = [score("communication", 10, &[], &[])];
        let err = aggregate(10, &scores, &expected(&["communication", "org_fit"])).unwrap_err();
        assert_matches!(err, AggregateError::MissingCategory(id) if id.as_str() == "org_fit");
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let scores = [
            score("communication", 10, &[], &[]),
            score("communication", 12, &[], &[]),
        ];
        let err = aggregate(10, &scores, &expected(&["communication"])).unwrap_err();
        assert_matches!(err, AggregateError::DuplicateCategory(_));
    }

    #[test]
    fn unexpected_category_is_rejected() {
        let scores = [
            score("communication", 10, &[], &[]),
            score("tech_stack", 5, &[], &[]),
        ];
        let err = aggregate(10, &scores, &expected(&["communication"])).unwrap_err();
        assert_matches!(err, AggregateError::UnexpectedCategory(id) if id.as_str() == "tech_stack");
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let scores = [score("communication", 70, &[], &[])];
        let err = aggregate(40, &scores, &expected(&["communication"])).unwrap_err();
        assert_matches!(err, AggregateError::TotalOutOfRange(110));
    }
}
