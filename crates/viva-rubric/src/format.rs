//! The evaluator output-format contract.
//!
//! The text-evaluation collaborator must answer with exactly:
//!
//! ```text
//! 평가총점 : <integer>
//! 강점:
//! <keyword phrase>
//! <keyword phrase>
//! 약점:
//! <keyword phrase>
//! ```
//!
//! [`format_instruction`] emits this contract into every evaluation
//! instruction; [`parse_response`] parses it back fail-closed. Natural-
//! language generation is nondeterministic, so parsing rejects anything it
//! cannot account for instead of guessing.

use thiserror::Error;

/// Prefix of the mandatory total-score line.
pub const SCORE_LINE_PREFIX: &str = "평가총점";
/// Header opening the strengths keyword block.
pub const STRENGTHS_HEADER: &str = "강점";
/// Header opening the weaknesses keyword block.
pub const WEAKNESSES_HEADER: &str = "약점";
/// Canned keyword used for both blocks when the answer contains no speech.
pub const NO_UTTERANCE_KEYWORD: &str = "발화 없음";

/// A collaborator response that violates the format contract. Never
/// retried — re-prompting does not guarantee a well-formed answer.
#[derive(Debug, Clone, Error)]
pub enum RubricParseError {
    /// No `평가총점` line anywhere in the response.
    #[error("response has no score line")]
    MissingScoreLine,

    /// The score line carried something other than an integer.
    #[error("score line is not numeric: {0:?}")]
    InvalidScore(String),

    /// The score is outside `[0, allotment]`.
    #[error("score {score} outside 0–{allotment}")]
    ScoreOutOfRange {
        /// Parsed score value.
        score: i64,
        /// Category allotment.
        allotment: u8,
    },
}

/// A parsed, range-checked evaluator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvaluation {
    /// Awarded points, `0..=allotment`.
    pub score: u8,
    /// Strength keyword phrases in response order.
    pub strengths: Vec<String>,
    /// Weakness keyword phrases in response order.
    pub weaknesses: Vec<String>,
}

/// Render the output-format instruction for a category allotment.
pub fn format_instruction(allotment: u8) -> String {
    format!(
        "반드시 아래 형식 그대로만 응답하세요. 다른 텍스트는 포함하지 마세요.\n\
         {SCORE_LINE_PREFIX} : <0-{allotment} 사이의 정수>\n\
         {STRENGTHS_HEADER}:\n\
         <강점 키워드 구문, 한 줄에 하나씩, 마침표 없이>\n\
         {WEAKNESSES_HEADER}:\n\
         <약점 키워드 구문, 한 줄에 하나씩, 마침표 없이>"
    )
}

/// Parse a collaborator response against the contract.
///
/// The score line is mandatory and range-checked against `allotment`.
/// Keyword blocks may be empty; lines before the first marker are ignored
/// (some models emit a short preamble despite the instruction).
pub fn parse_response(text: &str, allotment: u8) -> Result<ParsedEvaluation, RubricParseError> {
    #[derive(PartialEq)]
    enum Section {
        Preamble,
        Strengths,
        Weaknesses,
    }

    let mut score: Option<u8> = None;
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut section = Section::Preamble;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(SCORE_LINE_PREFIX) {
            if score.is_none() {
                score = Some(parse_score_line(line, allotment)?);
            }
        } else if line.starts_with(STRENGTHS_HEADER) {
            section = Section::Strengths;
        } else if line.starts_with(WEAKNESSES_HEADER) {
            section = Section::Weaknesses;
        } else {
            match section {
                Section::Preamble => {}
                Section::Strengths => strengths.push(line.to_string()),
                Section::Weaknesses => weaknesses.push(line.to_string()),
            }
        }
    }

    let score = score.ok_or(RubricParseError::MissingScoreLine)?;
    Ok(ParsedEvaluation {
        score,
        strengths,
        weaknesses,
    })
}

fn parse_score_line(line: &str, allotment: u8) -> Result<u8, RubricParseError> {
    let value = line
        .split(':')
        .next_back()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('점');
    let score: i64 = value
        .parse()
        .map_err(|_| RubricParseError::InvalidScore(value.to_string()))?;
    if score < 0 || score > i64::from(allotment) {
        return Err(RubricParseError::ScoreOutOfRange { score, allotment });
    }
    Ok(score as u8)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // ── Well-formed responses ───────────────────────────────────────────

    #[test]
    fn parses_full_response() {
        let text = "평가총점 : 17\n강점:\n구체적 사례 제시\n직무 이해도 높음\n약점:\n결론 전개 미흡\n";
        let parsed = parse_response(text, 20).unwrap();
        assert_eq!(parsed.score, 17);
        assert_eq!(parsed.strengths, vec!["구체적 사례 제시", "직무 이해도 높음"]);
        assert_eq!(parsed.weaknesses, vec!["결론 전개 미흡"]);
    }

    #[test]
    fn keyword_blocks_may_be_empty() {
        let parsed = parse_response("평가총점 : 0\n강점:\n약점:\n", 20).unwrap();
        assert_eq!(parsed.score, 0);
        assert!(parsed.strengths.is_empty());
        assert!(parsed.weaknesses.is_empty());
    }

    #[test]
    fn preamble_lines_are_ignored() {
        let text = "다음은 평가 결과입니다.\n평가총점 : 12\n강점:\n간결한 표현\n약점:\n근거 부족";
        let parsed = parse_response(text, 20).unwrap();
        assert_eq!(parsed.score, 12);
        assert_eq!(parsed.strengths, vec!["간결한 표현"]);
    }

    #[test]
    fn score_line_with_suffix_unit_parses() {
        let parsed = parse_response("평가총점 : 15점\n강점:\n약점:", 20).unwrap();
        assert_eq!(parsed.score, 15);
    }

    #[test]
    fn allotment_boundaries_are_inclusive() {
        assert_eq!(parse_response("평가총점 : 0", 20).unwrap().score, 0);
        assert_eq!(parse_response("평가총점 : 20", 20).unwrap().score, 20);
    }

    // ── Malformed responses (fail-closed) ───────────────────────────────

    #[test]
    fn missing_score_line_is_rejected() {
        let err = parse_response("강점:\n좋은 태도\n약점:\n없음", 20).unwrap_err();
        assert_matches!(err, RubricParseError::MissingScoreLine);
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        let err = parse_response("평가총점 : 우수함\n강점:\n약점:", 20).unwrap_err();
        assert_matches!(err, RubricParseError::InvalidScore(_));
    }

    #[test]
    fn score_above_allotment_is_rejected() {
        let err = parse_response("평가총점 : 25\n강점:\n약점:", 20).unwrap_err();
        assert_matches!(
            err,
            RubricParseError::ScoreOutOfRange {
                score: 25,
                allotment: 20,
            }
        );
    }

    #[test]
    fn negative_score_is_rejected() {
        let err = parse_response("평가총점 : -3\n강점:\n약점:", 20).unwrap_err();
        assert_matches!(err, RubricParseError::ScoreOutOfRange { score: -3, .. });
    }

    #[test]
    fn first_score_line_wins() {
        let parsed = parse_response("평가총점 : 10\n평가총점 : 18\n강점:\n약점:", 20).unwrap();
        assert_eq!(parsed.score, 10);
    }

    // ── Instruction rendering ───────────────────────────────────────────

    #[test]
    fn instruction_names_the_allotment_and_markers() {
        let instruction = format_instruction(15);
        assert!(instruction.contains("0-15"));
        assert!(instruction.contains("평가총점"));
        assert!(instruction.contains("강점:"));
        assert!(instruction.contains("약점:"));
    }

    #[test]
    fn instruction_round_trips_through_parser() {
        // A response shaped exactly like the instruction's example parses.
        let response = "평가총점 : 11\n강점:\n핵심 전달\n약점:\n속도 조절";
        let parsed = parse_response(response, 15).unwrap();
        assert_eq!(parsed.score, 11);
    }
}
