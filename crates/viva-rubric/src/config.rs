//! Rubric configuration loading and load-time validation.
//!
//! Criteria are externally authored JSON files, one per category. They are
//! validated once here — weight sums, band completeness, question coverage
//! — and never re-validated per call.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use viva_core::category::CategoryId;

/// Lowest and highest interview question numbers.
pub const QUESTION_RANGE: std::ops::RangeInclusive<u8> = 1..=7;

/// Ceiling on the summed allotments of the categories evaluated for any
/// single question (the content share of the 100-point composite).
pub const MAX_CONTENT_ALLOTMENT: u16 = 60;

/// One weighted sub-criterion of a category rubric.
#[derive(Debug, Clone, Deserialize)]
pub struct Criterion {
    /// Short label, e.g. `명확성`.
    pub label: String,
    /// Points this criterion contributes to the category allotment.
    pub points: u8,
    /// Scoring-band description shown to the evaluation collaborator.
    pub bands: String,
}

/// Validated evaluation criteria for one category.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricConfig {
    /// Category identifier.
    pub category: CategoryId,
    /// Korean display name carried into responses and documents.
    pub name: String,
    /// Total point allotment for the category.
    pub allotment: u8,
    /// Question numbers this category is evaluated for.
    pub questions: Vec<u8>,
    /// Ordered weighted sub-criteria. Weights sum to `allotment`.
    pub criteria: Vec<Criterion>,
}

/// Errors raised while loading or validating rubric configuration.
#[derive(Debug, Error)]
pub enum RubricConfigError {
    /// Config directory or file could not be read.
    #[error("failed to read rubric config: {0}")]
    Io(#[from] std::io::Error),

    /// A config file is not valid JSON or does not match the schema.
    #[error("failed to parse rubric config {file}: {source}")]
    Parse {
        /// Offending file name.
        file: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Criterion weights do not sum to the category allotment.
    #[error("category {category}: criterion points sum to {sum}, allotment is {allotment}")]
    WeightSum {
        /// Offending category.
        category: CategoryId,
        /// Actual sum of criterion points.
        sum: u16,
        /// Declared allotment.
        allotment: u8,
    },

    /// A category rubric is structurally incomplete.
    #[error("category {category}: {detail}")]
    Incomplete {
        /// Offending category.
        category: CategoryId,
        /// What is missing.
        detail: String,
    },

    /// The same category appears in more than one config file.
    #[error("duplicate rubric for category {0}")]
    DuplicateCategory(CategoryId),

    /// Allotments of the categories configured for one question exceed the
    /// content-score ceiling.
    #[error("question {question}: allotments sum to {sum}, ceiling is {MAX_CONTENT_ALLOTMENT}")]
    QuestionAllotment {
        /// Offending question number.
        question: u8,
        /// Summed allotments for that question.
        sum: u16,
    },

    /// No rubric configs were found at all.
    #[error("no rubric configs found in {0}")]
    Empty(String),
}

impl RubricConfig {
    /// Validate one category rubric in isolation.
    fn validate(&self) -> Result<(), RubricConfigError> {
        let incomplete = |detail: &str| RubricConfigError::Incomplete {
            category: self.category.clone(),
            detail: detail.to_string(),
        };

        if self.allotment == 0 {
            return Err(incomplete("allotment must be positive"));
        }
        if self.name.trim().is_empty() {
            return Err(incomplete("display name is empty"));
        }
        if self.criteria.is_empty() {
            return Err(incomplete("no criteria"));
        }
        if self.questions.is_empty() {
            return Err(incomplete("no applicable questions"));
        }
        for q in &self.questions {
            if !QUESTION_RANGE.contains(q) {
                return Err(incomplete(&format!("question {q} outside 1–7")));
            }
        }
        for criterion in &self.criteria {
            if criterion.bands.trim().is_empty() {
                return Err(incomplete(&format!(
                    "criterion {} has no band description",
                    criterion.label
                )));
            }
        }

        let sum: u16 = self.criteria.iter().map(|c| u16::from(c.points)).sum();
        if sum != u16::from(self.allotment) {
            return Err(RubricConfigError::WeightSum {
                category: self.category.clone(),
                sum,
                allotment: self.allotment,
            });
        }
        Ok(())
    }
}

/// The full validated rubric set, loaded once and shared across runs.
#[derive(Debug, Clone)]
pub struct RubricSet {
    configs: Vec<Arc<RubricConfig>>,
}

impl RubricSet {
    /// Build a set from in-memory configs, running all validation.
    pub fn from_configs(configs: Vec<RubricConfig>) -> Result<Self, RubricConfigError> {
        let mut seen: HashSet<CategoryId> = HashSet::new();
        for config in &configs {
            config.validate()?;
            if !seen.insert(config.category.clone()) {
                return Err(RubricConfigError::DuplicateCategory(config.category.clone()));
            }
        }

        let set = Self {
            configs: configs.into_iter().map(Arc::new).collect(),
        };

        for question in QUESTION_RANGE {
            let sum: u16 = set
                .for_question(question)
                .iter()
                .map(|c| u16::from(c.allotment))
                .sum();
            if sum > MAX_CONTENT_ALLOTMENT {
                return Err(RubricConfigError::QuestionAllotment { question, sum });
            }
        }
        Ok(set)
    }

    /// Load every `*.json` rubric from a directory, in file-name order so
    /// category order is deterministic across processes.
    pub fn load_dir(dir: &Path) -> Result<Self, RubricConfigError> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut configs = Vec::with_capacity(files.len());
        for path in &files {
            let raw = std::fs::read_to_string(path)?;
            let config: RubricConfig =
                serde_json::from_str(&raw).map_err(|source| RubricConfigError::Parse {
                    file: path.display().to_string(),
                    source,
                })?;
            configs.push(config);
        }

        if configs.is_empty() {
            return Err(RubricConfigError::Empty(dir.display().to_string()));
        }

        let set = Self::from_configs(configs)?;
        info!(categories = set.configs.len(), dir = %dir.display(), "rubric set loaded");
        Ok(set)
    }

    /// Categories evaluated for a question, in configured order.
    pub fn for_question(&self, question: u8) -> Vec<Arc<RubricConfig>> {
        self.configs
            .iter()
            .filter(|c| c.questions.contains(&question))
            .cloned()
            .collect()
    }

    /// Look up one category's rubric.
    pub fn get(&self, category: &CategoryId) -> Option<&Arc<RubricConfig>> {
        self.configs.iter().find(|c| &c.category == category)
    }

    /// All configured rubrics, in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RubricConfig>> {
        self.configs.iter()
    }

    /// Number of configured categories.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// True when no categories are configured.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
