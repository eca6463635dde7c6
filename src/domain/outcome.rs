//! Grading outcome and the evaluation report built around it.
//!
//! The outcome is the only artifact handed back to the submission system.
//! The report wraps it with the per-pair details for CLI users and logs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::comparison::ComparisonResult;

/// Highest grade an evaluation can produce
pub const MAX_GRADE: f64 = 20.0;

/// Highest score a single criterion can receive
pub const MAX_CRITERION_SCORE: f64 = 10.0;

/// A named grading criterion with its weight in the final grade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criterion {
    pub name: &'static str,
    pub weight: f64,
}

/// The fixed criterion set. Weights sum to 1.
pub const CRITERIA: [Criterion; 3] = [
    Criterion {
        name: "syntax",
        weight: 0.4,
    },
    Criterion {
        name: "logic",
        weight: 0.4,
    },
    Criterion {
        name: "optimization",
        weight: 0.2,
    },
];

/// Score for one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub name: String,

    /// Weight in [0, 1]
    pub weight: f64,

    /// Score in [0, 10]
    pub score: f64,
}

/// Final grading result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Grade in [0, 20]
    pub grade: f64,

    /// Multi-section human-readable feedback
    pub feedback: String,

    /// Criterion name -> score in [0, 10]
    pub criteria_scores: BTreeMap<String, f64>,

    /// Flattened suggestions in statement order
    pub improvement_suggestions: Vec<String>,
}

impl EvaluationOutcome {
    /// A zero-grade outcome with the given feedback and suggestions
    pub fn zero(feedback: impl Into<String>, suggestions: &[&str]) -> Self {
        Self {
            grade: 0.0,
            feedback: feedback.into(),
            criteria_scores: BTreeMap::new(),
            improvement_suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Criterion scores joined with their weights, in the fixed criterion order
    pub fn criterion_details(&self) -> Vec<CriterionScore> {
        CRITERIA
            .iter()
            .filter_map(|criterion| {
                self.criteria_scores
                    .get(criterion.name)
                    .map(|score| CriterionScore {
                        name: criterion.name.to_string(),
                        weight: criterion.weight,
                        score: *score,
                    })
            })
            .collect()
    }
}

/// How an evaluation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum EvaluationStatus {
    /// Statements were paired and graded
    Graded,

    /// The submission contained no SQL
    NoStatements,

    /// Grading was impossible; the outcome carries the error
    Failed { error: String },
}

/// Fingerprint of a graded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub reference: String,

    /// First 16 hex chars of the SHA-256 of the extracted text
    pub fingerprint: String,

    pub pages: usize,
    pub statements: usize,
}

/// Outcome plus everything that led to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub status: EvaluationStatus,
    pub submitted: Option<DocumentSummary>,
    pub reference: Option<DocumentSummary>,
    pub comparisons: Vec<ComparisonResult>,
    pub outcome: EvaluationOutcome,
}

impl EvaluationReport {
    pub fn new(status: EvaluationStatus, outcome: EvaluationOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            status,
            submitted: None,
            reference: None,
            comparisons: Vec::new(),
            outcome,
        }
    }

    /// Number of pairs whose feedback fell back to the template
    pub fn fallback_count(&self) -> usize {
        self.comparisons.iter().filter(|c| c.fallback).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_weights_sum_to_one() {
        let total: f64 = CRITERIA.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() <= 0.01);
    }

    #[test]
    fn test_zero_outcome() {
        let outcome = EvaluationOutcome::zero("nothing", &["a", "b"]);

        assert_eq!(outcome.grade, 0.0);
        assert!(outcome.criteria_scores.is_empty());
        assert_eq!(outcome.improvement_suggestions, vec!["a", "b"]);
        assert!(outcome.criterion_details().is_empty());
    }

    #[test]
    fn test_criterion_details_follow_fixed_order() {
        let mut outcome = EvaluationOutcome::zero("", &[]);
        outcome.criteria_scores.insert("optimization".into(), 4.0);
        outcome.criteria_scores.insert("syntax".into(), 5.0);

        let details = outcome.criterion_details();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].name, "syntax");
        assert_eq!(details[1].name, "optimization");
        assert_eq!(details[1].weight, 0.2);
    }

    #[test]
    fn test_status_serialization() {
        let status = EvaluationStatus::Failed {
            error: "boom".into(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("boom"));
    }
}
