//! Domain types for the grading pipeline.
//!
//! - Statement: one segmented SQL statement
//! - Comparison: per-pair similarity and feedback
//! - Outcome: final grade, criterion scores and the report around them

pub mod comparison;
pub mod outcome;
pub mod statement;

// Re-export commonly used types
pub use comparison::{ComparisonResult, Feedback, PairKind, MAX_SUGGESTIONS};
pub use outcome::{
    Criterion, CriterionScore, DocumentSummary, EvaluationOutcome, EvaluationReport,
    EvaluationStatus, CRITERIA, MAX_CRITERION_SCORE, MAX_GRADE,
};
pub use statement::ExtractedStatement;
