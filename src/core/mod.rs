//! Core grading logic.
//!
//! This module contains:
//! - Segmenter: document text -> SQL statements
//! - Normalizer: canonical display form of a statement
//! - Similarity: keyword/table overlap score
//! - Feedback: model-written critique with a deterministic fallback
//! - Pairing and Aggregator: alignment and final grade
//! - Evaluator: the pipeline boundary
//! - ReportStore: saved reports for the CLI

pub mod aggregator;
pub mod correction;
pub mod evaluator;
pub mod feedback;
pub mod normalizer;
pub mod pairing;
pub mod report_store;
pub mod retry;
pub mod segmenter;
pub mod similarity;

// Re-export commonly used types
pub use evaluator::{EvaluationError, Evaluator};
pub use feedback::{FeedbackError, FeedbackGenerator, FeedbackSettings};
pub use normalizer::normalize;
pub use pairing::PairingPolicy;
pub use report_store::ReportStore;
pub use retry::RetryPolicy;
pub use segmenter::StatementSegmenter;
