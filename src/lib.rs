//! sqlgrade - Automated grading of SQL coursework
//!
//! Grades a student's SQL submission against a teacher's reference
//! solution. Both documents are reduced to ordered lists of SQL
//! statements, paired by position, scored structurally, and critiqued by a
//! generative model.
//!
//! # Architecture
//!
//! The pipeline is a straight line of small stages:
//! - Extraction: document -> page texts (`adapters::document`)
//! - Segmentation: page texts -> statements (`core::segmenter`)
//! - Scoring: statement pair -> similarity in [0, 1] (`core::similarity`)
//! - Feedback: statement pair -> critique, with a template fallback (`core::feedback`)
//! - Aggregation: comparisons -> grade out of 20 (`core::aggregator`)
//!
//! Evaluation never fails from the caller's point of view: any error
//! becomes a zero-grade outcome whose feedback explains what went wrong.
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Ollama, document storage)
//! - `core`: Grading logic (Segmenter, Similarity, Feedback, Evaluator)
//! - `domain`: Data structures (Statement, ComparisonResult, EvaluationOutcome)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Grade a submission
//! sqlgrade evaluate uploads/student.pdf uploads/correction.pdf --detailed
//!
//! # Inspect the statements found in a document
//! sqlgrade segment uploads/student.pdf
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{DocumentExtractor, ModelService, OllamaAdapter, RawDocument};
pub use core::{EvaluationError, Evaluator, FeedbackGenerator, FeedbackSettings, PairingPolicy};
pub use domain::{ComparisonResult, EvaluationOutcome, EvaluationReport, ExtractedStatement};
