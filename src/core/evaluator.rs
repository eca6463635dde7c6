//! Evaluation pipeline.
//!
//! Extracts both documents, segments them, pairs statements by position,
//! scores and critiques each pair in order, and aggregates the result.
//! [`Evaluator::evaluate`] always returns a well-formed outcome: every error
//! and every panic below it becomes a zero-grade outcome that explains what
//! went wrong.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info, instrument, Instrument};

use crate::adapters::{DocumentExtractor, ExtractionError, RawDocument};
use crate::domain::{
    ComparisonResult, DocumentSummary, EvaluationOutcome, EvaluationReport, EvaluationStatus,
    ExtractedStatement,
};

use super::aggregator::{self, Readiness};
use super::feedback::FeedbackGenerator;
use super::normalizer::normalize;
use super::pairing::{pair_statements, unmatched_feedback, PairingPolicy};
use super::segmenter::StatementSegmenter;
use super::similarity;

/// Errors that stop an evaluation. Converted to a zero-grade outcome at the
/// pipeline boundary.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Aucune requête SQL n'a été trouvée dans le fichier de correction")]
    NoReferenceStatements,

    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

/// Grades a submitted document against a reference document
#[derive(Clone)]
pub struct Evaluator {
    extractor: Arc<dyn DocumentExtractor>,
    feedback: Arc<FeedbackGenerator>,
    pairing: PairingPolicy,
}

impl Evaluator {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, feedback: FeedbackGenerator) -> Self {
        Self {
            extractor,
            feedback: Arc::new(feedback),
            pairing: PairingPolicy::default(),
        }
    }

    pub fn with_pairing(mut self, pairing: PairingPolicy) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn pairing(&self) -> PairingPolicy {
        self.pairing
    }

    /// Grade `submitted` against `reference`
    pub async fn evaluate(&self, submitted: &RawDocument, reference: &RawDocument) -> EvaluationOutcome {
        self.evaluate_detailed(submitted, reference).await.outcome
    }

    /// Grade and keep the per-pair details
    #[instrument(skip_all, fields(submitted = %submitted, reference = %reference))]
    pub async fn evaluate_detailed(
        &self,
        submitted: &RawDocument,
        reference: &RawDocument,
    ) -> EvaluationReport {
        let this = self.clone();
        let submitted = submitted.clone();
        let reference = reference.clone();

        // Run on its own task so a panic anywhere in the pipeline is caught
        let task = tokio::spawn(
            async move { this.run(&submitted, &reference).await }.in_current_span(),
        );

        let failure = match task.await {
            Ok(Ok(report)) => {
                info!(
                    grade = report.outcome.grade,
                    pairs = report.comparisons.len(),
                    fallbacks = report.fallback_count(),
                    "Evaluation finished"
                );
                return report;
            }
            Ok(Err(e)) => e,
            Err(join_error) => EvaluationError::Unknown(join_error.to_string()),
        };

        let message = failure.to_string();
        error!(error = %message, "Evaluation failed");

        EvaluationReport::new(
            EvaluationStatus::Failed {
                error: message.clone(),
            },
            aggregator::error_outcome(&message),
        )
    }

    async fn run(
        &self,
        submitted: &RawDocument,
        reference: &RawDocument,
    ) -> Result<EvaluationReport, EvaluationError> {
        let submitted_pages = self.extractor.extract_pages(submitted).await?;
        let reference_pages = self.extractor.extract_pages(reference).await?;

        let submitted_statements = StatementSegmenter::segment(&submitted_pages);
        let reference_statements = StatementSegmenter::segment(&reference_pages);
        info!(
            submitted = submitted_statements.len(),
            reference = reference_statements.len(),
            "Statements segmented"
        );

        let submitted_summary = summarize(submitted, &submitted_pages, &submitted_statements);
        let reference_summary = summarize(reference, &reference_pages, &reference_statements);

        let (status, comparisons, outcome) =
            match aggregator::readiness(&submitted_statements, &reference_statements)? {
                Readiness::NothingSubmitted => {
                    info!("No SQL found in submission");
                    (
                        EvaluationStatus::NoStatements,
                        Vec::new(),
                        aggregator::no_statements_outcome(),
                    )
                }
                Readiness::Ready => {
                    let comparisons = self
                        .compare_all(&submitted_statements, &reference_statements)
                        .await;
                    let outcome = aggregator::aggregate(&comparisons);
                    (EvaluationStatus::Graded, comparisons, outcome)
                }
            };

        let mut report = EvaluationReport::new(status, outcome);
        report.submitted = Some(submitted_summary);
        report.reference = Some(reference_summary);
        report.comparisons = comparisons;
        Ok(report)
    }

    /// Compare pairs one after another, keeping statement order
    async fn compare_all(
        &self,
        submitted: &[ExtractedStatement],
        reference: &[ExtractedStatement],
    ) -> Vec<ComparisonResult> {
        let pairs = pair_statements(submitted, reference, self.pairing);
        let mut results = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let result = match (pair.submitted, pair.reference) {
                (Some(sub), Some(reference)) => {
                    let similarity = similarity::score(&sub.text, &reference.text);
                    info!(pair = pair.index, similarity, "Pair scored");

                    let feedback = self
                        .feedback
                        .generate(&sub.text, &reference.text, similarity)
                        .await;
                    ComparisonResult::matched(pair.index, similarity, feedback)
                }
                (sub, reference) => {
                    let kind = pair.kind();
                    let text = sub.or(reference).map(|s| normalize(&s.text)).unwrap_or_default();
                    debug!(pair = pair.index, ?kind, statement = %text, "Unmatched statement");
                    ComparisonResult::with_kind(pair.index, kind, 0.0, unmatched_feedback(kind))
                }
            };
            results.push(result);
        }

        results
    }
}

fn summarize(
    document: &RawDocument,
    pages: &[String],
    statements: &[ExtractedStatement],
) -> DocumentSummary {
    DocumentSummary {
        reference: document.reference.clone(),
        fingerprint: fingerprint(pages),
        pages: pages.len(),
        statements: statements.len(),
    }
}

/// Fingerprint of extracted text (first 16 chars of SHA256)
pub fn fingerprint(pages: &[String]) -> String {
    let mut hasher = Sha256::new();
    for page in pages {
        hasher.update(page.as_bytes());
        hasher.update(b"\x0c");
    }
    let result = hasher.finalize();
    hex::encode(&result[..8])
}
