//! Document Integration Tests
//!
//! Grading from files on disk and keeping the resulting reports.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use sqlgrade::adapters::{FileExtractor, GenerationRequest, ModelService, RawDocument};
use sqlgrade::core::{Evaluator, FeedbackGenerator, FeedbackSettings, ReportStore};
use sqlgrade::domain::EvaluationStatus;

/// Model service that is always down
struct Offline;

#[async_trait]
impl ModelService for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        anyhow::bail!("service offline")
    }

    async fn health_check(&self) -> Result<()> {
        anyhow::bail!("service offline")
    }
}

fn evaluator(root: &std::path::Path) -> Evaluator {
    Evaluator::new(
        Arc::new(FileExtractor::new(root)),
        FeedbackGenerator::new(Arc::new(Offline), FeedbackSettings::default()),
    )
}

#[tokio::test]
async fn test_grade_text_documents() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("copie.sql"),
        "-- Exercice 1\nSELECT titre FROM livres;\x0cSELECT nom\nFROM auteurs;",
    )
    .unwrap();
    std::fs::write(
        temp.path().join("correction.txt"),
        "SELECT titre FROM livres;\nSELECT nom FROM auteurs WHERE actif = 1;",
    )
    .unwrap();

    let report = evaluator(temp.path())
        .evaluate_detailed(&RawDocument::new("copie.sql"), &RawDocument::new("correction.txt"))
        .await;

    assert_eq!(report.status, EvaluationStatus::Graded);
    assert_eq!(report.submitted.as_ref().unwrap().pages, 2);
    assert_eq!(report.submitted.as_ref().unwrap().statements, 2);
    assert_eq!(report.comparisons.len(), 2);
    assert_eq!(report.comparisons[0].similarity, 1.0);
    assert_eq!(report.comparisons[1].similarity, 0.8);
    // mean 0.9
    assert_eq!(report.outcome.grade, 18.0);
    assert_eq!(report.fallback_count(), 2);
}

#[tokio::test]
async fn test_unsupported_and_corrupt_documents() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("copie.docx"), "SELECT 1;").unwrap();
    std::fs::write(temp.path().join("broken.pdf"), "definitely not a pdf").unwrap();
    std::fs::write(temp.path().join("correction.sql"), "SELECT 1;").unwrap();

    let evaluator = evaluator(temp.path());

    let unsupported = evaluator
        .evaluate(&RawDocument::new("copie.docx"), &RawDocument::new("correction.sql"))
        .await;
    assert_eq!(unsupported.grade, 0.0);
    assert!(unsupported.feedback.starts_with("Erreur lors de l'évaluation"));

    let corrupt = evaluator
        .evaluate(&RawDocument::new("broken.pdf"), &RawDocument::new("correction.sql"))
        .await;
    assert_eq!(corrupt.grade, 0.0);
    assert!(corrupt.feedback.contains("broken.pdf"));
}

#[tokio::test]
async fn test_reports_are_kept() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("copie.txt"), "Pas de réponse").unwrap();
    std::fs::write(temp.path().join("correction.txt"), "SELECT 1;").unwrap();

    let report = evaluator(temp.path())
        .evaluate_detailed(&RawDocument::new("copie.txt"), &RawDocument::new("correction.txt"))
        .await;
    assert_eq!(report.status, EvaluationStatus::NoStatements);

    let store = ReportStore::open(temp.path().join("reports")).await.unwrap();
    store.save(&report).await.unwrap();

    let listed = store.list(5).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, report.id);
    assert_eq!(listed[0].outcome, report.outcome);
}
