//! Command-line interface for sqlgrade.
//!
//! Provides commands for grading a submission against a reference,
//! inspecting the segmentation and similarity stages on their own,
//! drafting correction models, and browsing saved reports.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::{DocumentExtractor, FileExtractor, ModelService, RawDocument};
use crate::config;
use crate::core::correction::{generate_correction_model, Exercise};
use crate::core::similarity::{self, keyword_set, table_set};
use crate::core::{normalize, ReportStore, StatementSegmenter};
use crate::domain::{EvaluationReport, EvaluationStatus, PairKind};

/// sqlgrade - Automated grading of SQL coursework
#[derive(Parser, Debug)]
#[command(name = "sqlgrade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grade a submitted document against a reference document
    Evaluate {
        /// Submitted document (pdf, sql, txt or md)
        submission: String,

        /// Reference solution document
        reference: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Show per-statement similarity and feedback
        #[arg(short, long)]
        detailed: bool,

        /// Save the report under the reports directory
        #[arg(short, long)]
        save: bool,
    },

    /// Print the SQL statements found in a document
    Segment {
        /// Document to segment
        document: String,
    },

    /// Score two SQL statements against each other
    Compare {
        /// Submitted statement
        submitted: String,

        /// Reference statement
        reference: String,
    },

    /// Print the normalized form of a SQL statement
    Normalize {
        /// SQL statement
        sql: String,
    },

    /// Draft a correction model for an exercise
    CorrectionModel {
        /// Exercise title
        #[arg(short, long)]
        title: String,

        /// Exercise description
        #[arg(short, long)]
        description: String,
    },

    /// List saved evaluation reports
    Reports {
        /// Maximum number of reports to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show a saved evaluation report
    Report {
        /// Report ID (UUID)
        report_id: String,
    },

    /// Check that the model service is reachable
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Evaluate {
                submission,
                reference,
                json,
                detailed,
                save,
            } => evaluate(&submission, &reference, json, detailed, save).await,
            Commands::Segment { document } => segment(&document).await,
            Commands::Compare {
                submitted,
                reference,
            } => {
                compare(&submitted, &reference);
                Ok(())
            }
            Commands::Normalize { sql } => {
                println!("{}", normalize(&sql));
                Ok(())
            }
            Commands::CorrectionModel { title, description } => {
                correction_model(title, description).await
            }
            Commands::Reports { limit } => list_reports(limit).await,
            Commands::Report { report_id } => show_report(&report_id).await,
            Commands::Health => health().await,
            Commands::Config => show_config(),
        }
    }
}

/// Grade a submission and print the outcome
async fn evaluate(
    submission: &str,
    reference: &str,
    json: bool,
    detailed: bool,
    save: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let evaluator = cfg.evaluator();

    let report = evaluator
        .evaluate_detailed(&RawDocument::new(submission), &RawDocument::new(reference))
        .await;

    let saved = if save {
        let store = ReportStore::open(cfg.reports_dir()).await?;
        Some(store.save(&report).await?)
    } else {
        None
    };

    if json {
        let output = if detailed {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string_pretty(&report.outcome)
        };
        println!("{}", output.context("Failed to serialize report")?);
    } else {
        print_report(&report, detailed);
    }

    if let Some(path) = saved {
        eprintln!("\n[Report {} saved to {}]", report.id, path.display());
    }

    Ok(())
}

/// Print a report for humans
fn print_report(report: &EvaluationReport, detailed: bool) {
    let outcome = &report.outcome;

    println!("Report ID: {}", report.id);
    match &report.status {
        EvaluationStatus::Graded => println!("Status: graded"),
        EvaluationStatus::NoStatements => println!("Status: no SQL submitted"),
        EvaluationStatus::Failed { error } => println!("Status: failed ({})", error),
    }
    println!("Grade: {:.2}/20", outcome.grade);

    let criteria = outcome.criterion_details();
    if !criteria.is_empty() {
        println!("\nCriteria:");
        for criterion in criteria {
            println!(
                "  {:<14} {:>5.2}/10  (weight {:.1})",
                criterion.name, criterion.score, criterion.weight
            );
        }
    }

    if detailed && !report.comparisons.is_empty() {
        println!("\n{:<6} {:<12} {:<10} {:<8}", "PAIR", "KIND", "SIMILARITY", "SOURCE");
        println!("{}", "-".repeat(40));
        for comparison in &report.comparisons {
            let kind = match comparison.kind {
                PairKind::Matched => "matched",
                PairKind::MissingSubmission => "missing",
                PairKind::ExtraSubmission => "extra",
            };
            let source = if comparison.fallback { "fallback" } else { "model" };
            println!(
                "{:<6} {:<12} {:<10.2} {:<8}",
                comparison.submitted_index + 1,
                kind,
                comparison.similarity,
                source
            );
        }

        if let (Some(sub), Some(reference)) = (&report.submitted, &report.reference) {
            println!();
            println!(
                "Submitted: {} ({} pages, {} statements, {})",
                sub.reference, sub.pages, sub.statements, sub.fingerprint
            );
            println!(
                "Reference: {} ({} pages, {} statements, {})",
                reference.reference, reference.pages, reference.statements, reference.fingerprint
            );
        }
    }

    println!("\n{}", outcome.feedback);

    if !outcome.improvement_suggestions.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &outcome.improvement_suggestions {
            println!("  • {}", suggestion);
        }
    }
}

/// Print the statements segmented from a document
async fn segment(document: &str) -> Result<()> {
    let cfg = config::config()?;
    let extractor = FileExtractor::new(cfg.documents.clone());

    let pages = extractor.extract_pages(&RawDocument::new(document)).await?;
    let statements = StatementSegmenter::segment(&pages);

    if statements.is_empty() {
        println!("No SQL statements found ({} pages)", pages.len());
        return Ok(());
    }

    for statement in &statements {
        println!("-- [{}]", statement.index + 1);
        println!("{}", statement.text);
        println!();
    }
    eprintln!("[{} statements from {} pages]", statements.len(), pages.len());

    Ok(())
}

/// Print the similarity of two statements and the sets behind it
fn compare(submitted: &str, reference: &str) {
    let score = similarity::score(submitted, reference);

    let submitted_upper = submitted.trim().to_uppercase();
    let reference_upper = reference.trim().to_uppercase();
    let join = |set: std::collections::BTreeSet<String>| {
        set.into_iter().collect::<Vec<_>>().join(", ")
    };

    println!("Similarity: {:.2}", score);
    println!();
    println!("Keywords (submitted): {}", join(keyword_set(&submitted_upper)));
    println!("Keywords (reference): {}", join(keyword_set(&reference_upper)));
    println!("Tables (submitted):   {}", join(table_set(&submitted_upper)));
    println!("Tables (reference):   {}", join(table_set(&reference_upper)));
}

/// Draft a correction model with the configured model service
async fn correction_model(title: String, description: String) -> Result<()> {
    let cfg = config::config()?;
    let service = cfg.model_service();
    let exercise = Exercise { title, description };

    let draft = generate_correction_model(
        &service,
        &cfg.feedback.model,
        &exercise,
        cfg.feedback.timeout,
    )
    .await?;

    println!("{}", draft);
    Ok(())
}

/// List saved reports
async fn list_reports(limit: usize) -> Result<()> {
    let store = ReportStore::open_default().await?;
    let reports = store.list(limit).await?;

    if reports.is_empty() {
        println!("No reports found");
        return Ok(());
    }

    println!("{:<38} {:<22} {:<14} {:<8}", "REPORT ID", "EVALUATED", "STATUS", "GRADE");
    println!("{}", "-".repeat(84));

    for report in reports {
        let status = match &report.status {
            EvaluationStatus::Graded => "graded",
            EvaluationStatus::NoStatements => "no-sql",
            EvaluationStatus::Failed { .. } => "failed",
        };
        println!(
            "{:<38} {:<22} {:<14} {:<8.2}",
            report.id,
            report.evaluated_at.format("%Y-%m-%d %H:%M:%S"),
            status,
            report.outcome.grade
        );
    }

    Ok(())
}

/// Show one saved report
async fn show_report(report_id: &str) -> Result<()> {
    let id = Uuid::parse_str(report_id)
        .with_context(|| format!("Invalid report ID: {}", report_id))?;

    let store = ReportStore::open_default().await?;
    let report = store
        .load(id)
        .await?
        .with_context(|| format!("Report not found: {}", id))?;

    println!("Evaluated: {}", report.evaluated_at);
    print_report(&report, true);
    Ok(())
}

/// Check the model service
async fn health() -> Result<()> {
    let cfg = config::config()?;
    let service = cfg.model_service();

    tokio::time::timeout(Duration::from_secs(10), service.health_check())
        .await
        .with_context(|| format!("{} health check timed out", service.name()))?
        .with_context(|| format!("{} is not reachable at {}", service.name(), cfg.model_url))?;

    println!("{} is reachable at {} (model: {})", service.name(), cfg.model_url, cfg.feedback.model);
    Ok(())
}

/// Print resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!("  Reports:   {}", cfg.reports_dir().display());
    println!("  Documents: {}", cfg.documents.display());
    println!();
    println!("Model service:");
    println!("  URL:         {}", cfg.model_url);
    println!("  Model:       {}", cfg.feedback.model);
    println!("  Temperature: {}", cfg.feedback.temperature);
    println!(
        "  Max tokens:  {}",
        cfg.feedback.max_tokens.map(|n| n.to_string()).unwrap_or_else(|| "(unset)".to_string())
    );
    println!("  Timeout:     {}s", cfg.feedback.timeout.as_secs());
    println!("  Attempts:    {}", cfg.feedback.retry_policy.max_attempts);
    println!();
    println!("Grading:");
    println!("  Pairing: {:?}", cfg.pairing);

    Ok(())
}
