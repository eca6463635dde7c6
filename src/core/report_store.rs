//! File-based store for evaluation reports.
//!
//! One pretty-printed JSON file per report under `$SQLGRADE_HOME/reports`.
//! Only the CLI uses this; the submission system persists outcomes itself.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use uuid::Uuid;

use crate::domain::EvaluationReport;

/// Directory of saved reports
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    /// Open the store under the configured home directory
    pub async fn open_default() -> Result<Self> {
        Self::open(crate::config::reports_dir()?).await
    }

    /// Open (and create) a store at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create reports directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save a report, returning its path
    pub async fn save(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.report_path(report.id);
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;

        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        Ok(path)
    }

    /// Load a report by id
    pub async fn load(&self, id: Uuid) -> Result<Option<EvaluationReport>> {
        let path = self.report_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read report: {}", path.display()))?;
        let report = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report: {}", path.display()))?;

        Ok(Some(report))
    }

    /// Most recent reports first
    pub async fn list(&self, limit: usize) -> Result<Vec<EvaluationReport>> {
        let mut reports = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| Uuid::parse_str(n).ok())
            else {
                continue;
            };

            if let Ok(Some(report)) = self.load(id).await {
                reports.push(report);
            }
        }

        reports.sort_by(|a, b| b.evaluated_at.cmp(&a.evaluated_at));
        reports.truncate(limit);
        Ok(reports)
    }
}
