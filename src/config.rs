//! Configuration for sqlgrade.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SQLGRADE_HOME, SQLGRADE_DOCUMENTS,
//!    OLLAMA_API_URL, OLLAMA_MODEL)
//! 2. Config file (.sqlgrade/config.yaml)
//! 3. Defaults (~/.sqlgrade, current directory, local Ollama)
//!
//! Config file discovery:
//! - Searches current directory and parents for .sqlgrade/config.yaml
//! - Paths in config file are relative to the project root (the parent of .sqlgrade/)

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::ollama::DEFAULT_BASE_URL;
use crate::adapters::{FileExtractor, OllamaAdapter};
use crate::core::feedback::DEFAULT_MODEL;
use crate::core::{Evaluator, FeedbackGenerator, FeedbackSettings, PairingPolicy, RetryPolicy};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub model: Option<ModelConfig>,
    #[serde(default)]
    pub grading: Option<GradingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (reports)
    pub home: Option<String>,
    /// Root that document references are resolved against
    pub documents: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub url: Option<String>,
    pub name: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
    pub pairing: Option<PairingPolicy>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Document root
    pub documents: PathBuf,
    /// Model service base URL
    pub model_url: String,
    /// Feedback generation settings
    pub feedback: FeedbackSettings,
    /// Unmatched statement policy
    pub pairing: PairingPolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Reports directory ($SQLGRADE_HOME/reports)
    pub fn reports_dir(&self) -> PathBuf {
        self.home.join("reports")
    }

    /// Model service client for this configuration
    pub fn model_service(&self) -> OllamaAdapter {
        OllamaAdapter::new(self.model_url.clone())
    }

    /// Fully wired evaluator for this configuration
    pub fn evaluator(&self) -> Evaluator {
        let extractor = Arc::new(FileExtractor::new(self.documents.clone()));
        let feedback =
            FeedbackGenerator::new(Arc::new(self.model_service()), self.feedback.clone());

        Evaluator::new(extractor, feedback).with_pairing(self.pairing)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".sqlgrade").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine an optional config file with environment lookups and defaults
pub fn resolve_config<F>(
    config_file: Option<(PathBuf, ConfigFile)>,
    default_home: PathBuf,
    env: F,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let (config_path, config) = match config_file {
        Some((path, config)) => (Some(path), Some(config)),
        None => (None, None),
    };

    // Project root is the parent of .sqlgrade/
    let base_dir = config_path
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    let paths = config.as_ref().map(|c| c.paths.clone()).unwrap_or_default();
    let model = config.as_ref().and_then(|c| c.model.clone());
    let grading = config.as_ref().and_then(|c| c.grading.clone());

    let home = if let Some(env_home) = env("SQLGRADE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(ref home) = paths.home {
        resolve_path(&base_dir, home)
    } else {
        default_home
    };

    let documents = if let Some(env_docs) = env("SQLGRADE_DOCUMENTS") {
        PathBuf::from(env_docs)
    } else if let Some(ref docs) = paths.documents {
        resolve_path(&base_dir, docs)
    } else {
        cwd
    };

    let model_url = env("OLLAMA_API_URL")
        .or_else(|| model.as_ref().and_then(|m| m.url.clone()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let defaults = FeedbackSettings::default();
    let feedback = FeedbackSettings {
        model: env("OLLAMA_MODEL")
            .or_else(|| model.as_ref().and_then(|m| m.name.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        temperature: model
            .as_ref()
            .and_then(|m| m.temperature)
            .unwrap_or(defaults.temperature),
        max_tokens: model
            .as_ref()
            .and_then(|m| m.max_tokens)
            .or(defaults.max_tokens),
        timeout: model
            .as_ref()
            .and_then(|m| m.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
        retry_policy: model
            .as_ref()
            .and_then(|m| m.retry_policy.clone())
            .unwrap_or(defaults.retry_policy),
    };

    let pairing = grading.and_then(|g| g.pairing).unwrap_or_default();

    Ok(ResolvedConfig {
        home,
        documents,
        model_url,
        feedback,
        pairing,
        config_file: config_path,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".sqlgrade");

    let config_file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    resolve_config(config_file, default_home, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the reports directory
pub fn reports_dir() -> Result<PathBuf> {
    Ok(config()?.reports_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve_config(None, PathBuf::from("/tmp/home/.sqlgrade"), no_env).unwrap();

        assert_eq!(config.home, PathBuf::from("/tmp/home/.sqlgrade"));
        assert_eq!(config.model_url, DEFAULT_BASE_URL);
        assert_eq!(config.feedback.model, DEFAULT_MODEL);
        assert_eq!(config.feedback.max_tokens, Some(800));
        assert_eq!(config.feedback.timeout, Duration::from_secs(60));
        assert_eq!(config.pairing, PairingPolicy::Truncate);
        assert!(config.config_file.is_none());
        assert_eq!(config.reports_dir(), PathBuf::from("/tmp/home/.sqlgrade/reports"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".sqlgrade");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./state
  documents: uploads
model:
  url: http://gpu-box:11434
  name: sqlcoder
  timeout_seconds: 15
  retry_policy:
    max_attempts: 3
grading:
  pairing: penalize_missing
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.paths.documents, Some("uploads".to_string()));

        let config = resolve_config(
            Some((config_path.clone(), parsed)),
            PathBuf::from("/unused"),
            no_env,
        )
        .unwrap();

        assert_eq!(config.home, temp.path().join("state"));
        assert_eq!(config.documents, temp.path().join("uploads"));
        assert_eq!(config.model_url, "http://gpu-box:11434");
        assert_eq!(config.feedback.model, "sqlcoder");
        assert_eq!(config.feedback.timeout, Duration::from_secs(15));
        assert_eq!(config.feedback.retry_policy.max_attempts, 3);
        assert_eq!(config.pairing, PairingPolicy::PenalizeMissing);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let parsed: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
model:
  url: http://from-file:11434
  name: from-file
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            ("OLLAMA_API_URL", "http://from-env:11434"),
            ("OLLAMA_MODEL", "from-env"),
            ("SQLGRADE_DOCUMENTS", "/srv/uploads"),
        ]
        .into_iter()
        .collect();

        let config = resolve_config(
            Some((PathBuf::from("/project/.sqlgrade/config.yaml"), parsed)),
            PathBuf::from("/home/u/.sqlgrade"),
            |key| env.get(key).map(|v| v.to_string()),
        )
        .unwrap();

        assert_eq!(config.model_url, "http://from-env:11434");
        assert_eq!(config.feedback.model, "from-env");
        assert_eq!(config.documents, PathBuf::from("/srv/uploads"));
        assert_eq!(config.home, PathBuf::from("/home/u/.sqlgrade"));
    }

    #[test]
    fn test_invalid_pairing_is_rejected() {
        let result: Result<ConfigFile, _> = serde_yaml::from_str(
            r#"
version: "1.0"
grading:
  pairing: lenient
"#,
        );
        assert!(result.is_err());
    }
}
