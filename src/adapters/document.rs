//! Document text extraction.
//!
//! Turns a document reference into ordered per-page plain text. PDFs go
//! through `pdf-extract`; plain-text documents are split into pages on the
//! form-feed character.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Page separator for plain-text documents
pub const PAGE_BREAK: char = '\x0c';

/// Opaque reference to a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawDocument {
    pub reference: String,
}

impl RawDocument {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

impl std::fmt::Display for RawDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reference)
    }
}

/// Extraction failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Document not found: {reference}")]
    DocumentNotFound { reference: String },

    #[error("Unsupported document format '{extension}': {reference}")]
    UnsupportedFormat { reference: String, extension: String },

    #[error("Failed to read document {reference}: {message}")]
    Unreadable { reference: String, message: String },
}

/// Trait for document text sources
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract per-page text, in page order
    async fn extract_pages(&self, document: &RawDocument) -> Result<Vec<String>, ExtractionError>;
}

/// Extractor reading documents from a local directory
#[derive(Debug, Clone)]
pub struct FileExtractor {
    /// Directory that references are resolved against
    root: PathBuf,
}

impl FileExtractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a reference to a path (absolute references are kept as-is)
    pub fn resolve(&self, document: &RawDocument) -> PathBuf {
        self.root.join(&document.reference)
    }
}

#[async_trait]
impl DocumentExtractor for FileExtractor {
    async fn extract_pages(&self, document: &RawDocument) -> Result<Vec<String>, ExtractionError> {
        let path = self.resolve(document);

        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ExtractionError::DocumentNotFound {
                reference: document.reference.clone(),
            });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        let pages = match extension.as_str() {
            "pdf" => {
                let pdf_path = path.clone();
                tokio::task::spawn_blocking(move || read_pdf_pages(&pdf_path))
                    .await
                    .map_err(|e| unreadable(document, e))?
                    .map_err(|message| ExtractionError::Unreadable {
                        reference: document.reference.clone(),
                        message,
                    })?
            }
            "txt" | "sql" | "md" => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| unreadable(document, e))?;
                split_pages(&content)
            }
            other => {
                return Err(ExtractionError::UnsupportedFormat {
                    reference: document.reference.clone(),
                    extension: other.to_string(),
                })
            }
        };

        debug!(document = %document, pages = pages.len(), "Extracted document text");
        Ok(pages)
    }
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_by_pages(path).map_err(|e| e.to_string())
}

fn unreadable(document: &RawDocument, error: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Unreadable {
        reference: document.reference.clone(),
        message: error.to_string(),
    }
}

/// Split plain text into pages on form feeds
pub fn split_pages(content: &str) -> Vec<String> {
    content.split(PAGE_BREAK).map(str::to_string).collect()
}

/// Extractor over text already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryExtractor {
    documents: HashMap<String, Vec<String>>,
}

impl InMemoryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `reference`
    pub fn with_document(mut self, reference: impl Into<String>, pages: Vec<String>) -> Self {
        self.documents.insert(reference.into(), pages);
        self
    }

    pub fn insert(&mut self, reference: impl Into<String>, pages: Vec<String>) {
        self.documents.insert(reference.into(), pages);
    }
}

#[async_trait]
impl DocumentExtractor for InMemoryExtractor {
    async fn extract_pages(&self, document: &RawDocument) -> Result<Vec<String>, ExtractionError> {
        self.documents
            .get(&document.reference)
            .cloned()
            .ok_or_else(|| ExtractionError::DocumentNotFound {
                reference: document.reference.clone(),
            })
    }
}
