//! Adapter interfaces for external systems.
//!
//! Adapters put the two collaborators of the grading pipeline behind
//! traits: the generative-model service that writes feedback, and the
//! document store that yields page text.

pub mod document;
pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// Re-export the concrete adapters
pub use document::{DocumentExtractor, ExtractionError, FileExtractor, InMemoryExtractor, RawDocument};
pub use ollama::OllamaAdapter;

/// Request sent to a generative-model service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name (e.g. "deepseek-coder")
    pub model: String,

    /// Full prompt text
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Output length budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for generative-model backends
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Generate a full reply for the request.
    ///
    /// Callers enforce their own deadline; implementations need not.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Health check (is the backend reachable)
    async fn health_check(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_missing_max_tokens() {
        let request = GenerationRequest::new("deepseek-coder", "hi", 0.1);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "deepseek-coder");
        assert_eq!(json["prompt"], "hi");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_with_max_tokens() {
        let request = GenerationRequest::new("m", "p", 0.7).with_max_tokens(800);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["max_tokens"], 800);
    }
}
