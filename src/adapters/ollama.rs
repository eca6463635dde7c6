//! Ollama adapter for feedback generation.
//!
//! Talks to the `/api/generate` endpoint. Ollama streams its reply as
//! line-delimited JSON chunks; each chunk may carry a `response` text
//! fragment and the full reply is the concatenation of all fragments.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{GenerationRequest, ModelService};

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama adapter over HTTP
pub struct OllamaAdapter {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// One line of the streamed reply
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    response: Option<String>,
}

impl Default for OllamaAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl OllamaAdapter {
    /// Create an adapter pointing at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl ModelService for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = self.api_url("generate");

        let mut response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach model service at {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model service returned {}: {}", status, body.trim());
        }

        let mut collector = FragmentCollector::default();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read model service stream")?
        {
            collector.push(&chunk);
        }

        let reply = collector.finish();
        debug!(model = %request.model, chars = reply.len(), "Model reply received");
        Ok(reply)
    }

    async fn health_check(&self) -> Result<()> {
        let url = self.api_url("tags");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach model service at {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Model service health check failed: {}", response.status());
        }

        Ok(())
    }
}

/// Reassembles `response` fragments from a line-delimited JSON stream.
///
/// Network chunks do not line up with JSON lines, so bytes are buffered until
/// a newline arrives. Lines that do not decode are skipped.
#[derive(Debug, Default)]
pub struct FragmentCollector {
    pending: Vec<u8>,
    reply: String,
}

impl FragmentCollector {
    /// Feed raw bytes from the stream
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line);
        }
    }

    /// Flush the trailing line and return the full reply
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.consume_line(&rest);
        self.reply
    }

    fn consume_line(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match serde_json::from_str::<GenerateChunk>(text) {
            Ok(GenerateChunk {
                response: Some(fragment),
            }) => self.reply.push_str(&fragment),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Skipping undecodable stream line"),
        }
    }
}
