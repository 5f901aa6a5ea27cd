//! Ollama embedding provider using the local `/api/embed` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// An [`EmbeddingProvider`] backed by an Ollama server.
///
/// Uses `reqwest` to call `{base_url}/api/embed`, sending every text of a
/// batch in one request.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{EmbeddingConfig, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::new(EmbeddingConfig::default())?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider from the given configuration.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.request_timeout).build().map_err(
            |e| RagError::EmbeddingError {
                provider: "Ollama".into(),
                message: format!("failed to build HTTP client: {e}"),
            },
        )?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimensions: config.dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Ollama", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "Ollama".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Ollama", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbedRequest { model: &self.model, input: texts.to_vec() };

        let response =
            self.client.post(&self.endpoint).json(&request_body).send().await.map_err(|e| {
                error!(provider = "Ollama", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "Ollama".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = "Ollama", %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: "Ollama".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "Ollama".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
