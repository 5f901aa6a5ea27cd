//! Configuration for indexing, retrieval, embedding, and generation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::generation::RetryPolicy;

/// Environment variable holding the generation endpoint's API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the generation model.
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// When a persisted index may be reused instead of rebuilt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexFreshness {
    /// Reuse any persisted index, even after uploads. New documents are only
    /// picked up once the index directory is removed by hand.
    TrustPersisted,
    /// Reuse a persisted index at startup, but drop it whenever a document is
    /// uploaded so the upload is indexed.
    #[default]
    InvalidateOnUpload,
    /// Reuse a persisted index only while the documents directory still
    /// matches the fingerprint recorded when the index was built.
    Fingerprint,
}

/// Configuration parameters for chunking, retrieval, and prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Minimum similarity score for retrieved chunks. `None` keeps every hit.
    pub similarity_threshold: Option<f32>,
    /// Upper bound on the characters of context placed in a prompt.
    pub max_context_chars: Option<usize>,
    /// Reuse policy for persisted indexes.
    pub freshness: IndexFreshness,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            similarity_threshold: None,
            max_context_chars: None,
            freshness: IndexFreshness::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks to retrieve per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Bound the characters of retrieved context placed in each prompt.
    pub fn max_context_chars(mut self, max: usize) -> Self {
        self.config.max_context_chars = Some(max);
        self
    }

    /// Set the persisted index reuse policy.
    pub fn freshness(mut self, freshness: IndexFreshness) -> Self {
        self.config.freshness = freshness;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is NaN or infinite
    /// - `max_context_chars == Some(0)`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if let Some(threshold) = config.similarity_threshold {
            if !threshold.is_finite() {
                return Err(RagError::ConfigError(format!(
                    "similarity_threshold ({threshold}) must be a finite number"
                )));
            }
        }
        if config.max_context_chars == Some(0) {
            return Err(RagError::ConfigError(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Settings for the Ollama embedding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Dimensionality of the model's vectors.
    pub dimensions: usize,
    /// Timeout for each embedding request.
    pub request_timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Settings for the generation endpoint and its retry behaviour.
#[derive(Clone, PartialEq)]
pub struct GenerationConfig {
    /// Model name, without the `models/` prefix.
    pub model: String,
    /// Base URL of the API, ending in a slash.
    pub base_url: String,
    /// API key. `None` makes every generation fail fast with a credentials message.
    pub api_key: Option<String>,
    /// Timeout for each individual request.
    pub request_timeout: Duration,
    /// Retry schedule for rate-limited requests.
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationConfig {
    /// Read the API key (and optional model override) from the environment.
    ///
    /// A missing or empty key is not an error here; it surfaces when a
    /// question is asked.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        let mut config = Self { api_key, ..Self::default() };
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        config
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_splitter() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.freshness, IndexFreshness::InvalidateOnUpload);
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn rejects_zero_top_k_and_nan_threshold() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().similarity_threshold(f32::NAN).build().is_err());
        assert!(RagConfig::builder().max_context_chars(0).build().is_err());
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RagConfig::builder()
            .chunk_size(5)
            .chunk_overlap(0)
            .top_k(1)
            .similarity_threshold(0.25)
            .max_context_chars(4000)
            .freshness(IndexFreshness::Fingerprint)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.similarity_threshold, Some(0.25));
        assert_eq!(config.max_context_chars, Some(4000));
        assert_eq!(config.freshness, IndexFreshness::Fingerprint);
    }

    #[test]
    fn freshness_serializes_snake_case() {
        let json = serde_json::to_string(&IndexFreshness::InvalidateOnUpload).unwrap();
        assert_eq!(json, "\"invalidate_on_upload\"");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = GenerationConfig::default().with_api_key("secret-key");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
