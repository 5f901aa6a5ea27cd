//! # docqa-rag
//!
//! Retrieval-augmented question answering over a directory of PDF documents.
//!
//! ## Overview
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! persisted vector index. Each question is embedded, the nearest chunks are
//! retrieved, and a grounded prompt is sent to a completion endpoint that is
//! retried with exponential backoff when rate limited.
//!
//! - [`Chunker`] - [`RecursiveChunker`] (boundary-aware) and [`FixedSizeChunker`]
//! - [`EmbeddingProvider`] - text to vectors; [`OllamaEmbeddingProvider`] talks to Ollama
//! - [`VectorIndex`] - cosine-similarity index with `build` / `load` / `persist` / `query`
//! - [`IngestionPipeline`] - load PDFs, chunk, embed, index, persist
//! - [`Retriever`] - top-k chunk texts for a query
//! - [`PromptBuilder`] - grounded prompt with an optional context budget
//! - [`GenerationClient`] - bounded retry around a [`CompletionEndpoint`] such as [`GeminiEndpoint`]
//! - [`Assistant`] - `ask` and `upload_document` for the outside world
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::*;
//!
//! let config = RagConfig::default();
//! let embedder = Arc::new(OllamaEmbeddingProvider::new(EmbeddingConfig::default())?);
//! let pipeline = IngestionPipeline::builder().config(config).embedding_provider(embedder).build()?;
//!
//! let generation = GenerationConfig::from_env();
//! let generator = GenerationClient::new(Arc::new(GeminiEndpoint::new(&generation)?), generation.retry);
//!
//! let assistant = Assistant::builder()
//!     .pipeline(pipeline)
//!     .generator(generator)
//!     .docs_dir("docs")
//!     .index_dir("index")
//!     .start()
//!     .await?;
//!
//! println!("{}", assistant.ask("What is our refund policy?").await.answer);
//! ```

pub mod assistant;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod gemini;
pub mod generation;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use assistant::{Assistant, AssistantBuilder, Exchange, UploadOutcome, secure_filename};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, reconstruct};
pub use config::{EmbeddingConfig, GenerationConfig, IndexFreshness, RagConfig, RagConfigBuilder};
pub use document::{Chunk, ConversationTurn, Document, IndexedEntry, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{AskError, EndpointError, GenerationError, RagError, Result, UploadError};
pub use fingerprint::corpus_fingerprint;
pub use gemini::GeminiEndpoint;
pub use generation::{Backoff, CompletionEndpoint, GenerationClient, RetryPolicy};
pub use index::VectorIndex;
pub use loader::{DocumentLoader, PdfLoader, discover_pdfs, is_pdf};
pub use ollama::OllamaEmbeddingProvider;
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
pub use prompt::PromptBuilder;
pub use retriever::Retriever;
