//! Document ingestion: load → chunk → embed → index → persist.
//!
//! The [`IngestionPipeline`] decides whether a persisted index can be reused
//! (see [`IndexFreshness`]) and otherwise rebuilds the whole index from the
//! PDFs in the documents directory. Durable storage is only written on the
//! rebuild path.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{IngestionPipeline, RagConfig};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! match pipeline.ingest("docs", "index").await? {
//!     Some(retriever) => println!("{:?}", retriever.retrieve_default("refund policy").await?),
//!     None => println!("no documents"),
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::{IndexFreshness, RagConfig};
use crate::document::{Chunk, Document, IndexedEntry};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::fingerprint::corpus_fingerprint;
use crate::index::VectorIndex;
use crate::loader::{DocumentLoader, PdfLoader, discover_pdfs};
use crate::retriever::Retriever;

/// Maximum number of chunk texts sent to the embedder in one call.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Orchestrates indexing of a documents directory.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    loader: Arc<dyn DocumentLoader>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Produce a retriever for `docs_dir`, reusing the index persisted in
    /// `index_dir` when the freshness policy allows.
    ///
    /// Returns `Ok(None)` when there is nothing to index.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted index is unreadable, or if
    /// embedding or persisting fails on the rebuild path.
    pub async fn ingest(
        &self,
        docs_dir: impl AsRef<Path>,
        index_dir: impl AsRef<Path>,
    ) -> Result<Option<Retriever>> {
        let docs_dir = docs_dir.as_ref();
        let index_dir = index_dir.as_ref();

        if let Some(index) = VectorIndex::load(index_dir).await? {
            if self.is_reusable(&index, docs_dir).await? {
                info!(path = %index_dir.display(), entry_count = index.len(), "reusing persisted index");
                return Ok(Some(self.retriever(index)));
            }
            VectorIndex::remove_persisted(index_dir).await?;
        } else {
            info!(path = %index_dir.display(), "no persisted index, indexing documents");
        }

        self.rebuild(docs_dir, index_dir).await
    }

    async fn is_reusable(&self, index: &VectorIndex, docs_dir: &Path) -> Result<bool> {
        let expected = self.embedding_provider.dimensions();
        if !index.is_empty() && index.dimensions() != expected {
            warn!(
                index_dimensions = index.dimensions(),
                provider_dimensions = expected,
                "persisted index was built with a different embedding model"
            );
            return Ok(false);
        }

        if self.config.freshness != IndexFreshness::Fingerprint {
            return Ok(true);
        }
        let current = corpus_fingerprint(&discover_pdfs(docs_dir).await?).await?;
        let fresh = index.corpus_fingerprint() == Some(current.as_str());
        if !fresh {
            info!(
                stored = index.corpus_fingerprint().unwrap_or("none"),
                current = %current,
                "documents changed since the index was built"
            );
        }
        Ok(fresh)
    }

    /// Index every PDF in `docs_dir` from scratch and persist the result,
    /// ignoring any existing index.
    ///
    /// Returns `Ok(None)` (and writes nothing) when there are no PDFs or
    /// none of them contain text.
    pub async fn rebuild(
        &self,
        docs_dir: impl AsRef<Path>,
        index_dir: impl AsRef<Path>,
    ) -> Result<Option<Retriever>> {
        let docs_dir = docs_dir.as_ref();
        let index_dir = index_dir.as_ref();

        let files = discover_pdfs(docs_dir).await?;
        if files.is_empty() {
            info!(path = %docs_dir.display(), "no PDF files found");
            return Ok(None);
        }

        let documents = self.load_documents(&files).await?;
        let page_count: usize = documents.iter().map(|d| d.pages.len()).sum();
        info!(document_count = documents.len(), page_count, "loaded pages from PDFs");

        let chunks: Vec<Chunk> = documents.iter().flat_map(|doc| self.chunker.chunk(doc)).collect();
        if chunks.is_empty() {
            info!(path = %docs_dir.display(), "documents contain no text");
            return Ok(None);
        }
        info!(chunk_count = chunks.len(), "split documents into chunks");

        let entries = self.embed_chunks(chunks).await?;
        let fingerprint = corpus_fingerprint(&files).await?;
        let index = VectorIndex::build(entries)?.with_corpus_fingerprint(fingerprint);

        index.persist(index_dir).await.map_err(|e| {
            error!(path = %index_dir.display(), error = %e, "failed to persist index");
            RagError::PipelineError(format!(
                "failed to persist index to '{}': {e}",
                index_dir.display()
            ))
        })?;

        info!(entry_count = index.len(), "indexing complete");
        Ok(Some(self.retriever(index)))
    }

    /// Remove the persisted index so the next [`ingest`](Self::ingest) rebuilds.
    pub async fn invalidate(&self, index_dir: impl AsRef<Path>) -> Result<()> {
        VectorIndex::remove_persisted(index_dir).await
    }

    async fn load_documents(&self, files: &[PathBuf]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let loader = Arc::clone(&self.loader);
            let owned = path.clone();
            let loaded = tokio::task::spawn_blocking(move || loader.load(&owned))
                .await
                .map_err(|e| RagError::PipelineError(format!("document loader panicked: {e}")))?;

            match loaded {
                Ok(document) => {
                    debug!(document.id = %document.id, page_count = document.pages.len(), "loaded document");
                    documents.push(document);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        Ok(documents)
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedEntry>> {
        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(error = %e, "embedding failed during ingestion");
                RagError::PipelineError(format!(
                    "embedding failed for document '{}': {e}",
                    batch[0].document_id
                ))
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::PipelineError(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }
            let expected = self.embedding_provider.dimensions();
            if let Some((chunk, embedding)) =
                batch.iter().zip(&embeddings).find(|(_, e)| e.len() != expected)
            {
                error!(chunk.id = %chunk.id, expected, actual = embedding.len(), "embedding dimension mismatch");
                return Err(RagError::PipelineError(format!(
                    "embedding for chunk '{}' has {} dimensions, provider declares {expected}",
                    chunk.id,
                    embedding.len()
                )));
            }
            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| IndexedEntry { chunk, embedding }),
            );
        }
        Ok(entries)
    }

    fn retriever(&self, index: VectorIndex) -> Retriever {
        Retriever::new(Arc::new(index), Arc::clone(&self.embedding_provider), self.config.top_k)
            .with_similarity_threshold(self.config.similarity_threshold)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `config` and `embedding_provider` are required. The chunker defaults to
/// a [`RecursiveChunker`] sized from the config and the loader to
/// [`PdfLoader`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<Arc<dyn DocumentLoader>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the [`IngestionPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let loader = self.loader.unwrap_or_else(|| Arc::new(PdfLoader::new()));

        Ok(IngestionPipeline { config, embedding_provider, chunker, loader })
    }
}
