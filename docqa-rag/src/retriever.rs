//! Top-k retrieval over a built [`VectorIndex`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Answers "which chunks are most relevant to this query" against one index.
///
/// Cloning is cheap: the index and embedder are shared. A retriever never
/// changes after construction; re-indexing produces a new one.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Wrap an index with the embedder used to build it.
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self { index, embedder, top_k, similarity_threshold: None }
    }

    /// Drop hits scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// The underlying index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// The configured default result count.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return up to `k` scored hits, best first.
    ///
    /// An empty index yields an empty result without calling the embedder.
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let mut hits = self.index.query(&query_embedding, k)?;
        if let Some(threshold) = self.similarity_threshold {
            hits.retain(|hit| hit.score >= threshold);
        }

        debug!(result_count = hits.len(), k, "retrieval completed");
        Ok(hits)
    }

    /// Embed `query` and return the text of up to `k` relevant chunks.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.retrieve_scored(query, k).await?.into_iter().map(|hit| hit.chunk.text).collect())
    }

    /// [`retrieve`](Self::retrieve) with the configured `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<String>> {
        self.retrieve(query, self.top_k).await
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("entries", &self.index.len())
            .field("top_k", &self.top_k)
            .field("similarity_threshold", &self.similarity_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::document::{Chunk, IndexedEntry};

    /// Maps a few known words to axis vectors.
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "cats" => vec![1.0, 0.0, 0.0],
                "dogs" => vec![0.0, 1.0, 0.0],
                _ => vec![0.6, 0.8, 0.0],
            })
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::EmbeddingError { provider: "test".into(), message: "down".into() })
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn entry(text: &str, embedding: Vec<f32>) -> IndexedEntry {
        IndexedEntry {
            chunk: Chunk {
                id: text.to_string(),
                document_id: "doc".to_string(),
                index: 0,
                text: text.to_string(),
                metadata: HashMap::new(),
            },
            embedding,
        }
    }

    fn index() -> Arc<VectorIndex> {
        Arc::new(
            VectorIndex::build(vec![
                entry("about cats", vec![1.0, 0.0, 0.0]),
                entry("about dogs", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn returns_best_chunk_text() {
        let retriever = Retriever::new(index(), Arc::new(AxisEmbedder), 1);
        assert_eq!(retriever.retrieve_default("dogs").await.unwrap(), vec!["about dogs"]);
    }

    #[tokio::test]
    async fn threshold_filters_weak_hits() {
        let retriever = Retriever::new(index(), Arc::new(AxisEmbedder), 2)
            .with_similarity_threshold(Some(0.9));
        assert_eq!(retriever.retrieve("cats", 2).await.unwrap(), vec!["about cats"]);
        assert!(retriever.retrieve("mixed", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_index_is_empty_result_not_error() {
        let empty = Arc::new(VectorIndex::build(Vec::new()).unwrap());
        let retriever = Retriever::new(empty, Arc::new(FailingEmbedder), 4);
        assert!(retriever.retrieve("anything", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedder_failure_is_pipeline_error() {
        let retriever = Retriever::new(index(), Arc::new(FailingEmbedder), 4);
        let err = retriever.retrieve("cats", 4).await.unwrap_err();
        assert!(matches!(err, RagError::PipelineError(_)));
    }
}
