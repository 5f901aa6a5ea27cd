//! Brute-force vector index with on-disk persistence.
//!
//! [`VectorIndex`] keeps every [`IndexedEntry`] in insertion order and answers
//! nearest-neighbour queries by scanning them with cosine similarity. It is
//! immutable once built: re-indexing builds a new index and replaces the old
//! one, so concurrent readers never need a lock.
//!
//! The on-disk layout is a single `index.json` file inside the index
//! directory. Only the presence of that directory (and the file in it) is
//! part of the public contract.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{IndexedEntry, SearchResult};
use crate::error::{RagError, Result};

/// File name of the persisted index inside the index directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// An immutable collection of embedded chunks supporting similarity search.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::VectorIndex;
///
/// let index = VectorIndex::build(entries)?;
/// index.persist("index").await?;
/// let restored = VectorIndex::load("index").await?.expect("index was just written");
/// let hits = restored.query(&query_embedding, 4)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    entries: Vec<IndexedEntry>,
    dimensions: usize,
    corpus_fingerprint: Option<String>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    format_version: u32,
    dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    corpus_fingerprint: Option<&'a str>,
    entries: &'a [IndexedEntry],
}

#[derive(Deserialize)]
struct IndexFile {
    format_version: u32,
    dimensions: usize,
    #[serde(default)]
    corpus_fingerprint: Option<String>,
    entries: Vec<IndexedEntry>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex {
    /// Build a fresh index from entries, keeping their order for tie-breaking.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorIndexError`] if the embeddings do not all
    /// share the same, non-zero dimensionality.
    pub fn build(entries: Vec<IndexedEntry>) -> Result<Self> {
        let dimensions = entries.first().map_or(0, |e| e.embedding.len());
        if !entries.is_empty() && dimensions == 0 {
            return Err(RagError::VectorIndexError("embeddings must not be empty".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::VectorIndexError(format!(
                "chunk '{}' has {} dimensions, expected {dimensions}",
                bad.chunk.id,
                bad.embedding.len()
            )));
        }
        debug!(entry_count = entries.len(), dimensions, "built vector index");
        Ok(Self { entries, dimensions, corpus_fingerprint: None })
    }

    /// Record the fingerprint of the document set this index was built from.
    pub fn with_corpus_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.corpus_fingerprint = Some(fingerprint.into());
        self
    }

    /// The fingerprint recorded at build time, if any.
    pub fn corpus_fingerprint(&self) -> Option<&str> {
        self.corpus_fingerprint.as_deref()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality of the stored embeddings (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The indexed entries in insertion order.
    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }

    /// Return up to `k` chunks nearest to `embedding`, best first.
    ///
    /// Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorIndexError`] if the query's dimensionality
    /// differs from the index's.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimensions {
            return Err(RagError::VectorIndexError(format!(
                "query has {} dimensions, index has {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(&entry.embedding, embedding)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Restore a previously persisted index.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet: the directory
    /// is missing, empty, or has no index file.
    ///
    /// # Errors
    ///
    /// Returns an error if the index file exists but cannot be read or
    /// decoded, or was written by an unknown format version.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Option<Self>> {
        let dir = dir.as_ref();
        let mut listing = match tokio::fs::read_dir(dir).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %dir.display(), "no index directory");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if listing.next_entry().await?.is_none() {
            debug!(path = %dir.display(), "index directory is empty");
            return Ok(None);
        }

        let path = dir.join(INDEX_FILE_NAME);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %dir.display(), "index directory has no {INDEX_FILE_NAME}");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file: IndexFile = serde_json::from_slice(&bytes)?;
        if file.format_version != FORMAT_VERSION {
            return Err(RagError::VectorIndexError(format!(
                "unsupported index format version {} in {}",
                file.format_version,
                path.display()
            )));
        }

        let mut index = Self::build(file.entries)?;
        if !index.is_empty() && index.dimensions != file.dimensions {
            return Err(RagError::VectorIndexError(format!(
                "index header says {} dimensions, entries have {}",
                file.dimensions, index.dimensions
            )));
        }
        index.corpus_fingerprint = file.corpus_fingerprint;
        info!(path = %dir.display(), entry_count = index.len(), "loaded vector index");
        Ok(Some(index))
    }

    /// Durably write the index into `dir`, creating it if needed.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// a crash never leaves a half-written index behind.
    pub async fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let file = IndexFileRef {
            format_version: FORMAT_VERSION,
            dimensions: self.dimensions,
            corpus_fingerprint: self.corpus_fingerprint.as_deref(),
            entries: &self.entries,
        };
        let bytes = serde_json::to_vec(&file)?;

        let tmp = dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dir.join(INDEX_FILE_NAME)).await?;

        info!(path = %dir.display(), entry_count = self.len(), bytes = bytes.len(), "persisted vector index");
        Ok(())
    }

    /// Delete a persisted index so the next load reports nothing.
    ///
    /// Missing directories are fine.
    pub async fn remove_persisted(dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                info!(path = %dir.display(), "removed persisted index");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
