//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document: the ordered page texts of one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier of the document, the source file name.
    pub id: String,
    /// Extracted text of each page, in page order.
    pub pages: Vec<String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document from its identifier and page texts.
    pub fn new(id: impl Into<String>, pages: Vec<String>) -> Self {
        Self { id: id.into(), pages, source_uri: None }
    }

    /// Set the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    /// The concatenated text of all pages, separated by newlines.
    pub fn text(&self) -> String {
        self.pages.join("\n")
    }
}

/// A contiguous span of a [`Document`]'s text, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of the chunk within its document.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Key-value metadata (`source`, `chunk_index`, and the document's source URI if any).
    pub metadata: HashMap<String, String>,
}

/// A [`Chunk`] paired with its embedding vector, as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedEntry {
    /// The chunk.
    pub chunk: Chunk,
    /// The vector embedding for the chunk's text.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// One question and the answer given to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    /// What the user asked.
    pub question: String,
    /// What the assistant replied, including in-band failure messages.
    pub answer: String,
}
