//! Error types for the `docqa-rag` crate.
//!
//! Internal callers get typed errors; the fixed user-facing strings are only
//! produced at the boundary via the `user_message()` helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while indexing documents or retrieving from the index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index.
    #[error("Vector index error: {0}")]
    VectorIndexError(String),

    /// A document could not be loaded or its text could not be extracted.
    #[error("Failed to load document {path}: {message}")]
    LoaderError {
        /// Path of the document that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the ingestion pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem failure while reading documents or persisting the index.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted index could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failure reported by a single call to a completion endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The endpoint asked us to slow down (HTTP 429).
    #[error("rate limited by completion endpoint")]
    RateLimited,

    /// No credential is configured, so no request was sent.
    #[error("no API key configured for the completion endpoint")]
    MissingCredentials,

    /// The endpoint answered with a non-success status other than 429.
    #[error("completion endpoint returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("request to completion endpoint failed: {0}")]
    Transport(String),

    /// The response arrived but the answer text could not be extracted.
    #[error("could not decode completion response: {0}")]
    Decode(String),
}

/// Why a generation request did not produce an answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// No API key is configured.
    #[error("missing API credentials")]
    MissingCredentials,

    /// Every attempt was rate limited.
    #[error("rate limited on all {attempts} attempts")]
    RateLimitExhausted {
        /// Number of requests made before giving up.
        attempts: u32,
    },

    /// A non-retryable request failure.
    #[error("request failed: {message}")]
    Request {
        /// HTTP status if the endpoint answered.
        status: Option<u16>,
        /// A description of the failure.
        message: String,
    },
}

impl GenerationError {
    /// The in-band message shown to the end user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => {
                "API key not found. Please set the GEMINI_API_KEY environment variable."
            }
            Self::RateLimitExhausted { .. } => {
                "Max retries exceeded. Unable to connect to the assistant."
            }
            Self::Request { .. } => {
                "An error occurred while connecting to the assistant. Please try again."
            }
        }
    }
}

/// Why a question could not be answered.
#[derive(Debug, Error)]
pub enum AskError {
    /// Nothing has been indexed yet.
    #[error("no documents indexed")]
    NoDocuments,

    /// The index is populated but nothing relevant was retrieved.
    #[error("no relevant chunks found")]
    NoRelevantChunks,

    /// Retrieval itself failed (embedding the query, dimension mismatch, ...).
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RagError),

    /// The generation endpoint did not produce an answer.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl AskError {
    /// The in-band message shown to the end user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoDocuments => "No documents indexed yet. Please upload a PDF first.",
            Self::NoRelevantChunks => {
                "I'm sorry, I couldn't find any relevant information in the documents."
            }
            Self::Retrieval(_) => {
                "An error occurred while searching the documents. Please try again."
            }
            Self::Generation(e) => e.user_message(),
        }
    }
}

/// Why an uploaded file was not accepted.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Only PDF files are accepted.
    #[error("only PDF files are allowed, got '{file_name}'")]
    NotPdf {
        /// The rejected file name as supplied by the caller.
        file_name: String,
    },

    /// The file name is empty once unsafe characters are stripped.
    #[error("invalid file name '{0}'")]
    InvalidFileName(String),

    /// The file could not be written into the documents directory.
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    /// The file was stored but re-indexing failed.
    #[error("re-indexing failed: {0}")]
    Ingest(#[from] RagError),
}

impl UploadError {
    /// The in-band message shown to the end user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotPdf { .. } => "Only PDF files allowed.".to_string(),
            Self::InvalidFileName(name) => format!("Invalid file name '{name}'."),
            Self::Io(_) => "Failed to save the uploaded file.".to_string(),
            Self::Ingest(_) => "The file was saved but indexing failed.".to_string(),
        }
    }
}
