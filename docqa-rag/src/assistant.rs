//! The question-answering coordinator.
//!
//! [`Assistant`] owns the current [`Retriever`] and swaps it wholesale when
//! documents change. Each question takes a snapshot of the retriever, so a
//! question racing with re-indexing sees either the old index or the new one,
//! never a partial one. Re-indexing runs are serialised.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::config::IndexFreshness;
use crate::document::ConversationTurn;
use crate::error::{AskError, RagError, Result, UploadError};
use crate::generation::GenerationClient;
use crate::loader::is_pdf;
use crate::pipeline::IngestionPipeline;
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;

/// A question and the answer returned for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    /// The question as asked.
    pub query: String,
    /// The answer, or a user-readable explanation of why there is none.
    pub answer: String,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// The sanitised name the file was stored under.
    pub file_name: String,
    /// Whether an index is available after re-ingestion.
    pub indexed: bool,
}

/// Answers questions over a documents directory.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::Assistant;
///
/// let assistant = Assistant::builder()
///     .pipeline(pipeline)
///     .generator(generator)
///     .docs_dir("docs")
///     .index_dir("index")
///     .start()
///     .await?;
///
/// let exchange = assistant.ask("What is the refund policy?").await;
/// println!("{}", exchange.answer);
/// ```
pub struct Assistant {
    pipeline: IngestionPipeline,
    generator: GenerationClient,
    prompt: PromptBuilder,
    docs_dir: PathBuf,
    index_dir: PathBuf,
    current: RwLock<Option<Retriever>>,
    ingest_lock: Mutex<()>,
    history: RwLock<Vec<ConversationTurn>>,
}

impl Assistant {
    /// Create a new [`AssistantBuilder`].
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// The directory uploads are written to and documents are read from.
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// The directory the index is persisted in.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// A snapshot of the retriever in use, if anything is indexed.
    pub async fn current_retriever(&self) -> Option<Retriever> {
        self.current.read().await.clone()
    }

    /// Whether any documents are indexed.
    pub async fn has_index(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The questions asked since the document set last changed, oldest first.
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.read().await.clone()
    }

    /// Answer `query`, turning any failure into a user-readable answer.
    ///
    /// The exchange is appended to the history.
    #[instrument(skip(self), fields(query_len = query.len()))]
    pub async fn ask(&self, query: &str) -> Exchange {
        let answer = match self.try_answer(query).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "question not answered");
                e.user_message().to_string()
            }
        };

        self.history
            .write()
            .await
            .push(ConversationTurn { question: query.to_string(), answer: answer.clone() });

        Exchange { query: query.to_string(), answer }
    }

    /// Answer `query`, reporting failures as typed errors.
    ///
    /// # Errors
    ///
    /// - [`AskError::NoDocuments`] before anything is indexed; the
    ///   generation endpoint is not called
    /// - [`AskError::NoRelevantChunks`] when retrieval finds nothing
    /// - [`AskError::Retrieval`] / [`AskError::Generation`] when a
    ///   collaborator fails
    pub async fn try_answer(&self, query: &str) -> std::result::Result<String, AskError> {
        let retriever = self.current_retriever().await.ok_or(AskError::NoDocuments)?;

        let chunks = retriever.retrieve_default(query).await?;
        if chunks.is_empty() {
            return Err(AskError::NoRelevantChunks);
        }

        let prompt = self.prompt.build(chunks.as_slice(), query);
        Ok(self.generator.generate(&prompt).await?)
    }

    /// Run ingestion (reusing a persisted index when allowed) and swap in
    /// the result.
    pub async fn reingest(&self) -> Result<bool> {
        let _guard = self.ingest_lock.lock().await;
        let retriever = self.pipeline.ingest(&self.docs_dir, &self.index_dir).await?;
        Ok(self.install(retriever).await)
    }

    /// Discard any persisted index, rebuild from the documents directory,
    /// and swap in the result. Clears the history.
    pub async fn rebuild(&self) -> Result<bool> {
        let _guard = self.ingest_lock.lock().await;
        self.pipeline.invalidate(&self.index_dir).await?;
        let retriever = self.pipeline.rebuild(&self.docs_dir, &self.index_dir).await?;
        let indexed = self.install(retriever).await;
        self.history.write().await.clear();
        Ok(indexed)
    }

    /// Store an uploaded PDF in the documents directory and re-index.
    ///
    /// Non-PDF names are rejected before anything is written. On success the
    /// history is cleared, since earlier answers predate the new document.
    ///
    /// # Errors
    ///
    /// See [`UploadError`]. When the file was written but re-indexing failed
    /// the previous retriever stays in place.
    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    pub async fn upload_document(
        &self,
        file_name: &str,
        contents: &[u8],
    ) -> std::result::Result<UploadOutcome, UploadError> {
        if !is_pdf(file_name) {
            return Err(UploadError::NotPdf { file_name: file_name.to_string() });
        }
        let safe_name = secure_filename(file_name);
        if !is_pdf(&safe_name) || safe_name.len() <= ".pdf".len() {
            return Err(UploadError::InvalidFileName(file_name.to_string()));
        }

        let _guard = self.ingest_lock.lock().await;
        tokio::fs::create_dir_all(&self.docs_dir).await?;
        tokio::fs::write(self.docs_dir.join(&safe_name), contents).await?;
        info!(file_name = %safe_name, "stored upload");

        if self.pipeline.config().freshness == IndexFreshness::InvalidateOnUpload {
            self.pipeline.invalidate(&self.index_dir).await?;
        }
        let retriever = self.pipeline.ingest(&self.docs_dir, &self.index_dir).await?;
        let indexed = self.install(retriever).await;
        self.history.write().await.clear();

        Ok(UploadOutcome { file_name: safe_name, indexed })
    }

    /// Upload a PDF from a local path.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
    ) -> std::result::Result<UploadOutcome, UploadError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::InvalidFileName(path.display().to_string()))?;
        if !is_pdf(&file_name) {
            return Err(UploadError::NotPdf { file_name });
        }
        let contents = tokio::fs::read(path).await?;
        self.upload_document(&file_name, &contents).await
    }

    async fn install(&self, retriever: Option<Retriever>) -> bool {
        let indexed = retriever.is_some();
        *self.current.write().await = retriever;
        indexed
    }
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Keeps only the last path segment, turns whitespace into `_`, drops
/// everything outside `[A-Za-z0-9._-]`, and strips leading/trailing `.`
/// and `_`.
pub fn secure_filename(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Builder for an [`Assistant`].
///
/// `pipeline` and `generator` are required. The prompt builder defaults to
/// the pipeline config's context budget; directories default to `docs` and
/// `index`.
#[derive(Default)]
pub struct AssistantBuilder {
    pipeline: Option<IngestionPipeline>,
    generator: Option<GenerationClient>,
    prompt: Option<PromptBuilder>,
    docs_dir: Option<PathBuf>,
    index_dir: Option<PathBuf>,
}

impl AssistantBuilder {
    /// Set the ingestion pipeline.
    pub fn pipeline(mut self, pipeline: IngestionPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the generation client.
    pub fn generator(mut self, generator: GenerationClient) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the prompt builder.
    pub fn prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Set the documents directory.
    pub fn docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.docs_dir = Some(dir.into());
        self
    }

    /// Set the index directory.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    /// Build the assistant without indexing anything yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<Assistant> {
        let pipeline =
            self.pipeline.ok_or_else(|| RagError::ConfigError("pipeline is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let prompt = self.prompt.unwrap_or_else(|| {
            PromptBuilder::new().with_max_context_chars(pipeline.config().max_context_chars)
        });

        Ok(Assistant {
            pipeline,
            generator,
            prompt,
            docs_dir: self.docs_dir.unwrap_or_else(|| PathBuf::from("docs")),
            index_dir: self.index_dir.unwrap_or_else(|| PathBuf::from("index")),
            current: RwLock::new(None),
            ingest_lock: Mutex::new(()),
            history: RwLock::new(Vec::new()),
        })
    }

    /// Build the assistant and run the initial ingestion.
    pub async fn start(self) -> Result<Assistant> {
        let assistant = self.build()?;
        let indexed = assistant.reingest().await?;
        info!(indexed, docs_dir = %assistant.docs_dir.display(), "assistant ready");
        Ok(assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_strips_paths_and_symbols() {
        assert_eq!(secure_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(secure_filename("C:\\Users\\me\\My Report.pdf"), "My_Report.pdf");
        assert_eq!(secure_filename("résumé (final).pdf"), "rsum_final.pdf");
        assert_eq!(secure_filename("..hidden.pdf"), "hidden.pdf");
        assert_eq!(secure_filename("???"), "");
    }
}
