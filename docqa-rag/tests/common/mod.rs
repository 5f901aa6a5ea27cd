//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::loader::document_id;
use docqa_rag::{
    CompletionEndpoint, Document, DocumentLoader, EmbeddingProvider, EndpointError, RagError,
};

/// Embeds text as its per-letter counts (a-z, case-insensitive), counting calls.
///
/// Texts made of different letters are orthogonal, identical texts are identical.
#[derive(Default)]
pub struct LetterCountEmbedder {
    embedded_texts: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl LetterCountEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of texts embedded so far, across single and batch calls.
    pub fn embedded_texts(&self) -> usize {
        self.embedded_texts.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut counts = vec![0.0f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        counts
    }
}

#[async_trait]
impl EmbeddingProvider for LetterCountEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        self.embedded_texts.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> docqa_rag::Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.embedded_texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Treats every `.pdf` file as plain UTF-8 text forming a single page.
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> docqa_rag::Result<Document> {
        let text = std::fs::read_to_string(path).map_err(|e| RagError::LoaderError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Document::new(document_id(path), vec![text]))
    }
}

/// What a [`ScriptedEndpoint`] does on one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(&'static str),
    RateLimited,
    ServerError,
    MissingKey,
}

impl Reply {
    fn into_result(self) -> Result<String, EndpointError> {
        match self {
            Reply::Answer(text) => Ok(text.to_string()),
            Reply::RateLimited => Err(EndpointError::RateLimited),
            Reply::ServerError => {
                Err(EndpointError::Http { status: 500, body: "internal".to_string() })
            }
            Reply::MissingKey => Err(EndpointError::MissingCredentials),
        }
    }
}

/// Plays back scripted replies, then repeats `fallback`; records call times
/// on the tokio clock and the prompts it received.
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<tokio::time::Instant>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEndpoint {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionEndpoint for ScriptedEndpoint {
    async fn complete(&self, prompt: &str) -> Result<String, EndpointError> {
        self.calls.lock().unwrap().push(tokio::time::Instant::now());
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());
        reply.into_result()
    }
}
