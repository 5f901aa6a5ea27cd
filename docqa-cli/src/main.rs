//! `docqa` - ask questions about a directory of PDF documents.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use docqa_rag::{
    Assistant, EmbeddingConfig, GeminiEndpoint, GenerationClient, GenerationConfig,
    IndexFreshness, IngestionPipeline, OllamaEmbeddingProvider, RagConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Answer questions from your PDF documents")]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the PDF documents
    #[arg(long, env = "DOCQA_DOCS_DIR", default_value = "docs", global = true)]
    docs_dir: PathBuf,

    /// Directory the vector index is persisted in
    #[arg(long, env = "DOCQA_INDEX_DIR", default_value = "index", global = true)]
    index_dir: PathBuf,

    /// Maximum characters per chunk
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 1000, global = true)]
    chunk_size: usize,

    /// Characters shared by adjacent chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 200, global = true)]
    chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = 4, global = true)]
    top_k: usize,

    /// Drop chunks scoring below this cosine similarity
    #[arg(long, env = "DOCQA_SIMILARITY_THRESHOLD", global = true)]
    similarity_threshold: Option<f32>,

    /// Cap on the characters of context placed in a prompt
    #[arg(long, env = "DOCQA_MAX_CONTEXT_CHARS", global = true)]
    max_context_chars: Option<usize>,

    /// When a persisted index may be reused
    #[arg(long, env = "DOCQA_FRESHNESS", value_enum, default_value_t = Freshness::InvalidateOnUpload, global = true)]
    freshness: Freshness,

    /// Generation model (defaults to GEMINI_MODEL or gemini-2.5-flash)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Ollama server used for embeddings
    #[arg(long, env = "DOCQA_OLLAMA_URL", default_value = "http://localhost:11434", global = true)]
    ollama_url: String,

    /// Ollama embedding model
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = "nomic-embed-text", global = true)]
    embedding_model: String,

    /// Dimensionality of the embedding model
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS", default_value_t = 768, global = true)]
    embedding_dimensions: usize,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive question loop (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Add a PDF to the documents directory and re-index
    Upload {
        /// Path of the PDF to add
        path: PathBuf,
    },
    /// Rebuild the index from scratch
    Index,
}

#[derive(Clone, Copy, ValueEnum)]
enum Freshness {
    Trust,
    InvalidateOnUpload,
    Fingerprint,
}

impl From<Freshness> for IndexFreshness {
    fn from(value: Freshness) -> Self {
        match value {
            Freshness::Trust => IndexFreshness::TrustPersisted,
            Freshness::InvalidateOnUpload => IndexFreshness::InvalidateOnUpload,
            Freshness::Fingerprint => IndexFreshness::Fingerprint,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

impl Cli {
    fn rag_config(&self) -> anyhow::Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .freshness(self.freshness.into());
        if let Some(threshold) = self.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(max) = self.max_context_chars {
            builder = builder.max_context_chars(max);
        }
        Ok(builder.build()?)
    }

    fn assistant(&self) -> anyhow::Result<Assistant> {
        let embedder = OllamaEmbeddingProvider::new(EmbeddingConfig {
            base_url: self.ollama_url.clone(),
            model: self.embedding_model.clone(),
            dimensions: self.embedding_dimensions,
            ..EmbeddingConfig::default()
        })?;
        let pipeline = IngestionPipeline::builder()
            .config(self.rag_config()?)
            .embedding_provider(Arc::new(embedder))
            .build()?;

        let mut generation = GenerationConfig::from_env();
        if let Some(model) = &self.model {
            generation = generation.with_model(model.clone());
        }
        let endpoint = GeminiEndpoint::new(&generation)?;
        let generator = GenerationClient::new(Arc::new(endpoint), generation.retry);

        Ok(Assistant::builder()
            .pipeline(pipeline)
            .generator(generator)
            .docs_dir(&self.docs_dir)
            .index_dir(&self.index_dir)
            .build()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let assistant = cli.assistant()?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            load_index(&assistant).await?;
            console::run(&assistant).await?;
        }
        Command::Ask { question } => {
            load_index(&assistant).await?;
            let exchange = assistant.ask(&question.join(" ")).await;
            println!("{}", exchange.answer);
        }
        Command::Upload { path } => match assistant.upload_file(&path).await {
            Ok(outcome) => println!("{}", console::describe_upload(&outcome)),
            Err(e) => anyhow::bail!("{}", e.user_message()),
        },
        Command::Index => {
            let indexed = assistant
                .rebuild()
                .await
                .with_context(|| format!("failed to index '{}'", assistant.docs_dir().display()))?;
            if indexed {
                println!(
                    "Indexed documents in {} into {}.",
                    assistant.docs_dir().display(),
                    assistant.index_dir().display()
                );
            } else {
                println!("No PDF documents found in {}.", assistant.docs_dir().display());
            }
        }
    }

    Ok(())
}

async fn load_index(assistant: &Assistant) -> anyhow::Result<()> {
    assistant.reingest().await.with_context(|| {
        format!("failed to load documents from '{}'", assistant.docs_dir().display())
    })?;
    Ok(())
}
