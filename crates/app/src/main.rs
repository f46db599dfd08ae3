use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use pdf_chat_core::config::{DEFAULT_HUGGINGFACE_BASE_URL, DEFAULT_OPENAI_BASE_URL};
use pdf_chat_core::{
    ConversationOptions, EmbeddingBackend, GenerationBackend, IngestionOptions,
    PageFailurePolicy, Pipeline, ProcessSummary, ProviderSettings, SimilarityMetric,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod error;
mod handlers;
mod models;
mod state;
mod templates;
mod terminal;

use state::AppState;

#[derive(Parser)]
#[command(name = "pdf-chat", version, about = "Ask questions about a batch of PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    providers: ProviderArgs,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web chat UI.
    Serve {
        /// Address to bind the HTTP server to (host:port).
        #[arg(long, env = "PDF_CHAT_BIND", default_value = "127.0.0.1:8501")]
        bind: String,

        /// Largest accepted upload request, in megabytes.
        #[arg(long, env = "PDF_CHAT_MAX_UPLOAD_MB", default_value_t = 64)]
        max_upload_mb: usize,
    },
    /// Process a folder of PDFs and answer questions read from stdin.
    Chat {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Print the chunks a folder of PDFs would be split into.
    Inspect {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
}

#[derive(Args)]
struct ProviderArgs {
    /// Embedding provider: ngram, openai or huggingface.
    #[arg(long, env = "PDF_CHAT_EMBEDDING_PROVIDER", default_value = "ngram")]
    embedding_provider: EmbeddingBackend,

    /// Embedding model identifier; defaults per provider.
    #[arg(long, env = "PDF_CHAT_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Vector width of the local ngram embedder.
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Max inputs per remote embedding request.
    #[arg(long, env = "PDF_CHAT_EMBEDDING_BATCH", default_value_t = 64)]
    embedding_batch_size: usize,

    /// Generation provider: openai or huggingface.
    #[arg(long, env = "PDF_CHAT_GENERATION_PROVIDER", default_value = "huggingface")]
    generation_provider: GenerationBackend,

    /// Generation model identifier; defaults per provider.
    #[arg(long, env = "PDF_CHAT_GENERATION_MODEL")]
    generation_model: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// Hugging Face inference API token.
    #[arg(long, env = "HUGGINGFACEHUB_API_TOKEN", hide_env_values = true)]
    huggingface_api_token: Option<String>,

    /// Base URL for the Hugging Face inference API.
    #[arg(long, env = "HUGGINGFACE_BASE_URL", default_value = DEFAULT_HUGGINGFACE_BASE_URL)]
    huggingface_base_url: String,

    /// Seconds before a remote request is abandoned; unset waits indefinitely.
    #[arg(long, env = "PDF_CHAT_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,
}

#[derive(Args)]
struct PipelineArgs {
    /// Chunk size in characters.
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,

    /// What to do with a page whose text cannot be extracted: abort or skip.
    #[arg(long, default_value = "abort")]
    page_failure: PageFailurePolicy,

    /// Chunks retrieved per question.
    #[arg(long, default_value_t = 4)]
    top_k: usize,

    /// Similarity metric of the vector index: l2 or cosine.
    #[arg(long, default_value = "l2")]
    similarity: SimilarityMetric,

    /// Sampling temperature for the answer model.
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Maximum tokens requested from the answer model.
    #[arg(long, default_value_t = 512)]
    max_tokens: usize,

    /// Use follow-up questions verbatim instead of rewriting them with the history.
    #[arg(long, default_value_t = false)]
    no_condense: bool,
}

impl ProviderArgs {
    fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            embedding: self.embedding_provider,
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            embedding_batch_size: self.embedding_batch_size,
            generation: self.generation_provider,
            generation_model: self.generation_model.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            huggingface_api_token: self.huggingface_api_token.clone(),
            huggingface_base_url: self.huggingface_base_url.clone(),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn build_pipeline(providers: &ProviderArgs, pipeline: &PipelineArgs) -> anyhow::Result<Pipeline> {
    let settings = providers.settings();
    let embedder = settings
        .build_embedder()
        .context("failed to configure the embedding provider")?;
    let generator = settings
        .build_generator()
        .context("failed to configure the generation provider")?;

    info!(
        embedding_provider = %settings.embedding,
        embedding_model = embedder.model(),
        generation_provider = %settings.generation,
        generation_model = generator.model(),
        "providers configured"
    );

    Ok(Pipeline::new(embedder, generator)
        .with_ingestion_options(IngestionOptions {
            chunk_size: pipeline.chunk_size,
            chunk_overlap: pipeline.chunk_overlap,
            page_failure: pipeline.page_failure,
            ..IngestionOptions::default()
        })
        .with_conversation_options(ConversationOptions {
            top_k: pipeline.top_k.max(1),
            similarity: pipeline.similarity,
            temperature: pipeline.temperature,
            max_tokens: pipeline.max_tokens,
            condense_question: !pipeline.no_condense,
        }))
}

pub(crate) fn log_process_summary(summary: &ProcessSummary) {
    info!(
        documents = summary.documents.len(),
        pages = summary.page_count,
        chunks = summary.chunk_count,
        dimensions = summary.dimensions,
        similarity = %summary.similarity,
        "documents processed"
    );
    for skipped in &summary.skipped_pages {
        warn!(
            document = %skipped.document_title,
            page = skipped.page,
            reason = %skipped.reason,
            "skipped page"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pdf_chat=info,tower_http=info")),
        )
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    let pipeline = Arc::new(build_pipeline(&cli.providers, &cli.pipeline)?);

    match cli.command {
        Command::Serve {
            bind,
            max_upload_mb,
        } => {
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;
            let state = Arc::new(AppState::new(pipeline, max_upload_mb.max(1) * 1024 * 1024));
            let app = handlers::router(state);

            info!("pdf-chat listening on http://{addr}");
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server shutdown")?;
        }
        Command::Chat { folder } => terminal::run_chat(pipeline, &folder).await?,
        Command::Inspect { folder } => terminal::run_inspect(&pipeline, &folder)?,
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
