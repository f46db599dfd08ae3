use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable document {name}: {reason}")]
    UnreadableDocument { name: String, reason: String },

    #[error("no documents to process; upload at least one pdf")]
    EmptyDocumentSet,

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("cannot build an index from zero chunks")]
    Empty,

    #[error("embedding count {vectors} doesn't match chunk count {chunks}")]
    CountMismatch { chunks: usize, vectors: usize },

    #[error("vector dimension {found} != {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no documents have been processed yet; upload pdfs and press Process first")]
    NoIndex,

    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("embedding service failed: {0}")]
    Embedding(#[source] ProviderError),

    #[error("generation service failed: {0}")]
    Generation(#[source] ProviderError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}

impl SessionError {
    /// Stable machine-readable tag, used by front-ends to pick a message style.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NoIndex => "no_index",
            SessionError::EmptyQuestion => "empty_question",
            SessionError::Ingest(IngestError::UnreadableDocument { .. }) => "unreadable_document",
            SessionError::Ingest(IngestError::EmptyDocumentSet) => "empty_document_set",
            SessionError::Ingest(IngestError::InvalidChunkConfig(_)) => "invalid_chunk_config",
            SessionError::Ingest(_) => "ingest",
            SessionError::Embedding(_) => "embedding_service",
            SessionError::Generation(_) => "generation_service",
            SessionError::Index(_) => "index",
        }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
