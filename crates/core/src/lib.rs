pub mod chunking;
pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod traits;

pub use chunking::{build_chunks, merge_chunks, normalize_whitespace, split_text, ChunkingConfig};
pub use config::{EmbeddingBackend, GenerationBackend, ProviderSettings};
pub use conversation::ConversationEngine;
pub use embeddings::{CharacterNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IndexError, IngestError, ProviderError, SessionError};
pub use extractor::{extract_page_texts, ExtractedPages, LopdfExtractor, PageText, PdfExtractor};
pub use index::InMemoryIndex;
pub use ingest::{discover_pdf_files, extract_batch_text, load_pdf_folder, IngestionReport};
pub use models::{
    Answer, ChatTurn, ConversationOptions, ConversationState, DocumentFingerprint,
    IngestionOptions, PageFailurePolicy, PdfDocument, ProcessSummary, RetrievedChunk,
    SimilarityMetric, SkippedPage, Speaker, TextChunk,
};
pub use prompt::{GenerationRequest, PromptMessage, Role};
pub use providers::{HuggingFaceClient, OpenAiClient};
pub use session::{ChatSession, Pipeline, SessionState};
pub use traits::{EmbeddingProvider, GenerationProvider, VectorIndex};
