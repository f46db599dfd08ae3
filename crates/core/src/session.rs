use crate::chunking::{build_chunks, ChunkingConfig};
use crate::conversation::ConversationEngine;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::index::InMemoryIndex;
use crate::ingest::{extract_batch_text, IngestionReport};
use crate::traits::{check_embedding_batch, EmbeddingProvider, GenerationProvider};
use crate::{
    Answer, ConversationOptions, ConversationState, IngestError, IngestionOptions, PdfDocument,
    ProcessSummary, SessionError, TextChunk,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Shared, read-only wiring for every session: which extractor and providers
/// to call and with what options.
pub struct Pipeline {
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    ingestion: IngestionOptions,
    conversation: ConversationOptions,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            extractor: Arc::new(LopdfExtractor),
            embedder,
            generator,
            ingestion: IngestionOptions::default(),
            conversation: ConversationOptions::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_ingestion_options(mut self, options: IngestionOptions) -> Self {
        self.ingestion = options;
        self
    }

    pub fn with_conversation_options(mut self, options: ConversationOptions) -> Self {
        self.conversation = options;
        self
    }

    pub fn ingestion_options(&self) -> &IngestionOptions {
        &self.ingestion
    }

    /// Extract, then chunk. No remote calls.
    pub fn chunk_documents(
        &self,
        documents: &[PdfDocument],
    ) -> Result<(Vec<TextChunk>, IngestionReport), IngestError> {
        let config = ChunkingConfig::from(&self.ingestion);
        config.validate()?;

        let report = extract_batch_text(documents, self.extractor.as_ref(), &self.ingestion)?;
        let chunks = build_chunks(&report.text, config)?;
        Ok((chunks, report))
    }

    /// Runs the whole Process action: extract, chunk, embed, index.
    pub async fn build_engine(
        &self,
        documents: &[PdfDocument],
    ) -> Result<(ConversationEngine, ProcessSummary), SessionError> {
        let (chunks, report) = self.chunk_documents(documents)?;

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
        let vectors = self.embedder.embed(&texts).await.map_err(SessionError::Embedding)?;
        let dimensions = check_embedding_batch(self.embedder.model(), texts.len(), &vectors)
            .map_err(SessionError::Embedding)?;

        let chunk_count = chunks.len();
        let index = InMemoryIndex::build(chunks, vectors, self.conversation.similarity)?;

        let summary = ProcessSummary {
            page_count: report.page_count(),
            documents: report.documents,
            chunk_count,
            dimensions,
            similarity: index.metric(),
            skipped_pages: report.skipped_pages,
            processed_at: Utc::now(),
        };
        let engine = ConversationEngine::new(
            self.embedder.clone(),
            self.generator.clone(),
            Box::new(index),
            self.conversation.clone(),
        );

        Ok((engine, summary))
    }
}

pub enum SessionState {
    Idle,
    Ready {
        engine: ConversationEngine,
        summary: ProcessSummary,
    },
}

/// One user's chat: the built engine, if any, and the dialogue so far.
pub struct ChatSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    pipeline: Arc<Pipeline>,
    state: SessionState,
    history: ConversationState,
}

impl ChatSession {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            pipeline,
            state: SessionState::Idle,
            history: ConversationState::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready { .. })
    }

    pub fn summary(&self) -> Option<&ProcessSummary> {
        match &self.state {
            SessionState::Ready { summary, .. } => Some(summary),
            SessionState::Idle => None,
        }
    }

    pub fn history(&self) -> &ConversationState {
        &self.history
    }

    /// Builds a fresh engine from `documents`. On success the previous index
    /// and history are replaced; on failure the session is left as it was.
    pub async fn process(
        &mut self,
        documents: &[PdfDocument],
    ) -> Result<&ProcessSummary, SessionError> {
        let (engine, summary) = self.pipeline.build_engine(documents).await?;

        self.history.clear();
        self.state = SessionState::Ready { engine, summary };

        self.summary().ok_or(SessionError::NoIndex)
    }

    pub async fn ask(&mut self, question: &str) -> Result<Answer, SessionError> {
        match &self.state {
            SessionState::Idle => Err(SessionError::NoIndex),
            SessionState::Ready { engine, .. } => engine.ask(question, &mut self.history).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::fakes::{FailingEmbedder, ScriptedGenerator};
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::extractor::test_pdf;
    use crate::{SimilarityMetric, Speaker};

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(
            Pipeline::new(
                Arc::new(CharacterNgramEmbedder::new(32)),
                Arc::new(ScriptedGenerator::default()),
            )
            .with_ingestion_options(IngestionOptions {
                chunk_size: 24,
                chunk_overlap: 4,
                ..IngestionOptions::default()
            }),
        )
    }

    fn manuals() -> Vec<PdfDocument> {
        vec![
            PdfDocument::new(
                "pump.pdf",
                test_pdf::with_pages(&["The pump runs at 1500 rpm.", "Service it every 6 months."]),
            ),
            PdfDocument::new(
                "valve.pdf",
                test_pdf::with_pages(&["The relief valve opens at 10 bar."]),
            ),
        ]
    }

    #[tokio::test]
    async fn asking_before_processing_reports_no_index() {
        let mut session = ChatSession::new(pipeline());

        let result = session.ask("What is the pump speed?").await;

        assert!(matches!(result, Err(SessionError::NoIndex)));
        assert!(!session.is_ready());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn process_then_ask_moves_to_ready() -> Result<(), SessionError> {
        let mut session = ChatSession::new(pipeline());

        let summary = session.process(&manuals()).await?;
        assert_eq!(summary.documents.len(), 2);
        assert_eq!(summary.page_count, 3);
        assert_eq!(summary.dimensions, 32);
        assert_eq!(summary.similarity, SimilarityMetric::L2);
        assert!(summary.chunk_count > 1);

        for _ in 0..3 {
            session.ask("How fast does the pump run?").await?;
        }
        let turns = session.history().turns();
        assert_eq!(turns.len(), 6);
        assert!(turns
            .iter()
            .enumerate()
            .all(|(index, turn)| (index % 2 == 0) == (turn.speaker == Speaker::User)));
        Ok(())
    }

    #[tokio::test]
    async fn reprocessing_is_deterministic_and_resets_history() -> Result<(), SessionError> {
        let mut session = ChatSession::new(pipeline());

        let first = session.process(&manuals()).await?.chunk_count;
        session.ask("When is service due?").await?;
        let second = session.process(&manuals()).await?.chunk_count;

        assert_eq!(first, second);
        assert!(session.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failed_process_keeps_previous_state() -> Result<(), SessionError> {
        let mut session = ChatSession::new(pipeline());
        session.process(&manuals()).await?;
        session.ask("What opens at 10 bar?").await?;

        let broken = vec![PdfDocument::new("scan.pdf", b"garbage".to_vec())];
        let result = session.process(&broken).await;
        assert_eq!(result.err().map(|error| error.kind()), Some("unreadable_document"));

        let result = session.process(&[]).await;
        assert_eq!(result.err().map(|error| error.kind()), Some("empty_document_set"));

        assert!(session.is_ready());
        assert_eq!(session.history().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn embedding_outage_is_reported_on_process() {
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(FailingEmbedder),
            Arc::new(ScriptedGenerator::default()),
        ));
        let mut session = ChatSession::new(pipeline);

        let result = session.process(&manuals()).await;

        assert!(matches!(result, Err(SessionError::Embedding(_))));
        assert!(!session.is_ready());
    }

    #[test]
    fn invalid_chunk_options_fail_before_extraction() {
        let pipeline = Pipeline::new(
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(ScriptedGenerator::default()),
        )
        .with_ingestion_options(IngestionOptions {
            chunk_size: 10,
            chunk_overlap: 10,
            ..IngestionOptions::default()
        });

        assert!(matches!(
            pipeline.chunk_documents(&manuals()),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
