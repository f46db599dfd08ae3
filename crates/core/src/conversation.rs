use crate::prompt::{answer_request, condense_question_request};
use crate::traits::{check_embedding_batch, EmbeddingProvider, GenerationProvider, VectorIndex};
use crate::{Answer, ConversationOptions, ConversationState, ProviderError, SessionError};
use std::sync::Arc;

/// Retrieval-backed question answering over one built index.
///
/// The engine owns no dialogue state; callers pass the history in and it is
/// extended only when an answer is produced.
pub struct ConversationEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    index: Box<dyn VectorIndex>,
    options: ConversationOptions,
}

impl ConversationEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        index: Box<dyn VectorIndex>,
        options: ConversationOptions,
    ) -> Self {
        Self {
            embedder,
            generator,
            index,
            options,
        }
    }

    pub async fn ask(
        &self,
        question: &str,
        history: &mut ConversationState,
    ) -> Result<Answer, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let standalone_question = self.standalone_question(question, history).await?;

        let mut vectors = self
            .embedder
            .embed(std::slice::from_ref(&standalone_question))
            .await
            .map_err(SessionError::Embedding)?;
        check_embedding_batch(self.embedder.model(), 1, &vectors)
            .map_err(SessionError::Embedding)?;
        let query_vector = vectors.pop().ok_or_else(|| {
            SessionError::Embedding(ProviderError::Request(
                "no embedding returned for the question".to_string(),
            ))
        })?;

        let sources = self.index.search(&query_vector, self.options.top_k)?;

        let request = answer_request(
            &sources,
            history,
            question,
            self.options.temperature,
            self.options.max_tokens,
        );
        let text = self
            .generator
            .generate(&request)
            .await
            .map_err(SessionError::Generation)?;

        history.push_exchange(question, text.clone());

        Ok(Answer {
            text,
            standalone_question,
            sources,
        })
    }

    async fn standalone_question(
        &self,
        question: &str,
        history: &ConversationState,
    ) -> Result<String, SessionError> {
        if !self.options.condense_question || history.is_empty() {
            return Ok(question.to_string());
        }

        let request = condense_question_request(history, question, self.options.max_tokens);
        let rewritten = self
            .generator
            .generate(&request)
            .await
            .map_err(SessionError::Generation)?;
        let rewritten = rewritten.trim();

        Ok(if rewritten.is_empty() {
            question.to_string()
        } else {
            rewritten.to_string()
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use crate::prompt::{GenerationRequest, Role};
    use crate::traits::{EmbeddingProvider, GenerationProvider};
    use crate::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a canned reply and records every request it sees.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        pub(crate) fail: bool,
        pub(crate) requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn seen(&self) -> Vec<GenerationRequest> {
            self.requests.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            if let Ok(mut seen) = self.requests.lock() {
                seen.push(request.clone());
            }
            if self.fail {
                return Err(ProviderError::Request("generator offline".to_string()));
            }
            let last = request
                .messages
                .iter()
                .rev()
                .find(|message| message.role == Role::User)
                .map(|message| message.content.clone())
                .unwrap_or_default();
            Ok(format!("answer to: {last}"))
        }
    }

    pub(crate) struct FailingEmbedder;

    /// Answers every input with two vectors.
    pub(crate) struct DoublingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DoublingEmbedder {
        fn model(&self) -> &str {
            "doubling"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().flat_map(|_| [vec![1.0; 64], vec![0.5; 64]]).collect())
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::Request("embedding service unavailable".to_string()))
        }
    }
}
