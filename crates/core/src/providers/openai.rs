use crate::prompt::{GenerationRequest, PromptMessage};
use crate::traits::{check_embedding_batch, EmbeddingProvider, GenerationProvider};
use crate::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "openai";

/// Client for OpenAI-compatible `/embeddings` and `/chat/completions` endpoints.
/// One instance serves one model.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
    client: Client,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: impl Into<String>,
        batch_size: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(
                "OPENAI_API_KEY must be set for the openai provider".to_string(),
            ));
        }
        Url::parse(base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.into(),
            batch_size: batch_size.max(1),
            client: builder.build()?,
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{status}: {text}"),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = EmbeddingRequest {
                model: &self.model,
                input: batch,
            };
            let parsed: EmbeddingResponse = self.post("embeddings", &request).await?.json().await?;
            let batch_vectors = ordered_embeddings(parsed);
            check_embedding_batch(BACKEND, batch.len(), &batch_vectors)?;
            vectors.extend(batch_vectors);
        }

        check_embedding_batch(BACKEND, texts.len(), &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: &request.messages,
        };
        let parsed: ChatResponse = self.post("chat/completions", &body).await?.json().await?;
        first_choice(parsed)
    }
}

fn ordered_embeddings(mut parsed: EmbeddingResponse) -> Vec<Vec<f32>> {
    parsed.data.sort_by_key(|entry| entry.index);
    parsed.data.into_iter().map(|entry| entry.embedding).collect()
}

fn first_choice(parsed: ChatResponse) -> Result<String, ProviderError> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: BACKEND.to_string(),
            details: "response contained no choices".to_string(),
        })
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
