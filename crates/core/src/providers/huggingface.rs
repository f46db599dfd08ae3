use crate::prompt::GenerationRequest;
use crate::traits::{check_embedding_batch, EmbeddingProvider, GenerationProvider};
use crate::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "huggingface";

pub struct HuggingFaceClient {
    base_url: String,
    api_token: String,
    model: String,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(
        base_url: &str,
        api_token: &str,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        if api_token.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(
                "HUGGINGFACEHUB_API_TOKEN must be set for the huggingface provider".to_string(),
            ));
        }
        Url::parse(base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.trim().to_string(),
            model: model.into(),
            client: builder.build()?,
        })
    }

    async fn post(&self, path: String, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_token)
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

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let parsed = self
            .post(
                format!("pipeline/feature-extraction/{}", self.model),
                &json!({
                    "inputs": texts,
                    "options": { "wait_for_model": true },
                }),
            )
            .await?;

        let vectors = pooled_embeddings(&parsed)?;
        check_embedding_batch(BACKEND, texts.len(), &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl GenerationProvider for HuggingFaceClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let parsed = self
            .post(format!("models/{}", self.model), &text_generation_body(request))
            .await?;
        generated_text(&parsed)
    }
}

fn text_generation_body(request: &GenerationRequest) -> Value {
    let mut parameters = json!({
        "max_new_tokens": request.max_tokens,
        "return_full_text": false,
    });
    // The inference API rejects temperature 0; greedy decoding is the equivalent.
    if request.temperature > 0.0 {
        parameters["temperature"] = json!(request.temperature);
        parameters["do_sample"] = json!(true);
    } else {
        parameters["do_sample"] = json!(false);
    }

    json!({
        "inputs": request.render_plain(),
        "parameters": parameters,
        "options": { "wait_for_model": true },
    })
}

fn backend_error(details: impl Into<String>) -> ProviderError {
    ProviderError::BackendResponse {
        backend: BACKEND.to_string(),
        details: details.into(),
    }
}

fn reported_error(payload: &Value) -> Option<ProviderError> {
    payload
        .pointer("/error")
        .and_then(Value::as_str)
        .map(|message| backend_error(message.to_string()))
}

/// Accepts one vector per input, or token-level matrices which are
/// mean-pooled down to a single vector.
fn pooled_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    if let Some(error) = reported_error(payload) {
        return Err(error);
    }

    let rows = payload
        .as_array()
        .ok_or_else(|| backend_error("feature-extraction reply is not an array"))?;

    rows.iter()
        .map(|row| {
            let items = row
                .as_array()
                .ok_or_else(|| backend_error("embedding row is not an array"))?;

            if items.iter().all(Value::is_number) {
                return Ok(as_vector(items));
            }

            let tokens = items
                .iter()
                .map(|token| {
                    token
                        .as_array()
                        .map(|values| as_vector(values))
                        .ok_or_else(|| backend_error("token embedding is not an array"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            mean_pool(&tokens)
        })
        .collect()
}

fn as_vector(values: &[Value]) -> Vec<f32> {
    values
        .iter()
        .filter_map(Value::as_f64)
        .map(|value| value as f32)
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>, ProviderError> {
    let width = tokens
        .first()
        .map(Vec::len)
        .ok_or_else(|| backend_error("token matrix is empty"))?;

    let mut pooled = vec![0f32; width];
    for token in tokens {
        if token.len() != width {
            return Err(backend_error("token embeddings have mixed widths"));
        }
        for (slot, value) in pooled.iter_mut().zip(token) {
            *slot += value;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|slot| *slot /= count);
    Ok(pooled)
}

fn generated_text(payload: &Value) -> Result<String, ProviderError> {
    if let Some(error) = reported_error(payload) {
        return Err(error);
    }

    payload
        .pointer("/0/generated_text")
        .or_else(|| payload.pointer("/generated_text"))
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| backend_error("reply has no generated_text"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{PromptMessage, Role};

    #[test]
    fn sentence_vectors_pass_through() -> Result<(), ProviderError> {
        let payload = json!([[0.5, 1.0], [2.0, 3.0]]);
        assert_eq!(pooled_embeddings(&payload)?, vec![vec![0.5, 1.0], vec![2.0, 3.0]]);
        Ok(())
    }

    #[test]
    fn token_matrices_are_mean_pooled() -> Result<(), ProviderError> {
        let payload = json!([[[1.0, 2.0], [3.0, 4.0]]]);
        assert_eq!(pooled_embeddings(&payload)?, vec![vec![2.0, 3.0]]);
        Ok(())
    }

    #[test]
    fn reported_errors_surface() {
        let payload = json!({ "error": "Model is currently loading" });
        match pooled_embeddings(&payload) {
            Err(ProviderError::BackendResponse { details, .. }) => {
                assert_eq!(details, "Model is currently loading")
            }
            other => panic!("expected backend error, got {other:?}"),
        }
        assert!(generated_text(&payload).is_err());
    }

    #[test]
    fn generated_text_accepts_list_and_object_replies() -> Result<(), ProviderError> {
        assert_eq!(generated_text(&json!([{ "generated_text": " yes " }]))?, "yes");
        assert_eq!(generated_text(&json!({ "generated_text": "no" }))?, "no");
        Ok(())
    }

    #[test]
    fn zero_temperature_means_greedy() {
        let request = GenerationRequest {
            messages: vec![PromptMessage::new(Role::User, "hi")],
            temperature: 0.0,
            max_tokens: 512,
        };
        let body = text_generation_body(&request);

        assert_eq!(body["parameters"]["do_sample"], json!(false));
        assert!(body["parameters"].get("temperature").is_none());
        assert_eq!(body["parameters"]["max_new_tokens"], json!(512));
        assert_eq!(body["inputs"], json!("Human: hi\nAssistant:"));
    }
}
