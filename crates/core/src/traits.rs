use crate::prompt::GenerationRequest;
use crate::{IndexError, ProviderError, RetrievedChunk};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, for logs and summaries.
    fn model(&self) -> &str;

    /// Returns one vector per input, in input order, all of the same dimension.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimensions(&self) -> usize;

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, IndexError>;
}

/// Checks a provider reply against the embedding contract and returns the
/// shared dimension.
pub fn check_embedding_batch(
    backend: &str,
    inputs: usize,
    vectors: &[Vec<f32>],
) -> Result<usize, ProviderError> {
    if vectors.len() != inputs {
        return Err(ProviderError::BackendResponse {
            backend: backend.to_string(),
            details: format!("returned {} embeddings for {} inputs", vectors.len(), inputs),
        });
    }

    let dimensions = vectors.first().map(Vec::len).unwrap_or_default();
    if inputs > 0 && dimensions == 0 {
        return Err(ProviderError::BackendResponse {
            backend: backend.to_string(),
            details: "returned zero-length embeddings".to_string(),
        });
    }

    if let Some(odd) = vectors.iter().find(|vector| vector.len() != dimensions) {
        return Err(ProviderError::BackendResponse {
            backend: backend.to_string(),
            details: format!("mixed embedding dimensions {} and {}", dimensions, odd.len()),
        });
    }

    Ok(dimensions)
}
