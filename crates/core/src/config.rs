use crate::embeddings::{CharacterNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
use crate::providers::{HuggingFaceClient, OpenAiClient};
use crate::traits::{EmbeddingProvider, GenerationProvider};
use crate::ProviderError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackend {
    #[default]
    Ngram,
    OpenAi,
    HuggingFace,
}

impl EmbeddingBackend {
    pub fn default_model(self) -> &'static str {
        match self {
            EmbeddingBackend::Ngram => "char-trigram",
            EmbeddingBackend::OpenAi => "text-embedding-3-small",
            EmbeddingBackend::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ngram" | "local" => Ok(Self::Ngram),
            "openai" => Ok(Self::OpenAi),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(format!(
                "unsupported embedding provider '{other}'; use ngram, openai or huggingface"
            )),
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingBackend::Ngram => f.write_str("ngram"),
            EmbeddingBackend::OpenAi => f.write_str("openai"),
            EmbeddingBackend::HuggingFace => f.write_str("huggingface"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationBackend {
    OpenAi,
    #[default]
    HuggingFace,
}

impl GenerationBackend {
    pub fn default_model(self) -> &'static str {
        match self {
            GenerationBackend::OpenAi => "gpt-4o-mini",
            GenerationBackend::HuggingFace => "google/flan-t5-xxl",
        }
    }
}

impl FromStr for GenerationBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(format!(
                "unsupported generation provider '{other}'; use openai or huggingface"
            )),
        }
    }
}

impl fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationBackend::OpenAi => f.write_str("openai"),
            GenerationBackend::HuggingFace => f.write_str("huggingface"),
        }
    }
}

/// Everything needed to construct the embedding and generation providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub embedding: EmbeddingBackend,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: usize,
    pub embedding_batch_size: usize,
    pub generation: GenerationBackend,
    pub generation_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub huggingface_api_token: Option<String>,
    pub huggingface_base_url: String,
    pub request_timeout: Option<Duration>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            embedding: EmbeddingBackend::default(),
            embedding_model: None,
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            embedding_batch_size: 64,
            generation: GenerationBackend::default(),
            generation_model: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            huggingface_api_token: None,
            huggingface_base_url: DEFAULT_HUGGINGFACE_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl ProviderSettings {
    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or_else(|| self.embedding.default_model())
    }

    pub fn generation_model(&self) -> &str {
        self.generation_model
            .as_deref()
            .unwrap_or_else(|| self.generation.default_model())
    }

    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let embedder: Arc<dyn EmbeddingProvider> = match self.embedding {
            EmbeddingBackend::Ngram => {
                Arc::new(CharacterNgramEmbedder::new(self.embedding_dimensions))
            }
            EmbeddingBackend::OpenAi => Arc::new(OpenAiClient::new(
                &self.openai_base_url,
                self.openai_api_key.as_deref().unwrap_or_default(),
                self.embedding_model(),
                self.embedding_batch_size,
                self.request_timeout,
            )?),
            EmbeddingBackend::HuggingFace => Arc::new(HuggingFaceClient::new(
                &self.huggingface_base_url,
                self.huggingface_api_token.as_deref().unwrap_or_default(),
                self.embedding_model(),
                self.request_timeout,
            )?),
        };
        Ok(embedder)
    }

    pub fn build_generator(&self) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
        let generator: Arc<dyn GenerationProvider> = match self.generation {
            GenerationBackend::OpenAi => Arc::new(OpenAiClient::new(
                &self.openai_base_url,
                self.openai_api_key.as_deref().unwrap_or_default(),
                self.generation_model(),
                self.embedding_batch_size,
                self.request_timeout,
            )?),
            GenerationBackend::HuggingFace => Arc::new(HuggingFaceClient::new(
                &self.huggingface_base_url,
                self.huggingface_api_token.as_deref().unwrap_or_default(),
                self.generation_model(),
                self.request_timeout,
            )?),
        };
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_parse_from_config_strings() {
        assert_eq!("OpenAI".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::OpenAi));
        assert_eq!("hf".parse::<GenerationBackend>(), Ok(GenerationBackend::HuggingFace));
        assert!("ngram".parse::<GenerationBackend>().is_err());
    }

    #[test]
    fn default_embedder_needs_no_credentials() -> Result<(), ProviderError> {
        let settings = ProviderSettings {
            embedding_dimensions: 24,
            ..ProviderSettings::default()
        };
        let embedder = settings.build_embedder()?;
        assert_eq!(embedder.model(), "char-trigram-24");
        Ok(())
    }

    #[test]
    fn remote_providers_require_credentials() {
        let settings = ProviderSettings {
            embedding: EmbeddingBackend::OpenAi,
            ..ProviderSettings::default()
        };
        assert!(matches!(
            settings.build_embedder(),
            Err(ProviderError::MissingCredentials(_))
        ));
        assert!(matches!(
            settings.build_generator(),
            Err(ProviderError::MissingCredentials(_))
        ));
    }

    #[test]
    fn explicit_models_override_defaults() {
        let settings = ProviderSettings {
            generation: GenerationBackend::OpenAi,
            generation_model: Some("gpt-4.1".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(settings.generation_model(), "gpt-4.1");
        assert_eq!(settings.embedding_model(), "char-trigram");
    }
}
