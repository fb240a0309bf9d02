pub mod hashing;
pub mod ollama;
pub mod openai;

use crate::config::{EmbeddingConfig, EmbeddingProvider as ProviderKind};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed for one corpus; 0 until a remote provider has been probed
    fn dimension(&self) -> usize;

    fn provider_name(&self) -> &str;
}

pub use hashing::HashingEmbedding;
pub use ollama::OllamaEmbedding;
pub use openai::OpenAIEmbedding;

/// Build and probe the configured provider
pub async fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::OpenAI => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| Error::Config("Missing OPENAI_API_KEY".to_string()))?;
            let mut openai = OpenAIEmbedding::new(
                api_key,
                Some(config.model.clone()),
                config.base_url.clone(),
                config.batch_size,
            );
            openai.detect_dimension().await?;
            Ok(Arc::new(openai))
        }
        ProviderKind::Ollama => {
            let mut ollama = OllamaEmbedding::new(
                config.base_url.clone(),
                Some(config.model.clone()),
                config.batch_size,
            );
            ollama.initialize().await?;
            Ok(Arc::new(ollama))
        }
        ProviderKind::Hashing => Ok(Arc::new(HashingEmbedding::new(config.dimension))),
    }
}

/// Truncate to roughly `max_tokens` (4 chars per token); empty text becomes a space
pub(crate) fn preprocess_text(text: &str, max_tokens: usize) -> String {
    if text.is_empty() {
        return " ".to_string();
    }

    let max_chars = max_tokens * 4;
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect()
    } else {
        text.to_string()
    }
}
