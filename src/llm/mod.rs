//! Language model clients used by the LLM reranker

pub mod ollama;
pub mod openai;

use crate::config::{LlmConfig, LlmProvider as ProviderKind};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single-turn completion; the reply text is returned verbatim
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn provider_name(&self) -> &str;
}

pub use ollama::OllamaChat;
pub use openai::OpenAIChat;

pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    match config.provider {
        ProviderKind::OpenAI => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                Error::Config("Missing LLM_API_KEY (or GROQ_API_KEY / OPENAI_API_KEY)".to_string())
            })?;
            Ok(Arc::new(OpenAIChat::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                timeout,
            )?))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaChat::new(
            config.base_url.clone(),
            config.model.clone(),
            timeout,
        )?)),
    }
}
