use super::{preprocess_text, EmbeddingProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedding {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    max_tokens: usize,
    batch_size: usize,
}

impl OllamaEmbedding {
    pub fn new(base_url: Option<String>, model: Option<String>, batch_size: usize) -> Self {
        let model_name = model.unwrap_or_else(|| "nomic-embed-text".to_string());
        let base_url = base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string());
        let max_tokens = Self::default_max_tokens_for_model(&model_name);

        Self {
            client: reqwest::Client::new(),
            base_url,
            model: model_name,
            dimension: 768,
            max_tokens,
            batch_size: batch_size.max(1),
        }
    }

    fn default_max_tokens_for_model(model: &str) -> usize {
        if model.contains("nomic-embed-text") || model.contains("snowflake-arctic-embed") {
            8192
        } else {
            2048
        }
    }

    pub async fn initialize(&mut self) -> Result<()> {
        let probe = self.embed("test").await?;
        self.dimension = probe.len();
        tracing::info!(
            "[EMBEDDING] Ollama model '{}' has dimension {}",
            self.model,
            self.dimension
        );
        Ok(())
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input,
        };

        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Ollama error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("Ollama API error {status}: {body}")));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Ollama JSON parse error: {e}")))?;

        Ok(embed_response.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = serde_json::Value::String(preprocess_text(text, self.max_tokens));

        self.request(input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let input = serde_json::Value::Array(
                batch
                    .iter()
                    .map(|t| serde_json::Value::String(preprocess_text(t, self.max_tokens)))
                    .collect(),
            );
            embeddings.extend(self.request(input).await?);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "Ollama"
    }
}
