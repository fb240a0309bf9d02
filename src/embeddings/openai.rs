//! OpenAI-compatible embedding provider (OpenAI, Azure-style gateways)

use super::{preprocess_text, EmbeddingProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct OpenAIEmbedding {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimension: usize,
    max_tokens: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedding {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>, batch_size: usize) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| "text-embedding-3-small".to_string()),
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            dimension: 0,
            max_tokens: 8192,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn detect_dimension(&mut self) -> Result<usize> {
        let probe = self.request(&["test".to_string()]).await?;

        match probe.first() {
            Some(first) => {
                self.dimension = first.len();
                tracing::info!(
                    "[EMBEDDING] OpenAI model '{}' has dimension {}",
                    self.model,
                    self.dimension
                );
                Ok(self.dimension)
            }
            None => Err(Error::Embedding("Failed to detect dimension".to_string())),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let input: Vec<String> = texts
            .iter()
            .map(|t| preprocess_text(t, self.max_tokens))
            .collect();

        let request = EmbeddingRequest {
            model: &self.model,
            input: &input,
            encoding_format: "float",
        };

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Embedding(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await?;
        embedding_response.data.sort_by_key(|d| d.index);

        if embedding_response.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                embedding_response.data.len(),
                texts.len()
            )));
        }

        Ok(embedding_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let result = self.request(&[text.to_string()]).await?;
        result
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!("[EMBEDDING] OpenAI batch {} ({} texts)", i + 1, batch.len());
            embeddings.extend(self.request(batch).await?);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let provider = OpenAIEmbedding::new(
            "unused".to_string(),
            None,
            Some("http://127.0.0.1:9".to_string()),
            16,
        );

        let result = provider.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_openai_embed() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let provider = OpenAIEmbedding::new(api_key, None, None, 16);

        let embedding = provider.embed("Supply chain concentration in Asia").await.unwrap();
        assert_eq!(embedding.len(), 1536);
    }
}
