use super::LlmProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(base_url: Option<String>, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: 16,
            },
        };

        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Ollama error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Ollama API error {status}: {body}")));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Ollama JSON parse error: {e}")))?;

        Ok(generated.response)
    }

    fn provider_name(&self) -> &str {
        "Ollama"
    }
}
