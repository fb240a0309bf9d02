use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Language model used by the LLM reranker
    pub llm: LlmConfig,

    /// Paragraph chunking
    pub chunking: ChunkingConfig,

    /// Search configuration
    pub search: SearchConfig,

    /// Reranking configuration
    pub rerank: RerankConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub batch_size: usize,
    /// Only used by the hashing provider; remote providers report their own.
    pub dimension: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    OpenAI,
    Ollama,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
}

impl LlmProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Ollama => "llama3.2",
        }
    }
}

impl EmbeddingProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            EmbeddingProvider::OpenAI => "text-embedding-3-small",
            EmbeddingProvider::Ollama => "nomic-embed-text",
            EmbeddingProvider::Hashing => "fnv1a-hashing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
    /// Files whose extracted text is shorter than this are rejected
    pub min_document_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_top_k: usize,
    /// Weight of the dense ranking in RRF; the sparse ranking gets `1 - alpha`
    pub alpha: f32,
    pub rrf_k: usize, // RRF parameter for hybrid search
    pub bm25_k1: f32,
    pub bm25_b: f32,
    /// Fused candidates fetched per requested result when a reranker follows
    pub fetch_multiplier: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub enabled: bool,
    pub use_llm: bool,
    pub llm_concurrency: usize,
    pub max_content_chars: usize,
    /// Longest wait for one relevance rating before the neutral score is used
    pub llm_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::OpenAI,
                api_key: None,
                model: EmbeddingProvider::OpenAI.default_model().to_string(),
                base_url: None,
                batch_size: 16,
                dimension: 384,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAI,
                api_key: None,
                model: LlmProvider::OpenAI.default_model().to_string(),
                base_url: None,
                timeout_secs: 30,
            },
            chunking: ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                min_chunk_size: 100,
                min_document_chars: 1000,
            },
            search: SearchConfig {
                default_top_k: 5,
                alpha: 0.5,
                rrf_k: 60,
                bm25_k1: 1.5,
                bm25_b: 0.75,
                fetch_multiplier: 3,
            },
            rerank: RerankConfig {
                enabled: true,
                use_llm: false,
                llm_concurrency: 4,
                max_content_chars: 500,
                llm_timeout_secs: 30,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = match provider.to_lowercase().as_str() {
                "ollama" => EmbeddingProvider::Ollama,
                "hashing" | "offline" => EmbeddingProvider::Hashing,
                _ => EmbeddingProvider::OpenAI,
            };
            config.embedding.model = config.embedding.provider.default_model().to_string();
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.embedding.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(base_url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = Some(base_url);
        }

        if let Some(batch_size) = env_parse("EMBEDDING_BATCH_SIZE")? {
            config.embedding.batch_size = batch_size;
        }

        if let Some(dimension) = env_parse("EMBEDDING_DIMENSION")? {
            config.embedding.dimension = dimension;
        }

        // LLM configuration
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = match provider.to_lowercase().as_str() {
                "ollama" => LlmProvider::Ollama,
                _ => LlmProvider::OpenAI,
            };
            config.llm.model = config.llm.provider.default_model().to_string();
        }

        config.llm.api_key = ["LLM_API_KEY", "GROQ_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|key| std::env::var(key).ok());

        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = Some(base_url);
        }

        if let Some(timeout_secs) = env_parse::<u64>("LLM_TIMEOUT_SECS")? {
            config.llm.timeout_secs = timeout_secs.max(1);
            config.rerank.llm_timeout_secs = timeout_secs.max(1);
        }

        // Chunking
        if let Some(chunk_size) = env_parse("CHUNK_SIZE")? {
            config.chunking.chunk_size = chunk_size;
        }
        if let Some(overlap) = env_parse("CHUNK_OVERLAP")? {
            config.chunking.chunk_overlap = overlap;
        }
        if let Some(min_size) = env_parse("MIN_CHUNK_SIZE")? {
            config.chunking.min_chunk_size = min_size;
        }
        if let Some(min_chars) = env_parse("MIN_DOCUMENT_CHARS")? {
            config.chunking.min_document_chars = min_chars;
        }

        // Search
        if let Some(alpha) = env_parse::<f32>("HYBRID_ALPHA")? {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(Error::Config(format!(
                    "HYBRID_ALPHA must be within [0, 1], got {alpha}"
                )));
            }
            config.search.alpha = alpha;
        }
        if let Some(rrf_k) = env_parse("RRF_K")? {
            config.search.rrf_k = rrf_k;
        }

        // Reranking
        if let Some(enabled) = env_parse("RERANK_ENABLED")? {
            config.rerank.enabled = enabled;
        }
        if let Some(use_llm) = env_parse("RERANK_USE_LLM")? {
            config.rerank.use_llm = use_llm;
        }
        if let Some(concurrency) = env_parse::<usize>("RERANK_LLM_CONCURRENCY")? {
            config.rerank.llm_concurrency = concurrency.max(1);
        }

        Ok(config)
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {key} ('{raw}'): {e}"))),
        Err(_) => Ok(None),
    }
}
