//! Second-pass rerankers over fused search candidates

pub mod hybrid;
pub mod keyword;
pub mod llm;

pub use hybrid::HybridReranker;
pub use keyword::KeywordReranker;
pub use llm::{LlmJudgement, LlmReranker};

use crate::config::RerankConfig;
use crate::llm::LlmProvider;
use crate::types::{ChunkMetadata, RankedResult, SearchResult};
use std::sync::Arc;
use std::time::Duration;

/// Passage handed to a reranker together with its first-stage score
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub content: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

impl From<SearchResult> for RerankCandidate {
    fn from(result: SearchResult) -> Self {
        Self {
            content: result.content,
            score: result.combined_score,
            metadata: result.metadata,
        }
    }
}

impl From<RankedResult> for RerankCandidate {
    fn from(result: RankedResult) -> Self {
        Self {
            content: result.content,
            score: result.final_score,
            metadata: result.metadata,
        }
    }
}

pub enum Reranker {
    Keyword(KeywordReranker),
    Llm(LlmReranker),
    Hybrid(HybridReranker),
}

impl Reranker {
    /// Keyword reranking, with an LLM second pass when `use_llm` is set and a
    /// provider is available
    pub fn from_config(config: &RerankConfig, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let llm = match (config.use_llm, llm) {
            (true, Some(provider)) => Some(LlmReranker::new(
                provider,
                config.llm_concurrency,
                config.max_content_chars,
            )
            .with_timeout(Duration::from_secs(config.llm_timeout_secs.max(1)))),
            (true, None) => {
                tracing::warn!("[RERANK] LLM reranking requested but no provider configured; using keywords only");
                None
            }
            _ => None,
        };

        Reranker::Hybrid(HybridReranker::new(KeywordReranker::new(), llm))
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        top_k: usize,
    ) -> Vec<RankedResult> {
        match self {
            Reranker::Keyword(reranker) => reranker.rerank(query, candidates, top_k),
            Reranker::Llm(reranker) => reranker.rerank(query, candidates, top_k).await,
            Reranker::Hybrid(reranker) => reranker.rerank(query, candidates, top_k).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reranker::Keyword(_) => "keyword",
            Reranker::Llm(_) => "llm",
            Reranker::Hybrid(reranker) if reranker.uses_llm() => "hybrid+llm",
            Reranker::Hybrid(_) => "hybrid",
        }
    }
}

/// Descending by final score; equal scores keep their incoming order
pub(crate) fn sort_and_truncate(ranked: &mut Vec<RankedResult>, top_k: usize) {
    ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    ranked.truncate(top_k);
}
