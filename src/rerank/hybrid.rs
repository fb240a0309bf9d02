use super::{KeywordReranker, LlmReranker, RerankCandidate};
use crate::types::RankedResult;

/// Keyword pass over `2 * top_k` candidates, then an optional LLM pass over
/// the keyword top `top_k`
pub struct HybridReranker {
    keyword: KeywordReranker,
    llm: Option<LlmReranker>,
}

impl HybridReranker {
    pub fn new(keyword: KeywordReranker, llm: Option<LlmReranker>) -> Self {
        Self { keyword, llm }
    }

    pub fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        top_k: usize,
    ) -> Vec<RankedResult> {
        let mut keyword_ranked = self.keyword.rerank(query, candidates, top_k.saturating_mul(2));

        let Some(llm) = &self.llm else {
            keyword_ranked.truncate(top_k);
            return keyword_ranked;
        };

        let second_pass: Vec<RerankCandidate> = keyword_ranked
            .into_iter()
            .take(top_k)
            .map(RerankCandidate::from)
            .collect();

        llm.rerank(query, second_pass, top_k).await
    }
}
