//! Handles the index_stats MCP tool

use super::ToolHandlers;
use crate::Result;

impl ToolHandlers {
    pub async fn handle_index_stats(&self) -> Result<String> {
        let total = self.retriever.count().await?;
        let embedding = self.retriever.embedding();
        let reranker = self
            .retriever
            .reranker()
            .map(|r| r.name())
            .unwrap_or("disabled");

        let message = if total == 0 {
            "No filings are indexed yet.".to_string()
        } else {
            format!("{} passages are indexed and ready for search.", total)
        };

        Ok(serde_json::json!({
            "message": message,
            "total_passages": total,
            "embedding_provider": embedding.provider_name(),
            "embedding_dimension": embedding.dimension(),
            "reranker": reranker,
            "hybrid_alpha": self.config.search.alpha,
            "rrf_k": self.config.search.rrf_k
        })
        .to_string())
    }
}
