//! Handles the search_filing MCP tool

use super::{normalize_ticker, ToolHandlers};
use crate::types::RankedResult;
use crate::vectordb::MetadataFilter;
use crate::Result;
use serde::Deserialize;
use tracing::info;

const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchFilingArgs {
    pub query: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub form_type: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ToolHandlers {
    /// Handle search_filing tool call - returns JSON string
    pub async fn handle_search_filing(&self, args: SearchFilingArgs) -> Result<String> {
        let SearchFilingArgs {
            query,
            ticker,
            form_type,
            section,
            limit,
        } = args;

        if query.trim().is_empty() {
            return Ok(serde_json::json!({
                "error": "Query must not be empty."
            })
            .to_string());
        }

        let result_limit = limit
            .unwrap_or(self.config.search.default_top_k)
            .clamp(1, MAX_LIMIT);

        let filter = MetadataFilter {
            ticker: ticker.as_deref().and_then(normalize_ticker),
            form_type,
            section,
            source: None,
        };

        info!("[SEARCH] Query: \"{}\" with filter {:?}", query, filter);

        let results = self.retriever.search(&query, &filter, result_limit).await?;

        info!("[SEARCH] Search completed! Found {} results", results.len());

        if results.is_empty() {
            let scope = filter
                .ticker
                .as_deref()
                .map(|t| format!(" in {t} filings"))
                .unwrap_or_default();
            return Ok(serde_json::json!({
                "message": format!(
                    "No results found for query: \"{}\"{}. Index a filing first with the index_filing tool.",
                    query, scope
                )
            })
            .to_string());
        }

        let mut message = format!("Found {} results for query: \"{}\"", results.len(), query);
        message.push_str("\n\n");
        message.push_str(&format_results(&results));

        Ok(serde_json::json!({
            "message": message,
            "results_count": results.len(),
            "results": results
        })
        .to_string())
    }
}

fn format_results(results: &[RankedResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let meta = &result.metadata;
            let filing = format!(
                "{} {}{}",
                meta.ticker.as_deref().unwrap_or("unknown"),
                meta.form_type.as_deref().unwrap_or("filing"),
                meta.filing_date
                    .as_deref()
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default()
            );

            format!(
                "{}. {} [{}]\n   Score: {:.4} (retrieval {:.4}, rerank {:.3})\n   Passage:\n{}\n",
                index + 1,
                filing,
                meta.section.as_deref().unwrap_or("no section"),
                result.final_score,
                result.original_score,
                result.rerank_score,
                truncate_content(&result.content, 2000)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...\n[Passage truncated]")
    }
}
