//! Handles the index_filing MCP tool

use super::{ensure_absolute_path, normalize_ticker, validate_filing_path, ToolHandlers};
use crate::types::ChunkMetadata;
use crate::{Error, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct IndexFilingArgs {
    pub path: String,
    pub ticker: String,
    #[serde(default = "default_form_type")]
    pub form_type: String,
    #[serde(default)]
    pub filing_date: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

fn default_form_type() -> String {
    "10-K".to_string()
}

impl ToolHandlers {
    /// Handle index_filing tool call - returns JSON string
    pub async fn handle_index_filing(&self, args: IndexFilingArgs) -> Result<String> {
        let IndexFilingArgs {
            path: filing_path,
            ticker,
            form_type,
            filing_date,
            company_name,
        } = args;

        let Some(ticker) = normalize_ticker(&ticker) else {
            return Ok(serde_json::json!({
                "error": "A ticker is required to index a filing."
            })
            .to_string());
        };

        let absolute_path = ensure_absolute_path(&filing_path)?;

        if let Err(e) = validate_filing_path(&absolute_path) {
            return Ok(serde_json::json!({
                "error": format!("{}. Original input: '{}'", e, filing_path)
            })
            .to_string());
        }

        let mut metadata = ChunkMetadata::for_filing(&ticker, &form_type);
        metadata.filing_date = filing_date;
        metadata.company_name = company_name;

        info!(
            "[INDEX] Indexing {} {} from {}",
            ticker,
            form_type,
            absolute_path.display()
        );

        let report = match self.retriever.index_file(&absolute_path, &metadata).await {
            Ok(report) => report,
            Err(Error::InvalidInput(reason)) => {
                return Ok(serde_json::json!({
                    "error": format!("{}. Existing passages for {} were left unchanged.", reason, ticker)
                })
                .to_string());
            }
            Err(e) => return Err(e),
        };

        if report.chunks_indexed == 0 {
            return Ok(serde_json::json!({
                "message": format!(
                    "No indexable content found in '{}'. Existing passages for {} were left unchanged.",
                    absolute_path.display(),
                    ticker
                ),
                "chunks_indexed": 0
            })
            .to_string());
        }

        let mut message = format!(
            "Indexed {} passages ({} characters) of the {} {} filing in {:.2}s.",
            report.chunks_indexed, report.total_chars, ticker, form_type, report.elapsed_secs
        );
        if report.chunks_replaced > 0 {
            message.push_str(&format!(
                "\nReplaced {} previously indexed passages.",
                report.chunks_replaced
            ));
        }

        Ok(serde_json::json!({
            "message": message,
            "chunks_indexed": report.chunks_indexed,
            "chunks_replaced": report.chunks_replaced,
            "chunk_size": self.config.chunking.chunk_size,
            "chunk_overlap": self.config.chunking.chunk_overlap
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{filing_text, handlers};

    fn args(path: &str, ticker: &str) -> IndexFilingArgs {
        IndexFilingArgs {
            path: path.to_string(),
            ticker: ticker.to_string(),
            form_type: default_form_type(),
            filing_date: Some("2024-02-21".to_string()),
            company_name: None,
        }
    }

    #[tokio::test]
    async fn test_index_filing_reports_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvda.txt");
        std::fs::write(&path, filing_text()).unwrap();

        let handlers = handlers();
        let response = handlers
            .handle_index_filing(args(&path.to_string_lossy(), "nvda"))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();

        assert!(json["chunks_indexed"].as_u64().unwrap() > 1);
        assert_eq!(json["chunks_replaced"], 0);
        assert!(json["message"].as_str().unwrap().contains("NVDA 10-K"));
    }

    #[tokio::test]
    async fn test_index_filing_rejects_bad_input() {
        let handlers = handlers();

        let response = handlers
            .handle_index_filing(args("/definitely/not/here.txt", "NVDA"))
            .await
            .unwrap();
        assert!(response.contains("error"));

        let response = handlers.handle_index_filing(args("/tmp", " ")).await.unwrap();
        assert!(response.contains("ticker is required"));
    }

    #[tokio::test]
    async fn test_index_html_filing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvda-20240128.htm");
        let html: String = filing_text()
            .split("\n\n")
            .map(|para| format!("<div><font size=\"2\">{para}</font></div>"))
            .collect();
        std::fs::write(&path, format!("<html><body>{html}</body></html>")).unwrap();

        let response = handlers()
            .handle_index_filing(args(&path.to_string_lossy(), "NVDA"))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();

        assert!(json["chunks_indexed"].as_u64().unwrap() > 1);
    }

    #[tokio::test]
    async fn test_index_filing_rejects_short_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvda-20240128.htm");
        std::fs::write(&path, "<html><body><p>Document moved.</p></body></html>").unwrap();

        let handlers = handlers();
        let response = handlers
            .handle_index_filing(args(&path.to_string_lossy(), "NVDA"))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();

        assert!(json["error"].as_str().unwrap().contains("minimum 1000"));
        assert_eq!(handlers.retriever.count().await.unwrap(), 0);
    }
}
