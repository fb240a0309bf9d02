use super::{normalize_ticker, ToolHandlers};
use crate::vectordb::MetadataFilter;
use crate::Result;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DeleteFilingArgs {
    pub ticker: String,
}

impl ToolHandlers {
    pub async fn handle_delete_filing(&self, args: DeleteFilingArgs) -> Result<String> {
        let Some(ticker) = normalize_ticker(&args.ticker) else {
            return Ok(serde_json::json!({
                "error": "A ticker is required to delete indexed filings."
            })
            .to_string());
        };

        let removed = self.retriever.delete(&MetadataFilter::ticker(&ticker)).await?;

        if removed == 0 {
            return Ok(serde_json::json!({
                "message": format!("No indexed passages found for {}.", ticker)
            })
            .to_string());
        }

        info!("[CLEAR] Removed {} passages for {}", removed, ticker);

        Ok(serde_json::json!({
            "message": format!("Deleted {} indexed passages for {}.", removed, ticker),
            "deleted": removed
        })
        .to_string())
    }
}
