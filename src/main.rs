use rmcp::{
    handler::server::router::tool::ToolRouter,
    model::*,
    tool, tool_handler,
    transport::stdio,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct IndexFilingParams {
    #[schemars(description = "Path to the filing (plain text or EDGAR .htm/.html) to index")]
    path: String,
    #[schemars(description = "Ticker symbol of the filing company, e.g. NVDA")]
    ticker: String,
    #[schemars(description = "Form type, defaults to 10-K")]
    #[serde(default)]
    form_type: Option<String>,
    #[schemars(description = "Filing date (YYYY-MM-DD)")]
    #[serde(default)]
    filing_date: Option<String>,
    #[schemars(description = "Company name")]
    #[serde(default)]
    company_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct SearchFilingParams {
    #[schemars(description = "Natural language question about the filing")]
    query: String,
    #[schemars(description = "Restrict results to this ticker")]
    #[serde(default)]
    ticker: Option<String>,
    #[schemars(description = "Restrict results to this form type")]
    #[serde(default)]
    form_type: Option<String>,
    #[schemars(description = "Restrict results to this section, e.g. 'ITEM 1A. RISK FACTORS'")]
    #[serde(default)]
    section: Option<String>,
    #[schemars(description = "Maximum number of results to return (at most 50)")]
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct DeleteFilingParams {
    #[schemars(description = "Ticker whose indexed passages should be removed")]
    ticker: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Filing Sage MCP Server");

    let config = filing_sage::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let retriever = filing_sage::FilingRetriever::from_config(&config).await?;
    tracing::info!(
        "Retriever initialized with {} embeddings, reranker: {}",
        retriever.embedding().provider_name(),
        retriever.reranker().map(|r| r.name()).unwrap_or("disabled")
    );

    let handlers = filing_sage::handlers::ToolHandlers::new(config.clone(), Arc::new(retriever));
    tracing::info!("Tool handlers initialized");

    let server = FilingSageServer::new(Arc::new(handlers));

    tracing::info!("Server initialized, starting stdio transport");

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}

struct FilingSageServer {
    handlers: Arc<filing_sage::handlers::ToolHandlers>,
    tool_router: ToolRouter<Self>,
}

impl FilingSageServer {
    fn new(handlers: Arc<filing_sage::handlers::ToolHandlers>) -> Self {
        Self {
            handlers,
            tool_router: Self::tool_router(),
        }
    }
}

fn tool_response(result: filing_sage::Result<String>, failure: &str) -> CallToolResult {
    let text = match result {
        Ok(json_response) => json_response,
        Err(e) => serde_json::json!({"error": format!("{}: {}", failure, e)}).to_string(),
    };
    CallToolResult::success(vec![Content::text(text)])
}

#[rmcp::tool_router]
impl FilingSageServer {
    #[tool(
        name = "index_filing",
        description = "Index an SEC filing (plain text or HTML) for search. HTML is reduced to its visible text and the filing is split into section-aware passages; re-indexing a ticker replaces its previous passages."
    )]
    async fn index_filing(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<IndexFilingParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let args = filing_sage::handlers::IndexFilingArgs {
            path: params.path,
            ticker: params.ticker,
            form_type: params.form_type.unwrap_or_else(|| "10-K".to_string()),
            filing_date: params.filing_date,
            company_name: params.company_name,
        };

        Ok(tool_response(
            self.handlers.handle_index_filing(args).await,
            "Indexing failed",
        ))
    }

    #[tool(
        name = "search_filing",
        description = "Search indexed filings with a natural language question. Combines keyword (BM25) and semantic search, then reranks passages for financial relevance."
    )]
    async fn search_filing(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<SearchFilingParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let args = filing_sage::handlers::SearchFilingArgs {
            query: params.query,
            ticker: params.ticker,
            form_type: params.form_type,
            section: params.section,
            limit: params.limit,
        };

        Ok(tool_response(
            self.handlers.handle_search_filing(args).await,
            "Search failed",
        ))
    }

    #[tool(
        name = "delete_filing",
        description = "Remove every indexed passage of a ticker."
    )]
    async fn delete_filing(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<DeleteFilingParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = filing_sage::handlers::DeleteFilingArgs {
            ticker: params.0.ticker,
        };

        Ok(tool_response(
            self.handlers.handle_delete_filing(args).await,
            "Delete failed",
        ))
    }

    #[tool(
        name = "index_stats",
        description = "Show how many passages are indexed and which embedding provider and reranker are active."
    )]
    async fn index_stats(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        Ok(tool_response(
            self.handlers.handle_index_stats().await,
            "Stats failed",
        ))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for FilingSageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Financial filing search server. Use index_filing to index a filing, \
                 then search_filing to retrieve relevant passages with natural language."
                    .to_string(),
            ),
        }
    }
}
