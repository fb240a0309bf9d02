pub mod chunking;
pub mod embeddings;
pub mod handlers;
pub mod llm;
pub mod pipeline;
pub mod rerank;
pub mod search;
pub mod vectordb;

pub mod error;
pub mod types;
pub mod config;

pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use pipeline::FilingRetriever;
