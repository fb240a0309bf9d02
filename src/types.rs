use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A section-tagged passage of a filing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub chunk_index: usize,
    /// Char offsets into the cleaned document text
    pub start_char: usize,
    pub end_char: usize,
}

/// Metadata attached to every chunk of a filing.
///
/// Every named field is optional: document sources are free to leave any of
/// them out, and unknown keys are carried in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChunkMetadata {
    pub fn for_filing(ticker: &str, form_type: &str) -> Self {
        Self {
            ticker: Some(ticker.to_uppercase()),
            form_type: Some(form_type.to_string()),
            ..Self::default()
        }
    }

    /// Key under which all chunks of one document are replaced together
    pub fn source_key(&self) -> Option<&str> {
        self.ticker.as_deref().or(self.source.as_deref())
    }
}

/// Fused hybrid search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    /// Cosine similarity, 0.0 when the passage was not a dense candidate
    pub dense_score: f32,
    /// BM25 score, 0.0 when the passage was not a sparse candidate
    pub sparse_score: f32,
    pub combined_score: f32,
    pub metadata: ChunkMetadata,
}

/// Reranked search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub content: String,
    pub original_score: f32,
    pub rerank_score: f32,
    pub final_score: f32,
    pub metadata: ChunkMetadata,
}

impl From<SearchResult> for RankedResult {
    fn from(result: SearchResult) -> Self {
        Self {
            content: result.content,
            original_score: result.combined_score,
            rerank_score: 1.0,
            final_score: result.combined_score,
            metadata: result.metadata,
        }
    }
}

/// Outcome of indexing one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub source_key: Option<String>,
    pub chunks_indexed: usize,
    pub chunks_replaced: usize,
    pub total_chars: usize,
    pub elapsed_secs: f64,
}
