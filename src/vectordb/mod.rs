//! Vector store abstraction and the in-memory implementation

pub mod memory;

use crate::types::{Chunk, ChunkMetadata};
use crate::{Error, Result};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}

/// Conjunction of metadata constraints; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    pub ticker: Option<String>,
    pub form_type: Option<String>,
    pub section: Option<String>,
    pub source: Option<String>,
}

impl MetadataFilter {
    pub fn ticker(ticker: &str) -> Self {
        Self {
            ticker: Some(ticker.to_string()),
            ..Self::default()
        }
    }

    /// Filter selecting every record that shares the document's source key
    pub fn for_document(metadata: &ChunkMetadata) -> Option<Self> {
        if let Some(ticker) = &metadata.ticker {
            return Some(Self::ticker(ticker));
        }
        metadata.source.as_ref().map(|source| Self {
            source: Some(source.clone()),
            ..Self::default()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ticker.is_none()
            && self.form_type.is_none()
            && self.section.is_none()
            && self.source.is_none()
    }

    /// Tickers compare case-insensitively, other fields exactly
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        let ticker_ok = match (&self.ticker, &metadata.ticker) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        };

        ticker_ok
            && field_matches(&self.form_type, &metadata.form_type)
            && field_matches(&self.section, &metadata.section)
            && field_matches(&self.source, &metadata.source)
    }
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual.as_deref() == Some(wanted.as_str()),
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records, replacing any with the same id
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Nearest records by cosine similarity among those matching `filter`
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>>;

    /// Remove matching records, returning how many were removed
    async fn delete(&self, filter: &MetadataFilter) -> Result<usize>;

    /// All matching records in insertion order
    async fn fetch(&self, filter: &MetadataFilter) -> Result<Vec<VectorRecord>>;

    async fn count(&self) -> Result<usize>;

    /// Length every stored vector must have
    fn dimension(&self) -> usize;

    async fn add_chunks(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        const STORAGE_BATCH_SIZE: usize = 50;

        if chunks.len() != embeddings.len() {
            return Err(Error::VectorDb(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.id.clone(),
                vector,
                chunk,
            })
            .collect();

        let total_batches = records.len().div_ceil(STORAGE_BATCH_SIZE);
        let mut records = records.into_iter().peekable();
        let mut batch_number = 0;
        while records.peek().is_some() {
            batch_number += 1;
            let batch: Vec<VectorRecord> = records.by_ref().take(STORAGE_BATCH_SIZE).collect();
            tracing::debug!(
                "[VECTOR-DB] Inserting batch {}/{} ({} vectors)",
                batch_number,
                total_batches,
                batch.len()
            );
            self.add(batch).await?;
        }

        Ok(())
    }
}

pub use memory::InMemoryVectorStore;

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(ticker: Option<&str>, section: Option<&str>) -> ChunkMetadata {
        ChunkMetadata {
            ticker: ticker.map(str::to_string),
            form_type: Some("10-K".to_string()),
            section: section.map(str::to_string),
            ..ChunkMetadata::default()
        }
    }

    #[test]
    fn test_filter_matching() {
        let risk = metadata(Some("NVDA"), Some("ITEM 1A. RISK FACTORS"));

        assert!(MetadataFilter::default().matches(&risk));
        assert!(MetadataFilter::ticker("nvda").matches(&risk));
        assert!(!MetadataFilter::ticker("AMD").matches(&risk));
        assert!(!MetadataFilter::ticker("NVDA").matches(&metadata(None, None)));

        let filter = MetadataFilter {
            form_type: Some("10-Q".to_string()),
            ..MetadataFilter::ticker("NVDA")
        };
        assert!(!filter.matches(&risk));

        let filter = MetadataFilter {
            section: Some("ITEM 1A. RISK FACTORS".to_string()),
            ..MetadataFilter::default()
        };
        assert!(filter.matches(&risk));
        assert!(!filter.matches(&metadata(Some("NVDA"), None)));
    }

    #[test]
    fn test_document_filter_prefers_ticker() {
        let mut meta = ChunkMetadata::for_filing("aapl", "10-K");
        meta.source = Some("/tmp/aapl.txt".to_string());
        assert_eq!(MetadataFilter::for_document(&meta), Some(MetadataFilter::ticker("AAPL")));

        meta.ticker = None;
        let filter = MetadataFilter::for_document(&meta).unwrap();
        assert_eq!(filter.source.as_deref(), Some("/tmp/aapl.txt"));

        assert_eq!(MetadataFilter::for_document(&ChunkMetadata::default()), None);
    }
}
