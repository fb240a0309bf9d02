use super::{MetadataFilter, ScoredRecord, VectorRecord, VectorStore};
use crate::search::cosine_similarity;
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local vector store.
///
/// Records are keyed by id; a sequence number remembers insertion order so
/// `fetch` is deterministic. Every vector must have the store's dimension.
pub struct InMemoryVectorStore {
    records: DashMap<String, (u64, VectorRecord)>,
    next_seq: AtomicU64,
    dimension: usize,
    score_threshold: Option<f32>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            records: DashMap::new(),
            next_seq: AtomicU64::new(0),
            dimension,
            score_threshold: None,
        }
    }

    /// Drop `search` hits scoring below `threshold`
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    fn matching(&self, filter: &MetadataFilter) -> Vec<(u64, VectorRecord)> {
        let mut matched: Vec<(u64, VectorRecord)> = self
            .records
            .iter()
            .filter(|entry| filter.matches(&entry.value().1.chunk.metadata))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by_key(|(seq, _)| *seq);
        matched
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimension) {
            return Err(Error::VectorDb(format!(
                "Vector for '{}' has dimension {}, store expects {}",
                bad.id,
                bad.vector.len(),
                self.dimension
            )));
        }

        for record in records {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            self.records.insert(record.id.clone(), (seq, record));
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredRecord>> {
        if query_vector.len() != self.dimension {
            return Err(Error::VectorDb(format!(
                "Query has dimension {}, store expects {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<ScoredRecord> = self
            .matching(filter)
            .into_iter()
            .map(|(_, record)| ScoredRecord {
                score: cosine_similarity(query_vector, &record.vector),
                record,
            })
            .filter(|hit| self.score_threshold.map_or(true, |t| hit.score >= t))
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<usize> {
        let before = self.records.len();
        self.records
            .retain(|_, (_, record)| !filter.matches(&record.chunk.metadata));
        let removed = before.saturating_sub(self.records.len());

        if removed > 0 {
            tracing::info!("[VECTOR-DB] Deleted {} records", removed);
        }
        Ok(removed)
    }

    async fn fetch(&self, filter: &MetadataFilter) -> Result<Vec<VectorRecord>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
