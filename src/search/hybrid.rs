use super::{Bm25Index, Bm25Params};
use crate::config::SearchConfig;
use crate::{ChunkMetadata, SearchResult};
use std::collections::HashMap;

const COSINE_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone)]
pub struct HybridSearcher {
    alpha: f32,
    rrf_k: usize,
    bm25_params: Bm25Params,
}

impl Default for HybridSearcher {
    fn default() -> Self {
        Self::new(0.5, 60)
    }
}

impl HybridSearcher {
    /// `alpha` weights the dense ranking, `1 - alpha` the sparse one
    pub fn new(alpha: f32, rrf_k: usize) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            rrf_k,
            bm25_params: Bm25Params::default(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.alpha, config.rrf_k).with_bm25_params(Bm25Params {
            k1: config.bm25_k1,
            b: config.bm25_b,
        })
    }

    pub fn with_bm25_params(mut self, params: Bm25Params) -> Self {
        self.bm25_params = params;
        self
    }

    /// Store a passage corpus and fit BM25 over it.
    ///
    /// Missing metadata entries default to empty metadata.
    pub fn index(&self, documents: Vec<String>, mut metadata: Vec<ChunkMetadata>) -> HybridIndex {
        metadata.resize_with(documents.len(), ChunkMetadata::default);
        let bm25 = Bm25Index::fit_with(&documents, self.bm25_params);

        tracing::debug!("[HYBRID] Indexed {} passages", documents.len());

        HybridIndex {
            alpha: self.alpha,
            rrf_k: self.rrf_k,
            documents,
            metadata,
            bm25,
        }
    }

    pub fn fuse(&self, dense: &[(usize, f32)], sparse: &[(usize, f32)]) -> Vec<(usize, f32)> {
        reciprocal_rank_fusion(dense, sparse, self.alpha, self.rrf_k)
    }
}

/// A fitted corpus ready for hybrid queries
#[derive(Debug, Clone)]
pub struct HybridIndex {
    alpha: f32,
    rrf_k: usize,
    documents: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    bm25: Bm25Index,
}

impl HybridIndex {
    /// Fuse the dense and sparse rankings of the corpus for one query.
    ///
    /// `document_embeddings[i]` belongs to passage `i`; an absent, empty or
    /// wrongly sized embedding leaves that passage out of the dense ranking.
    pub fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        document_embeddings: &[Vec<f32>],
        top_k: usize,
    ) -> Vec<SearchResult> {
        if self.documents.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let candidate_k = top_k.saturating_mul(2);

        let (sparse, dense) = rayon::join(
            || self.bm25.search(query, candidate_k),
            || dense_ranking(query_embedding, document_embeddings, self.documents.len(), candidate_k),
        );

        tracing::debug!(
            "[HYBRID] {} dense and {} sparse candidates for \"{}\"",
            dense.len(),
            sparse.len(),
            query
        );

        let dense_scores: HashMap<usize, f32> = dense.iter().copied().collect();
        let sparse_scores: HashMap<usize, f32> = sparse.iter().copied().collect();

        reciprocal_rank_fusion(&dense, &sparse, self.alpha, self.rrf_k)
            .into_iter()
            .take(top_k)
            .map(|(idx, combined_score)| SearchResult {
                content: self.documents[idx].clone(),
                dense_score: dense_scores.get(&idx).copied().unwrap_or(0.0),
                sparse_score: sparse_scores.get(&idx).copied().unwrap_or(0.0),
                combined_score,
                metadata: self.metadata[idx].clone(),
            })
            .collect()
    }

    pub fn bm25(&self) -> &Bm25Index {
        &self.bm25
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Weighted Reciprocal Rank Fusion of a dense and a sparse ranking.
///
/// Each list item contributes `weight / (rrf_k + rank + 1)` with a 0-based
/// rank; dense items weigh `alpha`, sparse items `1 - alpha`. A list whose
/// weight is zero is ignored. Equal fused scores keep first-seen order,
/// dense list first.
pub fn reciprocal_rank_fusion(
    dense: &[(usize, f32)],
    sparse: &[(usize, f32)],
    alpha: f32,
    rrf_k: usize,
) -> Vec<(usize, f32)> {
    let mut scores: HashMap<usize, f32> = HashMap::new();
    let mut first_seen: Vec<usize> = Vec::new();

    for (ranking, weight) in [(dense, alpha), (sparse, 1.0 - alpha)] {
        if weight <= 0.0 {
            continue;
        }
        for (rank, (idx, _score)) in ranking.iter().enumerate() {
            let rrf_score = weight / (rrf_k + rank + 1) as f32;
            scores
                .entry(*idx)
                .and_modify(|total| *total += rrf_score)
                .or_insert_with(|| {
                    first_seen.push(*idx);
                    rrf_score
                });
        }
    }

    let mut results: Vec<(usize, f32)> = first_seen
        .into_iter()
        .map(|idx| (idx, scores[&idx]))
        .collect();
    results.sort_by(|a, b| b.1.total_cmp(&a.1));

    results
}

/// `(a·b) / (‖a‖‖b‖ + ε)`; vectors of different length score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    dot / (norm_a * norm_b + COSINE_EPSILON)
}

fn dense_ranking(
    query_embedding: &[f32],
    document_embeddings: &[Vec<f32>],
    corpus_size: usize,
    top_k: usize,
) -> Vec<(usize, f32)> {
    if query_embedding.is_empty() {
        return Vec::new();
    }

    let mut scores: Vec<(usize, f32)> = document_embeddings
        .iter()
        .take(corpus_size)
        .enumerate()
        .filter(|(_, embedding)| embedding.len() == query_embedding.len())
        .map(|(idx, embedding)| (idx, cosine_similarity(query_embedding, embedding)))
        .collect();

    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.truncate(top_k);
    scores
}
