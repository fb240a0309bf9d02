pub mod bm25;
pub mod hybrid;

pub use bm25::{Bm25Index, Bm25Params};
pub use hybrid::{cosine_similarity, reciprocal_rank_fusion, HybridIndex, HybridSearcher};

/// Lowercased maximal `[a-z0-9]+` runs; no stemming or stop words
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}
