use super::{sort_and_truncate, RerankCandidate};
use crate::types::RankedResult;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Financial vocabulary and the multiplier applied when a passage mentions it
pub const BOOST_KEYWORDS: &[(&str, f32)] = &[
    ("revenue", 1.2),
    ("earnings", 1.2),
    ("profit", 1.1),
    ("margin", 1.1),
    ("growth", 1.1),
    ("guidance", 1.3),
    ("outlook", 1.2),
    ("risk", 1.2),
    ("china", 1.3),
    ("supply chain", 1.2),
    ("competition", 1.1),
    ("market share", 1.1),
    ("operating income", 1.2),
    ("cash flow", 1.1),
    ("debt", 1.1),
    ("acquisition", 1.1),
];

const QUERY_TERM_BOOST: f32 = 1.1;
const SHORT_PASSAGE_PENALTY: f32 = 0.7;
const SHORT_PASSAGE_CHARS: usize = 100;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// Multiplicative keyword reranker. No I/O.
#[derive(Debug, Clone, Default)]
pub struct KeywordReranker;

impl KeywordReranker {
    pub fn new() -> Self {
        Self
    }

    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        top_k: usize,
    ) -> Vec<RankedResult> {
        let terms = query_terms(query);

        let mut ranked: Vec<RankedResult> = candidates
            .into_iter()
            .map(|candidate| {
                let rerank_score = self.score(&terms, &candidate.content);
                RankedResult {
                    original_score: candidate.score,
                    rerank_score,
                    final_score: candidate.score * rerank_score,
                    content: candidate.content,
                    metadata: candidate.metadata,
                }
            })
            .collect();

        sort_and_truncate(&mut ranked, top_k);
        ranked
    }

    fn score(&self, terms: &BTreeSet<String>, content: &str) -> f32 {
        let content_lower = content.to_lowercase();
        let mut score = 1.0f32;

        for term in terms {
            if content_lower.contains(term.as_str()) {
                score *= QUERY_TERM_BOOST;
            }
        }

        for (keyword, boost) in BOOST_KEYWORDS {
            if content_lower.contains(keyword) {
                score *= boost;
            }
        }

        if content.chars().count() < SHORT_PASSAGE_CHARS {
            score *= SHORT_PASSAGE_PENALTY;
        }

        score
    }
}

/// Distinct lowercase query words longer than two characters
fn query_terms(query: &str) -> BTreeSet<String> {
    let lower = query.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|term| term.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn candidate(content: &str, score: f32) -> RerankCandidate {
        RerankCandidate {
            content: content.to_string(),
            score,
            metadata: ChunkMetadata::default(),
        }
    }

    fn padded(text: &str) -> String {
        format!("{text} {}", "lorem ipsum dolor sit amet ".repeat(5))
    }

    #[test]
    fn test_query_terms_skip_short_words() {
        let terms = query_terms("What is the AI outlook?");
        let terms: Vec<&str> = terms.iter().map(String::as_str).collect();
        assert_eq!(terms, vec!["outlook", "the", "what"]);
    }

    #[test]
    fn test_score_multiplies_boosts() {
        let reranker = KeywordReranker::new();
        let ranked = reranker.rerank(
            "nvidia guidance",
            vec![candidate(&padded("NVIDIA raised guidance."), 1.0)],
            1,
        );

        // "nvidia" and "guidance" match the query; "guidance" is also a boosted keyword
        let expected = 1.1 * 1.1 * 1.3;
        assert!((ranked[0].rerank_score - expected).abs() < 1e-5);
        assert!((ranked[0].final_score - expected).abs() < 1e-5);
        assert_eq!(ranked[0].original_score, 1.0);
    }

    #[test]
    fn test_short_passage_penalty() {
        let reranker = KeywordReranker::new();
        let ranked = reranker.rerank("zzz", vec![candidate("Tiny passage.", 0.5)], 1);

        assert!((ranked[0].rerank_score - 0.7).abs() < 1e-6);
        assert!((ranked[0].final_score - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_more_domain_keywords_rank_higher() {
        let reranker = KeywordReranker::new();
        let fewer = padded("Quarterly revenue was stable.");
        let more = padded("Quarterly revenue was stable and the margin improved.");

        let ranked = reranker.rerank(
            "quarterly results",
            vec![candidate(&fewer, 0.5), candidate(&more, 0.5)],
            2,
        );

        assert_eq!(ranked[0].content, more);
        assert!(ranked[0].final_score >= ranked[1].final_score);
    }

    #[test]
    fn test_multi_word_keywords_match() {
        let reranker = KeywordReranker::new();
        let plain = padded("Components are sourced globally.");
        let chain = padded("Components are sourced through our supply chain.");

        let ranked = reranker.rerank(
            "sourcing",
            vec![candidate(&plain, 0.5), candidate(&chain, 0.5)],
            2,
        );

        assert_eq!(ranked[0].content, chain);
        assert!((ranked[0].rerank_score - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_truncates_and_handles_empty_input() {
        let reranker = KeywordReranker::new();
        assert!(reranker.rerank("revenue", Vec::new(), 5).is_empty());

        let candidates = (0..4)
            .map(|i| candidate(&padded(&format!("passage {i}")), 0.1 * i as f32))
            .collect();
        let ranked = reranker.rerank("passage", candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].original_score > ranked[1].original_score);
    }
}
