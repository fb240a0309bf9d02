//! BM25 sparse retrieval over an in-memory passage corpus

use super::tokenize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Length normalization
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Immutable BM25 snapshot of one corpus.
///
/// Built wholesale by [`Bm25Index::fit`]; refitting produces a new value, so
/// readers holding an older snapshot keep a consistent view. The default
/// value is an empty index that matches nothing.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    params: Bm25Params,
    /// Term frequencies per document, in fit order
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f32,
    doc_freqs: HashMap<String, usize>,
    idf: HashMap<String, f32>,
}

impl Bm25Index {
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        Self::fit_with(documents, Bm25Params::default())
    }

    pub fn fit_with<S: AsRef<str>>(documents: &[S], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            doc_lengths.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let corpus_size = term_freqs.len();
        let avg_doc_length = doc_lengths.iter().sum::<usize>() as f32 / corpus_size.max(1) as f32;

        let idf = doc_freqs
            .iter()
            .map(|(term, &df)| (term.clone(), smoothed_idf(corpus_size, df)))
            .collect();

        tracing::debug!(
            "[BM25] Fitted {} documents ({} terms, avg length {:.1})",
            corpus_size,
            doc_freqs.len(),
            avg_doc_length
        );

        Self {
            params,
            term_freqs,
            doc_lengths,
            avg_doc_length,
            doc_freqs,
            idf,
        }
    }

    /// Documents scoring above zero, best first, ties kept in fit order
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(usize, f32)> {
        if self.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let mut scores: Vec<(usize, f32)> = (0..self.len())
            .map(|idx| (idx, self.score(&query_tokens, idx)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(top_k);
        scores
    }

    /// BM25 score of one document for a tokenized query.
    ///
    /// Repeated query terms count once per occurrence; terms unknown to the
    /// corpus contribute nothing.
    pub fn score(&self, query_tokens: &[String], doc_idx: usize) -> f32 {
        let Some(freqs) = self.term_freqs.get(doc_idx) else {
            return 0.0;
        };
        let doc_len = self.doc_lengths[doc_idx] as f32;
        let Bm25Params { k1, b } = self.params;

        query_tokens
            .iter()
            .filter_map(|term| {
                let idf = *self.idf.get(term)?;
                let tf = *freqs.get(term)? as f32;
                let numerator = tf * (k1 + 1.0);
                let denominator = tf + k1 * (1.0 - b + b * doc_len / self.avg_doc_length);
                Some(idf * numerator / denominator)
            })
            .sum()
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.idf.get(term).copied()
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`, left unclamped
fn smoothed_idf(corpus_size: usize, df: usize) -> f32 {
    let n = corpus_size as f32;
    let df = df as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "Revenue from data center products grew strongly.",
            "Export restrictions to China could harm our supply chain.",
            "Gaming revenue declined during the fiscal year.",
            "We depend on third-party foundries in Taiwan.",
        ]
    }

    #[test]
    fn test_search_before_fit_is_empty() {
        let index = Bm25Index::default();
        assert!(index.search("china", 10).is_empty());

        let fitted_empty = Bm25Index::fit::<&str>(&[]);
        assert!(fitted_empty.is_empty());
        assert!(fitted_empty.search("china", 10).is_empty());
    }

    #[test]
    fn test_corpus_statistics() {
        let index = Bm25Index::fit(&corpus());

        assert_eq!(index.len(), 4);
        assert_eq!(index.document_frequency("revenue"), 2);
        assert_eq!(index.document_frequency("china"), 1);
        assert_eq!(index.document_frequency("unknown"), 0);
        // 7 + 9 + 7 + 8 tokens, "third-party" splits in two
        assert!((index.avg_doc_length() - 7.75).abs() < 1e-6);

        let expected = ((4.0f32 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0).ln();
        assert!((index.idf("revenue").unwrap() - expected).abs() < 1e-6);
        assert!(index.idf("china").unwrap() > index.idf("revenue").unwrap());
    }

    #[test]
    fn test_search_ranks_matching_documents() {
        let index = Bm25Index::fit(&corpus());
        let results = index.search("China supply chain", 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        assert!(results[0].1 > 0.0);

        let revenue = index.search("revenue", 10);
        let ids: Vec<usize> = revenue.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&0) && ids.contains(&2));
    }

    #[test]
    fn test_zero_match_query_is_empty() {
        let index = Bm25Index::fit(&corpus());
        assert!(index.search("semiconductor lithography", 10).is_empty());
        assert!(index.search("", 10).is_empty());
    }

    #[test]
    fn test_term_frequency_monotonicity() {
        let base = ["the company sells chips", "the company builds cars", "weather report"];
        let boosted = ["the company sells chips chips chips", "the company builds cars", "weather report"];

        let before = Bm25Index::fit(&base).score(&tokenize("chips"), 0);
        let after = Bm25Index::fit(&boosted).score(&tokenize("chips"), 0);
        assert!(after >= before);
        assert!(before > 0.0);
    }

    #[test]
    fn test_ties_keep_fit_order() {
        let docs = ["alpha beta", "gamma", "alpha beta", "alpha beta"];
        let index = Bm25Index::fit(&docs);
        let results = index.search("alpha", 10);

        let ids: Vec<usize> = results.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_top_k_larger_than_pool() {
        let index = Bm25Index::fit(&corpus());
        assert_eq!(index.search("revenue", 100).len(), 2);
        assert_eq!(index.search("revenue", 1).len(), 1);
        assert!(index.search("revenue", 0).is_empty());
    }

    #[test]
    fn test_refit_replaces_state() {
        let first = Bm25Index::fit(&corpus());
        let second = Bm25Index::fit(&["only one document about china"]);

        assert_eq!(second.len(), 1);
        assert_eq!(second.document_frequency("revenue"), 0);
        assert_eq!(second.search("china", 5), vec![(0, second.score(&tokenize("china"), 0))]);
        // The earlier snapshot is untouched
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_custom_params() {
        let params = Bm25Params { k1: 1.2, b: 0.0 };
        let index = Bm25Index::fit_with(&["china china", "china and many other words here"], params);
        assert_eq!(index.params(), params);

        // Without length normalization only term frequency separates them
        let results = index.search("china", 2);
        assert_eq!(results[0].0, 0);
    }
}
