use super::{sort_and_truncate, RerankCandidate};
use crate::llm::LlmProvider;
use crate::types::RankedResult;
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Score used when the model fails or replies with no number
pub const NEUTRAL_SCORE: f32 = 0.5;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b").expect("valid number regex"));

/// Outcome of asking the model about one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum LlmJudgement {
    /// Relevance normalised to [0, 1]
    Scored(f32),
    Fallback(String),
}

impl LlmJudgement {
    pub fn score(&self) -> f32 {
        match self {
            LlmJudgement::Scored(score) => *score,
            LlmJudgement::Fallback(_) => NEUTRAL_SCORE,
        }
    }
}

/// Asks a language model for a 0-10 relevance rating per candidate.
///
/// Candidates are scored with bounded concurrency. A failed or unparseable
/// reply only affects its own candidate, which falls back to
/// [`NEUTRAL_SCORE`], and so does one that takes longer than the timeout.
pub struct LlmReranker {
    provider: Arc<dyn LlmProvider>,
    concurrency: usize,
    max_content_chars: usize,
    timeout: Duration,
}

impl LlmReranker {
    pub fn new(provider: Arc<dyn LlmProvider>, concurrency: usize, max_content_chars: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            max_content_chars,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        top_k: usize,
    ) -> Vec<RankedResult> {
        let pool = candidates.len().min(top_k.saturating_mul(2));
        let candidates: Vec<RerankCandidate> = candidates.into_iter().take(pool).collect();

        tracing::debug!(
            "[RERANK] Scoring {} candidates with {} (concurrency {})",
            candidates.len(),
            self.provider.provider_name(),
            self.concurrency
        );

        // `buffered` keeps input order, so ties still resolve by first-stage rank
        let judgements: Vec<LlmJudgement> = stream::iter(0..candidates.len())
            .map(|i| self.judge(query, &candidates[i].content))
            .buffered(self.concurrency)
            .collect()
            .await;

        let fallbacks = judgements
            .iter()
            .filter(|j| matches!(j, LlmJudgement::Fallback(_)))
            .count();
        if fallbacks > 0 {
            tracing::debug!("[RERANK] {} of {} candidates used the neutral score", fallbacks, judgements.len());
        }

        let mut ranked: Vec<RankedResult> = candidates
            .into_iter()
            .zip(judgements)
            .map(|(candidate, judgement)| {
                let llm_score = judgement.score();
                RankedResult {
                    original_score: candidate.score,
                    rerank_score: llm_score,
                    final_score: (candidate.score + llm_score) / 2.0,
                    content: candidate.content,
                    metadata: candidate.metadata,
                }
            })
            .collect();

        sort_and_truncate(&mut ranked, top_k);
        ranked
    }

    async fn judge(&self, query: &str, content: &str) -> LlmJudgement {
        let prompt = build_prompt(query, &truncate_chars(content, self.max_content_chars));

        let reply = match tokio::time::timeout(self.timeout, self.provider.complete(&prompt)).await {
            Ok(reply) => reply,
            Err(_) => {
                tracing::debug!("[RERANK] LLM scoring timed out after {:?}", self.timeout);
                return LlmJudgement::Fallback(format!("timed out after {:?}", self.timeout));
            }
        };

        match reply {
            Ok(reply) => match parse_relevance(&reply) {
                Some(score) => LlmJudgement::Scored(score),
                None => {
                    tracing::debug!("[RERANK] Unparseable relevance reply: {:?}", reply);
                    LlmJudgement::Fallback(format!("unparseable reply: {reply}"))
                }
            },
            Err(e) => {
                tracing::debug!("[RERANK] LLM scoring failed: {}", e);
                LlmJudgement::Fallback(e.to_string())
            }
        }
    }
}

fn build_prompt(query: &str, content: &str) -> String {
    format!(
        "Rate the relevance of this text to the query on a scale of 0-10.\n\n\
         Query: {query}\n\n\
         Text: {content}\n\n\
         Respond with ONLY a number from 0-10."
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// First number in the reply divided by 10, clamped to [0, 1]
pub fn parse_relevance(reply: &str) -> Option<f32> {
    let captures = NUMBER_RE.captures(reply.trim())?;
    let value: f32 = captures.get(1)?.as_str().parse().ok()?;
    Some((value / 10.0).clamp(0.0, 1.0))
}
