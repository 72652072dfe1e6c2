//! Relevance judge contract and its documented fallbacks

use crate::paper::{Relevance, SupportJudgment};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::warn;

/// Score assigned when no judgment is available, on the 0-1 relevance scale
pub const NEUTRAL_RELEVANCE: f64 = 0.5;

/// Reasoning attached when the judge failed to score a paper
pub const ANALYSIS_FAILED: &str = "Analysis failed";

/// Reasoning attached when a paper has no abstract to judge
pub const NO_ABSTRACT: &str = "No abstract available";

/// Errors from relevance judge operations.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// Every attempt failed with a transient error
    #[error("judge unavailable: {operation} failed after {attempts} attempts: {message}")]
    Unavailable {
        operation: String,
        attempts: u32,
        message: String,
    },
    /// The model answered, but not in the requested shape
    #[error("malformed judge output: {0}")]
    Malformed(String),
    /// The service rejected the request
    #[error("judge request failed: {0}")]
    Request(String),
}

/// Result type for judge operations
pub type JudgeResult<T> = Result<T, JudgeError>;

/// Relevance fallback used when scoring fails
pub fn fallback_relevance() -> Relevance {
    Relevance::new(NEUTRAL_RELEVANCE, ANALYSIS_FAILED)
}

/// Relevance assigned to papers without an abstract
pub fn no_abstract_relevance() -> Relevance {
    Relevance::new(NEUTRAL_RELEVANCE, NO_ABSTRACT)
}

/// Remove exact duplicate queries, keeping first occurrence order
pub fn dedupe_queries(queries: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

/// Language-model backed judgments used by discovery and the batch passes.
///
/// Every operation may fail; callers substitute the documented fallbacks
/// rather than stopping.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    /// Alternate search queries for a research topic
    async fn generate_queries(&self, topic: &str) -> JudgeResult<Vec<String>>;

    /// Discovery-time relevance on the 0-1 scale
    async fn score_relevance(
        &self,
        title: &str,
        abstract_text: &str,
        year: Option<i32>,
    ) -> JudgeResult<Relevance>;

    /// Short concept phrases describing a paper
    async fn extract_concepts(&self, title: &str, abstract_text: &str) -> JudgeResult<Vec<String>>;

    /// Post-hoc support level on the 0-10 scale
    async fn evaluate_support(
        &self,
        title: &str,
        abstract_text: &str,
        year: Option<i32>,
    ) -> JudgeResult<SupportJudgment>;

    /// New search queries derived from a paper's concepts.
    ///
    /// Extracts concepts, generates queries per concept (falling back to
    /// the concept itself) and removes exact duplicates, keeping first
    /// occurrence order. Fails only if concept extraction fails.
    async fn expand_search_space(
        &self,
        title: &str,
        abstract_text: Option<&str>,
    ) -> JudgeResult<Vec<String>> {
        let concepts = self
            .extract_concepts(title, abstract_text.unwrap_or_default())
            .await?;

        let mut queries = Vec::new();

        for concept in concepts {
            let generated = match self.generate_queries(&concept).await {
                Ok(generated) if !generated.is_empty() => generated,
                Ok(_) => vec![concept.clone()],
                Err(e) => {
                    warn!(concept = %concept, error = %e, "Query generation failed, using concept");
                    vec![concept.clone()]
                }
            };

            queries.extend(generated);
        }

        Ok(dedupe_queries(queries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        assert_eq!(
            dedupe_queries(strings(&["a", "b", "a", "c", "b"])),
            strings(&["a", "b", "c"])
        );
        assert!(dedupe_queries(Vec::new()).is_empty());
    }
}
