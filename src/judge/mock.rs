//! Scripted relevance judge for tests

use super::traits::{JudgeError, JudgeResult, RelevanceJudge};
use crate::paper::{Relevance, SupportJudgment};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock judge. Answers from preconfigured tables keyed by topic or title.
///
/// Unscripted topics echo back as their own single query, unscripted
/// papers score `default_relevance` and have no concepts. A `failing()`
/// judge errors on every call.
pub struct MockJudge {
    failing: bool,
    queries: HashMap<String, Vec<String>>,
    relevance: HashMap<String, f64>,
    default_relevance: f64,
    concepts: HashMap<String, Vec<String>>,
    support: HashMap<String, f64>,
    default_support: f64,
    calls: Mutex<HashMap<&'static str, Vec<String>>>,
}

impl Default for MockJudge {
    fn default() -> Self {
        Self {
            failing: false,
            queries: HashMap::new(),
            relevance: HashMap::new(),
            default_relevance: 0.0,
            concepts: HashMap::new(),
            support: HashMap::new(),
            default_support: 0.0,
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl MockJudge {
    pub fn new() -> Self {
        Self::default()
    }

    /// A judge whose every operation fails as unavailable
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_queries(mut self, topic: impl Into<String>, queries: &[&str]) -> Self {
        self.queries
            .insert(topic.into(), queries.iter().map(|q| q.to_string()).collect());
        self
    }

    /// Relevance (0-1) for the paper with this title
    pub fn with_relevance(mut self, title: impl Into<String>, score: f64) -> Self {
        self.relevance.insert(title.into(), score);
        self
    }

    pub fn with_default_relevance(mut self, score: f64) -> Self {
        self.default_relevance = score;
        self
    }

    pub fn with_concepts(mut self, title: impl Into<String>, concepts: &[&str]) -> Self {
        self.concepts
            .insert(title.into(), concepts.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Support level (0-10) for the paper with this title
    pub fn with_support(mut self, title: impl Into<String>, level: f64) -> Self {
        self.support.insert(title.into(), level);
        self
    }

    pub fn with_default_support(mut self, level: f64) -> Self {
        self.default_support = level;
        self
    }

    /// Arguments (topic or title) of every call to `operation`, in order
    pub fn calls(&self, operation: &str) -> Vec<String> {
        self.calls
            .lock()
            .ok()
            .and_then(|calls| calls.get(operation).cloned())
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str, argument: &str) -> JudgeResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.entry(operation).or_default().push(argument.to_string());
        }

        if self.failing {
            return Err(JudgeError::Unavailable {
                operation: operation.to_string(),
                attempts: 1,
                message: "mock judge configured as failing".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RelevanceJudge for MockJudge {
    async fn generate_queries(&self, topic: &str) -> JudgeResult<Vec<String>> {
        self.record("generate_queries", topic)?;
        Ok(self
            .queries
            .get(topic)
            .cloned()
            .unwrap_or_else(|| vec![topic.to_string()]))
    }

    async fn score_relevance(
        &self,
        title: &str,
        _abstract_text: &str,
        _year: Option<i32>,
    ) -> JudgeResult<Relevance> {
        self.record("score_relevance", title)?;
        let score = self.relevance.get(title).copied().unwrap_or(self.default_relevance);
        Ok(Relevance::new(score, format!("mock relevance for {}", title)))
    }

    async fn extract_concepts(&self, title: &str, _abstract_text: &str) -> JudgeResult<Vec<String>> {
        self.record("extract_concepts", title)?;
        Ok(self.concepts.get(title).cloned().unwrap_or_default())
    }

    async fn evaluate_support(
        &self,
        title: &str,
        _abstract_text: &str,
        _year: Option<i32>,
    ) -> JudgeResult<SupportJudgment> {
        self.record("evaluate_support", title)?;
        let level = self.support.get(title).copied().unwrap_or(self.default_support);
        Ok(SupportJudgment::new(level, format!("mock support for {}", title)))
    }
}
