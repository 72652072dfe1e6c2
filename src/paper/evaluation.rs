//! Post-hoc support evaluations (append-only history per paper)

use super::record::PaperId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A support judgment on the 0-10 scale, as returned by the judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportJudgment {
    pub support_level: f64,
    pub reasoning: String,
}

impl SupportJudgment {
    pub fn new(support_level: f64, reasoning: impl Into<String>) -> Self {
        Self {
            support_level,
            reasoning: reasoning.into(),
        }
    }
}

/// A stored evaluation. Multiple may exist per paper; none are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub paper_id: PaperId,
    pub support_level: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}
