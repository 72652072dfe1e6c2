//! Search invocations: one executed query against the paper source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identity of a recorded search
pub type SearchId = i64;

/// Why a search was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Query derived from a research topic
    Keyword,
    /// Query derived from a relevant seed paper's concepts
    Expansion,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Expansion => "expansion",
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keyword" => Ok(Self::Keyword),
            "expansion" => Ok(Self::Expansion),
            _ => Err(format!("unknown search kind: {}", s)),
        }
    }
}

/// An immutable record of an executed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInvocation {
    pub id: SearchId,
    pub query: String,
    pub results_count: usize,
    pub kind: SearchKind,
    pub timestamp: DateTime<Utc>,
}
