//! Paper identity, source metadata and the persisted paper record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source-assigned paper identifier
///
/// Serializes as a plain string. Globally unique within the bibliographic
/// service that issued it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    /// Create a PaperId from a source identifier
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PaperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A paper author as reported by the source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    /// Source author id; empty when the source omitted it
    #[serde(default)]
    pub id: String,
}

impl Author {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Lifecycle state of a stored paper.
///
/// Papers are never deleted; the filter pass flips them to `Disabled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperState {
    #[default]
    Active,
    Disabled,
}

impl PaperState {
    /// Integer code stored in the `state` column
    pub fn code(self) -> i64 {
        match self {
            Self::Active => 1,
            Self::Disabled => -1,
        }
    }

    pub fn from_code(code: i64) -> Self {
        if code < 0 {
            Self::Disabled
        } else {
            Self::Active
        }
    }
}

impl std::str::FromStr for PaperState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            _ => Err(format!("unknown paper state: {}", s)),
        }
    }
}

/// A discovery-time relevance judgment on the 0-1 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub score: f64,
    pub reasoning: String,
}

impl Relevance {
    pub fn new(score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            score,
            reasoning: reasoning.into(),
        }
    }
}

/// Normalized paper metadata returned by a paper source.
///
/// Every field other than the id is defaulted at the source boundary, so
/// downstream code never sees a partially-shaped response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub paper_id: PaperId,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub citation_count: u32,
    pub reference_count: u32,
    /// Referenced paper ids, `None` when the response did not include them
    pub references: Option<Vec<PaperId>>,
    /// Citing paper ids, `None` when the response did not include them
    pub citations: Option<Vec<PaperId>>,
    pub venue: Option<String>,
    pub journal: Option<String>,
    pub url: Option<String>,
    pub is_open_access: Option<bool>,
    pub pdf_url: Option<String>,
}

impl PaperMetadata {
    /// Minimal metadata with an id and title
    pub fn new(paper_id: impl Into<PaperId>, title: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_references(mut self, ids: &[&str]) -> Self {
        self.references = Some(ids.iter().map(|id| PaperId::from(*id)).collect());
        self
    }

    pub fn with_citations(mut self, ids: &[&str]) -> Self {
        self.citations = Some(ids.iter().map(|id| PaperId::from(*id)).collect());
        self
    }

    /// Abstract text, treating a blank abstract as missing
    pub fn abstract_str(&self) -> Option<&str> {
        self.abstract_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// A paper as persisted in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub paper_id: PaperId,
    /// `None` for stub records created to satisfy an edge endpoint
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub citation_count: u32,
    pub reference_count: u32,
    pub relevance: Option<Relevance>,
    pub state: PaperState,
    pub venue: Option<String>,
    pub journal: Option<String>,
    pub url: Option<String>,
    pub is_open_access: Option<bool>,
    pub pdf_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaperRecord {
    /// A stub record carrying only an identifier
    pub fn stub(paper_id: impl Into<PaperId>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: None,
            abstract_text: None,
            authors: Vec::new(),
            year: None,
            citation_count: 0,
            reference_count: 0,
            relevance: None,
            state: PaperState::Active,
            venue: None,
            journal: None,
            url: None,
            is_open_access: None,
            pdf_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Build a record from source metadata and its relevance judgment
    pub fn from_metadata(metadata: &PaperMetadata, relevance: Relevance) -> Self {
        let title = Some(metadata.title.clone()).filter(|t| !t.trim().is_empty());
        Self {
            title,
            abstract_text: metadata.abstract_str().map(str::to_string),
            authors: metadata.authors.clone(),
            year: metadata.year,
            citation_count: metadata.citation_count,
            reference_count: metadata.reference_count,
            relevance: Some(relevance),
            venue: metadata.venue.clone(),
            journal: metadata.journal.clone(),
            url: metadata.url.clone(),
            is_open_access: metadata.is_open_access,
            pdf_url: metadata.pdf_url.clone(),
            ..Self::stub(metadata.paper_id.clone())
        }
    }

    /// Whether this record is still a stub awaiting its own detail fetch
    pub fn is_stub(&self) -> bool {
        self.title.is_none()
    }

    pub fn relevance_score(&self) -> Option<f64> {
        self.relevance.as_ref().map(|r| r.score)
    }
}
