//! Storage trait definitions

use crate::paper::{
    EvaluationRecord, PaperId, PaperMetadata, PaperRecord, PaperState, SearchId,
    SearchInvocation, SearchKind,
};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Filter criteria for querying papers
#[derive(Debug, Clone, Default)]
pub struct PaperQuery {
    /// Filter by lifecycle state
    pub state: Option<PaperState>,
    /// Minimum discovery relevance score (inclusive)
    pub min_relevance: Option<f64>,
    /// Only papers with a non-empty abstract
    pub has_abstract: bool,
    /// Exclude stub records (no title yet)
    pub exclude_stubs: bool,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl PaperQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: PaperState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_min_relevance(mut self, score: f64) -> Self {
        self.min_relevance = Some(score);
        self
    }

    pub fn with_abstract(mut self) -> Self {
        self.has_abstract = true;
        self
    }

    pub fn without_stubs(mut self) -> Self {
        self.exclude_stubs = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Publication metadata written by the enrichment pass.
///
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataUpdate {
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub journal: Option<String>,
    pub url: Option<String>,
    pub is_open_access: Option<bool>,
    pub pdf_url: Option<String>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&PaperMetadata> for MetadataUpdate {
    fn from(details: &PaperMetadata) -> Self {
        Self {
            year: details.year,
            venue: details.venue.clone().filter(|v| !v.is_empty()),
            journal: details.journal.clone().filter(|j| !j.is_empty()),
            url: details.url.clone().filter(|u| !u.is_empty()),
            is_open_access: details.is_open_access,
            pdf_url: details.pdf_url.clone().filter(|p| !p.is_empty()),
        }
    }
}

/// Durable storage for papers, their edges, search provenance,
/// concepts and evaluations.
///
/// Every method applies its writes atomically. Implementations must be
/// thread-safe (Send + Sync) so one store can back concurrent workers.
pub trait PaperStore: Send + Sync {
    // === Paper Operations ===

    /// Insert or merge a paper. Re-inserting an existing id never errors.
    fn upsert_paper(&self, paper: &PaperRecord) -> StorageResult<()>;

    /// Load a paper by id
    fn get_paper(&self, paper_id: &PaperId) -> StorageResult<Option<PaperRecord>>;

    /// Find papers matching filter criteria
    fn find_papers(&self, query: &PaperQuery) -> StorageResult<Vec<PaperRecord>>;

    /// Total number of stored papers, stubs included
    fn count_papers(&self) -> StorageResult<usize>;

    /// Set a paper's lifecycle state. Returns false if the paper is unknown.
    fn set_paper_state(&self, paper_id: &PaperId, state: PaperState) -> StorageResult<bool>;

    /// Merge publication metadata. Returns false if the paper is unknown.
    fn update_metadata(&self, paper_id: &PaperId, update: &MetadataUpdate) -> StorageResult<bool>;

    // === Edge Operations ===

    /// Record `paper_id -> reference` edges, creating stub endpoints as needed
    fn add_references(&self, paper_id: &PaperId, reference_ids: &[PaperId]) -> StorageResult<()>;

    /// Record citation edges (`citing` papers cite `paper_id`), creating stubs as needed
    fn add_citations(&self, paper_id: &PaperId, citation_ids: &[PaperId]) -> StorageResult<()>;

    /// Papers referenced by `paper_id`
    fn references_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>>;

    /// Papers citing `paper_id`
    fn citations_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>>;

    // === Search Provenance ===

    /// Record an executed search and return its identity
    fn record_search(
        &self,
        query: &str,
        results_count: usize,
        kind: SearchKind,
    ) -> StorageResult<SearchId>;

    /// All recorded searches, oldest first
    fn list_searches(&self) -> StorageResult<Vec<SearchInvocation>>;

    /// Link a paper to the search that surfaced it (idempotent per pair)
    fn link_paper_to_search(&self, paper_id: &PaperId, search_id: SearchId) -> StorageResult<()>;

    /// Searches that surfaced a paper
    fn searches_for_paper(&self, paper_id: &PaperId) -> StorageResult<Vec<SearchId>>;

    // === Concepts ===

    /// Replace the full concept set of a paper
    fn replace_concepts(&self, paper_id: &PaperId, concepts: &[String]) -> StorageResult<()>;

    /// Concepts currently attached to a paper
    fn concepts_for(&self, paper_id: &PaperId) -> StorageResult<Vec<String>>;

    // === Evaluations ===

    /// Append a support evaluation and return its id
    fn append_evaluation(
        &self,
        paper_id: &PaperId,
        support_level: f64,
        reasoning: &str,
    ) -> StorageResult<i64>;

    /// Evaluation history of a paper, oldest first
    fn evaluations_for(&self, paper_id: &PaperId) -> StorageResult<Vec<EvaluationRecord>>;

    /// Active papers whose latest evaluation clears `threshold` (inclusive)
    fn papers_above_support(&self, threshold: f64) -> StorageResult<Vec<PaperRecord>>;

    // === Health ===

    /// Round-trip a trivial statement to confirm the store is reachable
    fn ping(&self) -> StorageResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: PaperStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
