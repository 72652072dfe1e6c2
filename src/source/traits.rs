//! Paper source contract
//!
//! The discovery engine and the enrichment pass reach the bibliographic
//! service only through `PaperSource`, so the transport (HTTP, mock) stays
//! swappable.

use crate::paper::{PaperId, PaperMetadata};
use async_trait::async_trait;

/// Errors from paper source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Every attempt failed with a transient error (network, 429, 5xx)
    #[error("paper source unavailable: {operation} failed after {attempts} attempts: {message}")]
    Unavailable {
        operation: String,
        attempts: u32,
        message: String,
    },
    /// The service rejected the request; retrying would not help
    #[error("paper source rejected request: {0}")]
    Request(String),
    /// The response body was not valid JSON at all
    #[error("paper source response decode error: {0}")]
    Decode(String),
}

/// Result type for paper source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// One page of search results.
///
/// `papers` may hold fewer records than the service sent, since records
/// that fail to normalize are dropped. Paging follows `next_offset`, which
/// counts every record the service returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub papers: Vec<PaperMetadata>,
    /// Offset of the following page; `None` once the result set is exhausted
    pub next_offset: Option<usize>,
}

impl SearchPage {
    /// A page after which there is nothing more to fetch
    pub fn last(papers: Vec<PaperMetadata>) -> Self {
        Self {
            papers,
            next_offset: None,
        }
    }
}

/// Capability contract of a bibliographic service.
///
/// Implementations enforce their own rate limit and retry schedule. Partial
/// records degrade per field to defaults; only whole-call failures surface
/// as errors.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// One page of at most `limit` search results starting at `offset`
    async fn search_papers(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> SourceResult<SearchPage>;

    /// Full record including reference/citation ids and publication
    /// metadata, or `None` when the service does not know the paper.
    async fn get_paper_details(&self, paper_id: &PaperId) -> SourceResult<Option<PaperMetadata>>;

    /// Ids of papers referenced by `paper_id`
    async fn get_references(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>>;

    /// Ids of papers citing `paper_id`
    async fn get_citations(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>>;
}
