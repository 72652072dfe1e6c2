//! In-memory paper source for tests

use super::traits::{PaperSource, SearchPage, SourceError, SourceResult};
use crate::paper::{PaperId, PaperMetadata};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock paper source: serves a preconfigured corpus.
///
/// Search results are keyed by exact query text and paged by offset, with
/// `next_offset` set while registered results remain. Detail records double as
/// the corpus for `get_references` / `get_citations`. Call counters let
/// tests assert how often each paper was fetched.
#[derive(Default)]
pub struct MockSource {
    searches: HashMap<String, Vec<PaperMetadata>>,
    details: HashMap<PaperId, PaperMetadata>,
    failing_queries: HashSet<String>,
    pages_before_failure: HashMap<String, usize>,
    dropped_results: HashSet<PaperId>,
    failing_details: HashSet<PaperId>,
    search_calls: Mutex<Vec<String>>,
    detail_calls: Mutex<HashMap<PaperId, usize>>,
    edge_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the full result list for a query
    pub fn with_search(mut self, query: impl Into<String>, results: Vec<PaperMetadata>) -> Self {
        self.searches.insert(query.into(), results);
        self
    }

    /// Register a detail record
    pub fn with_paper(mut self, paper: PaperMetadata) -> Self {
        self.details.insert(paper.paper_id.clone(), paper);
        self
    }

    /// Make every search for `query` fail
    pub fn with_failing_search(mut self, query: impl Into<String>) -> Self {
        self.failing_queries.insert(query.into());
        self
    }

    /// Serve `pages` pages for `query`, then fail every later page request
    pub fn with_search_failing_after(mut self, query: impl Into<String>, pages: usize) -> Self {
        self.pages_before_failure.insert(query.into(), pages);
        self
    }

    /// Leave `paper_id` out of search pages while still counting it for
    /// paging, the way a record that fails to normalize is dropped
    pub fn with_dropped_result(mut self, paper_id: impl Into<PaperId>) -> Self {
        self.dropped_results.insert(paper_id.into());
        self
    }

    /// Make detail fetches for `paper_id` fail
    pub fn with_failing_details(mut self, paper_id: impl Into<PaperId>) -> Self {
        self.failing_details.insert(paper_id.into());
        self
    }

    /// Queries searched so far, one entry per page request
    pub fn searched_queries(&self) -> Vec<String> {
        self.search_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of detail fetches for a paper
    pub fn detail_calls(&self, paper_id: &str) -> usize {
        self.detail_calls
            .lock()
            .ok()
            .and_then(|calls| calls.get(&PaperId::from(paper_id)).copied())
            .unwrap_or(0)
    }

    /// Number of `get_references` + `get_citations` calls
    pub fn edge_calls(&self) -> usize {
        self.edge_calls.load(Ordering::SeqCst)
    }

    fn unavailable(operation: &str, subject: &str) -> SourceError {
        SourceError::Unavailable {
            operation: operation.to_string(),
            attempts: 1,
            message: format!("mock failure for '{}'", subject),
        }
    }
}

#[async_trait]
impl PaperSource for MockSource {
    async fn search_papers(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> SourceResult<SearchPage> {
        let served = match self.search_calls.lock() {
            Ok(mut calls) => {
                let served = calls.iter().filter(|q| q.as_str() == query).count();
                calls.push(query.to_string());
                served
            }
            Err(_) => 0,
        };

        if self.failing_queries.contains(query) {
            return Err(Self::unavailable("search_papers", query));
        }
        if let Some(&pages) = self.pages_before_failure.get(query) {
            if served >= pages {
                return Err(Self::unavailable("search_papers", query));
            }
        }

        let Some(results) = self.searches.get(query) else {
            return Ok(SearchPage::default());
        };

        let start = offset.min(results.len());
        let end = offset.saturating_add(limit).min(results.len());
        let papers = results[start..end]
            .iter()
            .filter(|p| !self.dropped_results.contains(&p.paper_id))
            .cloned()
            .collect();

        Ok(SearchPage {
            papers,
            next_offset: (start < end && end < results.len()).then_some(end),
        })
    }

    async fn get_paper_details(&self, paper_id: &PaperId) -> SourceResult<Option<PaperMetadata>> {
        if let Ok(mut calls) = self.detail_calls.lock() {
            *calls.entry(paper_id.clone()).or_insert(0) += 1;
        }

        if self.failing_details.contains(paper_id) {
            return Err(Self::unavailable("get_paper_details", paper_id.as_str()));
        }

        Ok(self.details.get(paper_id).cloned())
    }

    async fn get_references(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>> {
        self.edge_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .details
            .get(paper_id)
            .and_then(|p| p.references.clone())
            .map(|ids| ids.into_iter().take(limit).collect())
            .unwrap_or_default())
    }

    async fn get_citations(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>> {
        self.edge_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .details
            .get(paper_id)
            .and_then(|p| p.citations.clone())
            .map(|ids| ids.into_iter().take(limit).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_pages_through_registered_results() {
        let papers = (0..5)
            .map(|i| PaperMetadata::new(format!("p{}", i), "T"))
            .collect();
        let source = MockSource::new().with_search("q", papers);

        let first = source.search_papers("q", 0, 3).await.unwrap();
        assert_eq!(first.papers.len(), 3);
        assert_eq!(first.next_offset, Some(3));

        let last = source.search_papers("q", 3, 10).await.unwrap();
        assert_eq!(last.papers.len(), 2);
        assert_eq!(last.papers[0].paper_id.as_str(), "p3");
        assert_eq!(last.next_offset, None);

        assert_eq!(source.search_papers("other", 0, 10).await.unwrap(), SearchPage::default());
        assert_eq!(source.searched_queries(), vec!["q", "q", "other"]);
    }

    #[tokio::test]
    async fn dropped_results_still_count_for_paging() {
        let papers = (0..4)
            .map(|i| PaperMetadata::new(format!("p{}", i), "T"))
            .collect();
        let source = MockSource::new()
            .with_search("q", papers)
            .with_dropped_result("p1");

        let page = source.search_papers("q", 0, 2).await.unwrap();
        assert_eq!(page.papers.len(), 1);
        assert_eq!(page.next_offset, Some(2));
    }

    #[tokio::test]
    async fn search_fails_after_served_pages() {
        let papers = (0..10)
            .map(|i| PaperMetadata::new(format!("p{}", i), "T"))
            .collect();
        let source = MockSource::new()
            .with_search("q", papers)
            .with_search_failing_after("q", 2);

        assert!(source.search_papers("q", 0, 3).await.is_ok());
        assert!(source.search_papers("q", 3, 3).await.is_ok());
        assert!(source.search_papers("q", 6, 3).await.is_err());
    }

    #[tokio::test]
    async fn failing_details_and_counters() {
        let source = MockSource::new()
            .with_paper(PaperMetadata::new("p1", "T").with_references(&["r1"]))
            .with_failing_details("bad");

        assert!(source.get_paper_details(&PaperId::from("p1")).await.unwrap().is_some());
        assert!(source.get_paper_details(&PaperId::from("missing")).await.unwrap().is_none());
        assert!(source.get_paper_details(&PaperId::from("bad")).await.is_err());
        assert_eq!(source.detail_calls("p1"), 1);

        let refs = source.get_references(&PaperId::from("p1"), 100).await.unwrap();
        assert_eq!(refs, vec![PaperId::from("r1")]);
        assert_eq!(source.edge_calls(), 1);
    }
}
