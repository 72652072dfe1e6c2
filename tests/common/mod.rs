//! Common test utilities for citewalk integration tests
//!
//! Builds small citation graphs for `MockSource` / `MockJudge` and wraps
//! the SQLite store with switchable write failures.

#![allow(dead_code)]

use citewalk::{
    DiscoveryConfig, DiscoveryEngine, EvaluationRecord, MetadataUpdate, MockJudge, MockSource,
    OpenStore, PaperId, PaperMetadata, PaperQuery, PaperRecord, PaperState, PaperStore, SearchId,
    SearchInvocation, SearchKind, SqliteStore, StorageError, StorageResult,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A paper as a detail record: abstract, year and (possibly empty) edge lists
pub fn paper(id: &str) -> PaperMetadata {
    PaperMetadata::new(id, title(id))
        .with_abstract(format!("Abstract of {}", id))
        .with_year(2023)
        .with_references(&[])
        .with_citations(&[])
}

/// Title the fixtures give paper `id`
pub fn title(id: &str) -> String {
    format!("Paper {}", id)
}

pub fn topics(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn ids(values: &[&str]) -> Vec<PaperId> {
    values.iter().map(|v| PaperId::from(*v)).collect()
}

/// SQLite store with injectable write failures
pub struct FaultyStore {
    inner: SqliteStore,
    failing_searches: HashSet<String>,
    failing_upserts: HashSet<PaperId>,
    failing_references: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            failing_searches: HashSet::new(),
            failing_upserts: HashSet::new(),
            failing_references: false,
        }
    }

    pub fn fail_search(mut self, query: &str) -> Self {
        self.failing_searches.insert(query.to_string());
        self
    }

    pub fn fail_upsert(mut self, paper_id: &str) -> Self {
        self.failing_upserts.insert(PaperId::from(paper_id));
        self
    }

    pub fn fail_references(mut self) -> Self {
        self.failing_references = true;
        self
    }

    fn injected(what: &str) -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("injected failure: {}", what),
        ))
    }
}

impl PaperStore for FaultyStore {
    fn upsert_paper(&self, paper: &PaperRecord) -> StorageResult<()> {
        if self.failing_upserts.contains(&paper.paper_id) {
            return Err(Self::injected("upsert"));
        }
        self.inner.upsert_paper(paper)
    }

    fn get_paper(&self, paper_id: &PaperId) -> StorageResult<Option<PaperRecord>> {
        self.inner.get_paper(paper_id)
    }

    fn find_papers(&self, query: &PaperQuery) -> StorageResult<Vec<PaperRecord>> {
        self.inner.find_papers(query)
    }

    fn count_papers(&self) -> StorageResult<usize> {
        self.inner.count_papers()
    }

    fn set_paper_state(&self, paper_id: &PaperId, state: PaperState) -> StorageResult<bool> {
        self.inner.set_paper_state(paper_id, state)
    }

    fn update_metadata(&self, paper_id: &PaperId, update: &MetadataUpdate) -> StorageResult<bool> {
        self.inner.update_metadata(paper_id, update)
    }

    fn add_references(&self, paper_id: &PaperId, reference_ids: &[PaperId]) -> StorageResult<()> {
        if self.failing_references {
            return Err(Self::injected("references"));
        }
        self.inner.add_references(paper_id, reference_ids)
    }

    fn add_citations(&self, paper_id: &PaperId, citation_ids: &[PaperId]) -> StorageResult<()> {
        self.inner.add_citations(paper_id, citation_ids)
    }

    fn references_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>> {
        self.inner.references_of(paper_id)
    }

    fn citations_of(&self, paper_id: &PaperId) -> StorageResult<Vec<PaperId>> {
        self.inner.citations_of(paper_id)
    }

    fn record_search(
        &self,
        query: &str,
        results_count: usize,
        kind: SearchKind,
    ) -> StorageResult<SearchId> {
        if self.failing_searches.contains(query) {
            return Err(Self::injected("search log"));
        }
        self.inner.record_search(query, results_count, kind)
    }

    fn list_searches(&self) -> StorageResult<Vec<SearchInvocation>> {
        self.inner.list_searches()
    }

    fn link_paper_to_search(&self, paper_id: &PaperId, search_id: SearchId) -> StorageResult<()> {
        self.inner.link_paper_to_search(paper_id, search_id)
    }

    fn searches_for_paper(&self, paper_id: &PaperId) -> StorageResult<Vec<SearchId>> {
        self.inner.searches_for_paper(paper_id)
    }

    fn replace_concepts(&self, paper_id: &PaperId, concepts: &[String]) -> StorageResult<()> {
        self.inner.replace_concepts(paper_id, concepts)
    }

    fn concepts_for(&self, paper_id: &PaperId) -> StorageResult<Vec<String>> {
        self.inner.concepts_for(paper_id)
    }

    fn append_evaluation(
        &self,
        paper_id: &PaperId,
        support_level: f64,
        reasoning: &str,
    ) -> StorageResult<i64> {
        self.inner.append_evaluation(paper_id, support_level, reasoning)
    }

    fn evaluations_for(&self, paper_id: &PaperId) -> StorageResult<Vec<EvaluationRecord>> {
        self.inner.evaluations_for(paper_id)
    }

    fn papers_above_support(&self, threshold: f64) -> StorageResult<Vec<PaperRecord>> {
        self.inner.papers_above_support(threshold)
    }

    fn ping(&self) -> StorageResult<()> {
        self.inner.ping()
    }
}

/// Mocks and a store wired together, kept around for assertions
pub struct Harness<S: PaperStore + 'static> {
    pub source: Arc<MockSource>,
    pub judge: Arc<MockJudge>,
    pub store: Arc<S>,
}

impl Harness<SqliteStore> {
    pub fn new(source: MockSource, judge: MockJudge) -> Self {
        Self::with_store(source, judge, SqliteStore::open_in_memory().unwrap())
    }
}

impl<S: PaperStore + 'static> Harness<S> {
    pub fn with_store(source: MockSource, judge: MockJudge, store: S) -> Self {
        Self {
            source: Arc::new(source),
            judge: Arc::new(judge),
            store: Arc::new(store),
        }
    }

    pub fn engine(&self, config: DiscoveryConfig) -> DiscoveryEngine {
        DiscoveryEngine::new(
            self.source.clone(),
            self.judge.clone(),
            self.store.clone(),
            config,
        )
    }

    pub fn paper(&self, id: &str) -> Option<PaperRecord> {
        self.store.get_paper(&PaperId::from(id)).unwrap()
    }

    /// Ids of every stored paper, stubs included, sorted
    pub fn stored_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .store
            .find_papers(&PaperQuery::new())
            .unwrap()
            .into_iter()
            .map(|p| p.paper_id.to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Ids of stored papers with full records (non-stubs), sorted
    pub fn full_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .store
            .find_papers(&PaperQuery::new().without_stubs())
            .unwrap()
            .into_iter()
            .map(|p| p.paper_id.to_string())
            .collect();
        ids.sort();
        ids
    }
}

/// Minimal HTTP/1.1 stand-in for the `/paper/search` endpoint.
///
/// Answers each request with the JSON page registered for its `offset`
/// (an empty page otherwise) and closes the connection. Returns the base
/// URL and the offsets requested so far.
pub async fn serve_search_pages(pages: HashMap<usize, Value>) -> (String, Arc<Mutex<Vec<usize>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requested = Arc::new(Mutex::new(Vec::new()));
    let log = requested.clone();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut head = Vec::new();
            let mut chunk = [0u8; 4096];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&chunk[..n]),
                }
            }

            let head = String::from_utf8_lossy(&head);
            let offset = request_offset(&head).unwrap_or(0);
            log.lock().unwrap().push(offset);

            let body = pages
                .get(&offset)
                .cloned()
                .unwrap_or_else(|| json!({ "data": [] }))
                .to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (base_url, requested)
}

/// `offset` query parameter from an HTTP request line
fn request_offset(head: &str) -> Option<usize> {
    let target = head.lines().next()?.split_whitespace().nth(1)?;
    let (_, query) = target.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("offset="))
        .and_then(|value| value.parse().ok())
}
