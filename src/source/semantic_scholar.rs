//! Semantic Scholar Graph API client
//!
//! Every request claims a slot from the client's shared rate limiter and
//! runs under its retry policy. 429, 5xx and network failures are retried;
//! other client errors are not.

use super::traits::{PaperSource, SearchPage, SourceError, SourceResult};
use super::wire::{WireEdge, WireEdgePage, WirePaper, WireSearchPage};
use crate::paper::{PaperId, PaperMetadata};
use crate::policy::{RateLimiter, RetryError, RetryPolicy, Transient};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Largest page the search and edge endpoints accept
pub const MAX_PAGE_SIZE: usize = 100;

const SEARCH_FIELDS: &str = "paperId,title,abstract,authors,year,citationCount,referenceCount";

const DETAIL_FIELDS: &str = "paperId,title,abstract,authors,year,citationCount,referenceCount,\
     references,citations,venue,journal,url,isOpenAccess,openAccessPdf";

/// Failure of a single HTTP attempt
#[derive(Debug)]
enum AttemptError {
    Network(reqwest::Error),
    Status { status: StatusCode, body: String },
    Decode(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl Transient for AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => !e.is_builder(),
            Self::Status { status, .. } => is_transient_status(*status),
            Self::Decode(_) => false,
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// `PaperSource` backed by the Semantic Scholar Graph API.
pub struct SemanticScholarClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl SemanticScholarClient {
    /// Client with the public endpoint, 100 calls per minute and three
    /// attempts backing off 2s then 4s.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            limiter: RateLimiter::per_minute(100),
            retry: RetryPolicy::default()
                .with_backoff(Duration::from_secs(2), Duration::from_secs(30)),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON document. `Ok(None)` means the service answered 404.
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<Option<T>> {
        let url = self.url(path);
        let url = &url;

        let result = self
            .retry
            .run(operation, || async move {
                self.limiter.acquire().await;

                let mut request = self.http.get(url).query(query);
                if let Some(key) = &self.api_key {
                    request = request.header("x-api-key", key);
                }

                let response = request.send().await.map_err(AttemptError::Network)?;
                let status = response.status();

                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::Status { status, body });
                }

                let body = response.text().await.map_err(AttemptError::Network)?;
                serde_json::from_str::<T>(&body)
                    .map(Some)
                    .map_err(|e| AttemptError::Decode(e.to_string()))
            })
            .await;

        result.map_err(|e| to_source_error(operation, e))
    }

    async fn edge_ids(
        &self,
        operation: &str,
        paper_id: &PaperId,
        edge: &str,
        limit: usize,
        pick: fn(WireEdge) -> Option<PaperId>,
    ) -> SourceResult<Vec<PaperId>> {
        let query = [
            ("fields", "paperId".to_string()),
            ("limit", clamp_limit(limit).to_string()),
        ];
        let path = format!("/paper/{}/{}", paper_id, edge);

        let page: Option<WireEdgePage> = self.get_json(operation, &path, &query).await?;
        Ok(page
            .map(|p| p.data.into_iter().filter_map(pick).collect())
            .unwrap_or_default())
    }
}

fn to_source_error(operation: &str, error: RetryError<AttemptError>) -> SourceError {
    match error {
        RetryError::Exhausted { attempts, last } => SourceError::Unavailable {
            operation: operation.to_string(),
            attempts,
            message: last.to_string(),
        },
        RetryError::Permanent(AttemptError::Decode(e)) => SourceError::Decode(e),
        RetryError::Permanent(e) => SourceError::Request(e.to_string()),
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    async fn search_papers(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> SourceResult<SearchPage> {
        info!(query, offset, "Searching papers");

        let params = [
            ("query", query.to_string()),
            ("offset", offset.to_string()),
            ("limit", clamp_limit(limit).to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];

        let page: Option<WireSearchPage> =
            self.get_json("search_papers", "/paper/search", &params).await?;

        let page = page.map(|p| p.into_page(offset)).unwrap_or_default();

        debug!(
            query,
            offset,
            results = page.papers.len(),
            next_offset = ?page.next_offset,
            "Search page received"
        );
        Ok(page)
    }

    async fn get_paper_details(&self, paper_id: &PaperId) -> SourceResult<Option<PaperMetadata>> {
        debug!(paper_id = %paper_id, "Fetching paper details");

        let params = [("fields", DETAIL_FIELDS.to_string())];
        let path = format!("/paper/{}", paper_id);

        let paper: Option<WirePaper> = self.get_json("get_paper_details", &path, &params).await?;
        Ok(paper.and_then(WirePaper::normalize))
    }

    async fn get_references(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>> {
        debug!(paper_id = %paper_id, "Fetching references");
        self.edge_ids("get_references", paper_id, "references", limit, WireEdge::cited_id)
            .await
    }

    async fn get_citations(&self, paper_id: &PaperId, limit: usize) -> SourceResult<Vec<PaperId>> {
        debug!(paper_id = %paper_id, "Fetching citations");
        self.edge_ids("get_citations", paper_id, "citations", limit, WireEdge::citing_id)
            .await
    }
}
