//! DiscoveryEngine: relevance-gated traversal of the citation graph

use super::cancel::CancellationToken;
use crate::judge::{dedupe_queries, fallback_relevance, no_abstract_relevance, RelevanceJudge};
use crate::paper::{PaperId, PaperMetadata, PaperRecord, SearchKind};
use crate::source::PaperSource;
use crate::storage::PaperStore;
use dashmap::DashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hard ceiling on results collected for one query
pub const SEARCH_RESULT_CEILING: usize = 1000;

/// Page size used when collecting search results
pub const SEARCH_PAGE_SIZE: usize = 100;

/// Tunables for one discovery run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Per-query result cap, further bounded by `SEARCH_RESULT_CEILING`
    pub max_papers_per_search: usize,
    /// Reference hops followed below a seed paper
    pub max_reference_depth: u32,
    /// Inclusive 0-1 relevance a paper needs before it is expanded
    pub relevance_threshold: f64,
    /// Limit passed to `get_references` / `get_citations`
    pub edge_fetch_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_papers_per_search: 100,
            max_reference_depth: 2,
            relevance_threshold: 0.7,
            edge_fetch_limit: 100,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_max_papers_per_search(mut self, max: usize) -> Self {
        self.max_papers_per_search = max;
        self
    }

    pub fn with_max_reference_depth(mut self, depth: u32) -> Self {
        self.max_reference_depth = depth;
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: f64) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    /// Results to collect per query
    pub fn search_cap(&self) -> usize {
        self.max_papers_per_search.min(SEARCH_RESULT_CEILING)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub topics_processed: usize,
    /// Searches recorded, keyword and expansion
    pub searches_recorded: usize,
    /// Queries whose search could not be recorded; their papers were skipped
    pub searches_skipped: usize,
    /// Expansion queries derived from seed papers
    pub expansion_queries: usize,
    /// Papers taken off the processed-set for the first time
    pub papers_processed: usize,
    pub papers_persisted: usize,
    /// Papers dropped for missing details or a failed write
    pub papers_abandoned: usize,
    /// Judge calls replaced by a documented fallback
    pub judge_fallbacks: usize,
    pub cancelled: bool,
}

type ProcessFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Drives discovery: topics to queries to searches to scored, persisted
/// papers, following references of relevant papers and expanding the
/// query space once per relevant seed.
///
/// One engine is one run: its processed-set lives as long as the engine,
/// so each paper is scored at most once per engine.
pub struct DiscoveryEngine {
    source: Arc<dyn PaperSource>,
    judge: Arc<dyn RelevanceJudge>,
    store: Arc<dyn PaperStore>,
    config: DiscoveryConfig,
    processed: DashSet<PaperId>,
    cancel: CancellationToken,
}

impl DiscoveryEngine {
    pub fn new(
        source: Arc<dyn PaperSource>,
        judge: Arc<dyn RelevanceJudge>,
        store: Arc<dyn PaperStore>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            source,
            judge,
            store,
            config,
            processed: DashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Number of distinct papers processed so far
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn is_processed(&self, paper_id: &PaperId) -> bool {
        self.processed.contains(paper_id)
    }

    /// Discover papers for every topic in order.
    ///
    /// Never fails: upstream and storage errors degrade per paper or per
    /// query and are counted in the returned stats. Stops before the next
    /// topic once cancelled.
    pub async fn discover(&self, topics: &[String]) -> DiscoveryStats {
        let mut stats = DiscoveryStats::default();

        for topic in topics {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping before next topic");
                stats.cancelled = true;
                break;
            }

            info!(topic = %topic, "Processing topic");
            self.process_topic(topic, &mut stats).await;
            stats.topics_processed += 1;
        }

        stats.cancelled |= self.cancel.is_cancelled();
        stats
    }

    async fn process_topic(&self, topic: &str, stats: &mut DiscoveryStats) {
        let queries = match self.judge.generate_queries(topic).await {
            Ok(queries) if !queries.is_empty() => queries,
            Ok(_) => {
                warn!(topic, "Judge returned no queries, searching the topic itself");
                vec![topic.to_string()]
            }
            Err(e) => {
                warn!(topic, error = %e, "Query generation failed, searching the topic itself");
                stats.judge_fallbacks += 1;
                vec![topic.to_string()]
            }
        };

        for query in dedupe_queries(queries) {
            if self.cancel.is_cancelled() {
                break;
            }
            self.run_search(&query, SearchKind::Keyword, 0, stats).await;
        }
    }

    /// Collect results, record the search, then process and link each result.
    async fn run_search(
        &self,
        query: &str,
        kind: SearchKind,
        depth: u32,
        stats: &mut DiscoveryStats,
    ) {
        let results = self.collect_search_results(query).await;

        let search_id = match self.store.record_search(query, results.len(), kind) {
            Ok(id) => id,
            Err(e) => {
                error!(query, error = %e, "Failed to record search, skipping its papers");
                stats.searches_skipped += 1;
                return;
            }
        };
        stats.searches_recorded += 1;
        info!(query, kind = %kind, results = results.len(), "Search recorded");

        for paper in results {
            if self.cancel.is_cancelled() {
                break;
            }

            let paper_id = paper.paper_id.clone();
            self.process(paper, depth, false, stats).await;

            if let Err(e) = self.store.link_paper_to_search(&paper_id, search_id) {
                warn!(paper_id = %paper_id, search_id, error = %e, "Failed to link paper to search");
            }
        }
    }

    /// Page through search results up to the configured cap.
    ///
    /// Paging follows the source's `next_offset`, so records the source
    /// dropped while normalizing do not end collection early. A failing
    /// page ends collection; results gathered so far are kept.
    async fn collect_search_results(&self, query: &str) -> Vec<PaperMetadata> {
        let cap = self.config.search_cap();
        let mut results = Vec::new();
        let mut offset = 0;

        while results.len() < cap {
            let limit = (cap - results.len()).min(SEARCH_PAGE_SIZE);

            match self.source.search_papers(query, offset, limit).await {
                Ok(page) => {
                    results.extend(page.papers);
                    match page.next_offset {
                        Some(next) if next > offset => offset = next,
                        _ => break,
                    }
                }
                Err(e) => {
                    warn!(query, collected = results.len(), error = %e, "Search failed, keeping collected results");
                    break;
                }
            }
        }

        results.truncate(cap);
        results
    }

    /// Per-paper procedure.
    ///
    /// `detailed` marks records that already came from a detail fetch, so a
    /// paper without an abstract is not fetched twice.
    fn process<'a>(
        &'a self,
        paper: PaperMetadata,
        depth: u32,
        detailed: bool,
        stats: &'a mut DiscoveryStats,
    ) -> ProcessFuture<'a> {
        Box::pin(async move {
            // Check-and-mark in one step; a second entry for the same id stops here
            if !self.processed.insert(paper.paper_id.clone()) {
                debug!(paper_id = %paper.paper_id, "Already processed");
                return;
            }
            stats.papers_processed += 1;

            let paper = match self.complete_details(paper, detailed).await {
                Some(paper) => paper,
                None => {
                    stats.papers_abandoned += 1;
                    return;
                }
            };

            if paper.title.trim().is_empty() {
                warn!(paper_id = %paper.paper_id, "Paper has no title, abandoning");
                stats.papers_abandoned += 1;
                return;
            }

            let relevance = match paper.abstract_str() {
                Some(abstract_text) => {
                    match self
                        .judge
                        .score_relevance(&paper.title, abstract_text, paper.year)
                        .await
                    {
                        Ok(relevance) => relevance,
                        Err(e) => {
                            warn!(paper_id = %paper.paper_id, error = %e, "Relevance scoring failed, using neutral score");
                            stats.judge_fallbacks += 1;
                            fallback_relevance()
                        }
                    }
                }
                None => {
                    debug!(paper_id = %paper.paper_id, "No abstract, using neutral score");
                    no_abstract_relevance()
                }
            };
            let score = relevance.score;

            let record = PaperRecord::from_metadata(&paper, relevance);
            if let Err(e) = self.store.upsert_paper(&record) {
                error!(paper_id = %paper.paper_id, error = %e, "Failed to persist paper, abandoning its subtree");
                stats.papers_abandoned += 1;
                return;
            }
            stats.papers_persisted += 1;
            debug!(paper_id = %paper.paper_id, depth, score, "Paper persisted");

            if let Some(abstract_text) = paper.abstract_str() {
                self.refresh_concepts(&paper.paper_id, &paper.title, abstract_text)
                    .await;
            }

            if score < self.config.relevance_threshold || depth >= self.config.max_reference_depth {
                return;
            }

            info!(paper_id = %paper.paper_id, depth, score, "Relevant paper, expanding");
            self.follow_references(&paper, depth, stats).await;
            self.record_citations(&paper).await;

            if depth == 0 {
                self.expand_search_space(&paper, stats).await;
            }
        })
    }

    /// Fill in a summary that lacks an abstract. `None` abandons the paper.
    async fn complete_details(
        &self,
        paper: PaperMetadata,
        detailed: bool,
    ) -> Option<PaperMetadata> {
        if detailed || paper.abstract_str().is_some() {
            return Some(paper);
        }

        match self.source.get_paper_details(&paper.paper_id).await {
            Ok(Some(mut details)) => {
                if details.title.trim().is_empty() {
                    details.title = paper.title;
                }
                Some(details)
            }
            Ok(None) => {
                warn!(paper_id = %paper.paper_id, "Paper details not found, abandoning");
                None
            }
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "Failed to fetch paper details, abandoning");
                None
            }
        }
    }

    async fn refresh_concepts(&self, paper_id: &PaperId, title: &str, abstract_text: &str) {
        match self.judge.extract_concepts(title, abstract_text).await {
            Ok(concepts) => {
                if let Err(e) = self.store.replace_concepts(paper_id, &concepts) {
                    warn!(paper_id = %paper_id, error = %e, "Failed to store concepts");
                }
            }
            Err(e) => {
                warn!(paper_id = %paper_id, error = %e, "Concept extraction failed");
            }
        }
    }

    async fn follow_references(
        &self,
        paper: &PaperMetadata,
        depth: u32,
        stats: &mut DiscoveryStats,
    ) {
        let reference_ids = match &paper.references {
            Some(ids) => ids.clone(),
            None => match self
                .source
                .get_references(&paper.paper_id, self.config.edge_fetch_limit)
                .await
            {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(paper_id = %paper.paper_id, error = %e, "Failed to fetch references");
                    return;
                }
            },
        };

        if reference_ids.is_empty() {
            return;
        }

        if let Err(e) = self.store.add_references(&paper.paper_id, &reference_ids) {
            error!(paper_id = %paper.paper_id, error = %e, "Failed to persist references, not following them");
            return;
        }

        for reference_id in reference_ids {
            if self.processed.contains(&reference_id) {
                continue;
            }

            match self.source.get_paper_details(&reference_id).await {
                Ok(Some(details)) => self.process(details, depth + 1, true, stats).await,
                Ok(None) => {
                    debug!(paper_id = %reference_id, "Reference details not found");
                }
                Err(e) => {
                    warn!(paper_id = %reference_id, error = %e, "Failed to fetch reference details");
                }
            }
        }
    }

    /// Persist citation edges. Citing papers are not traversed.
    async fn record_citations(&self, paper: &PaperMetadata) {
        let citation_ids = match &paper.citations {
            Some(ids) => ids.clone(),
            None => match self
                .source
                .get_citations(&paper.paper_id, self.config.edge_fetch_limit)
                .await
            {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(paper_id = %paper.paper_id, error = %e, "Failed to fetch citations");
                    return;
                }
            },
        };

        if citation_ids.is_empty() {
            return;
        }

        if let Err(e) = self.store.add_citations(&paper.paper_id, &citation_ids) {
            error!(paper_id = %paper.paper_id, error = %e, "Failed to persist citations");
        }
    }

    /// One-shot fan-out of concept-derived queries for a relevant seed
    async fn expand_search_space(&self, paper: &PaperMetadata, stats: &mut DiscoveryStats) {
        let queries = match self
            .judge
            .expand_search_space(&paper.title, paper.abstract_str())
            .await
        {
            Ok(queries) => queries,
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "Search space expansion failed");
                stats.judge_fallbacks += 1;
                return;
            }
        };

        info!(paper_id = %paper.paper_id, queries = queries.len(), "Expanding search space");

        for query in queries {
            if self.cancel.is_cancelled() {
                break;
            }
            stats.expansion_queries += 1;
            self.run_search(&query, SearchKind::Expansion, 1, stats).await;
        }
    }
}
