//! Metadata enrichment: backfill publication details for supported papers

use super::filter::DEFAULT_SUPPORT_THRESHOLD;
use crate::paper::PaperRecord;
use crate::source::PaperSource;
use crate::storage::{MetadataUpdate, PaperStore, StorageResult};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Candidates examined
    pub processed: usize,
    /// Papers whose stored metadata was updated
    pub enriched: usize,
    /// Papers the source no longer knows
    pub missing: usize,
    pub errors: usize,
}

/// Batch pass over active papers whose latest support evaluation clears
/// the threshold. Fetches full details and merges year, venue, journal,
/// url and open-access fields into the stored record.
pub struct MetadataEnricher {
    source: Arc<dyn PaperSource>,
    store: Arc<dyn PaperStore>,
    support_threshold: f64,
}

impl MetadataEnricher {
    pub fn new(source: Arc<dyn PaperSource>, store: Arc<dyn PaperStore>) -> Self {
        Self {
            source,
            store,
            support_threshold: DEFAULT_SUPPORT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, support_threshold: f64) -> Self {
        self.support_threshold = support_threshold;
        self
    }

    pub async fn run(&self) -> StorageResult<EnrichStats> {
        let papers = self.store.papers_above_support(self.support_threshold)?;
        info!(total = papers.len(), threshold = self.support_threshold, "Enriching papers");

        let mut stats = EnrichStats::default();
        for paper in &papers {
            stats.processed += 1;
            self.enrich(paper, &mut stats).await;
        }

        info!(
            processed = stats.processed,
            enriched = stats.enriched,
            missing = stats.missing,
            errors = stats.errors,
            "Enrichment finished"
        );
        Ok(stats)
    }

    async fn enrich(&self, paper: &PaperRecord, stats: &mut EnrichStats) {
        debug!(paper_id = %paper.paper_id, "Enriching paper");

        let details = match self.source.get_paper_details(&paper.paper_id).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                warn!(paper_id = %paper.paper_id, "Paper not found at source");
                stats.missing += 1;
                return;
            }
            Err(e) => {
                error!(paper_id = %paper.paper_id, error = %e, "Failed to fetch paper details");
                stats.errors += 1;
                return;
            }
        };

        let update = MetadataUpdate::from(&details);
        if update.is_empty() {
            debug!(paper_id = %paper.paper_id, "No new metadata");
            return;
        }

        match self.store.update_metadata(&paper.paper_id, &update) {
            Ok(true) => stats.enriched += 1,
            Ok(false) => stats.missing += 1,
            Err(e) => {
                error!(paper_id = %paper.paper_id, error = %e, "Failed to update paper metadata");
                stats.errors += 1;
            }
        }
    }
}
