//! Support filter: re-judge stored papers and disable weak ones

use crate::judge::RelevanceJudge;
use crate::paper::{PaperRecord, PaperState};
use crate::storage::{PaperQuery, PaperStore, StorageResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default inclusive support threshold on the 0-10 scale
pub const DEFAULT_SUPPORT_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Papers evaluated and recorded
    pub processed: usize,
    /// Papers disabled for falling below the threshold
    pub filtered_out: usize,
    pub errors: usize,
}

/// Batch pass over active papers with abstracts.
///
/// Each paper gets a fresh support evaluation appended to its history.
/// Papers below the threshold are disabled, never deleted.
pub struct SupportFilter {
    judge: Arc<dyn RelevanceJudge>,
    store: Arc<dyn PaperStore>,
    support_threshold: f64,
}

impl SupportFilter {
    pub fn new(judge: Arc<dyn RelevanceJudge>, store: Arc<dyn PaperStore>) -> Self {
        Self {
            judge,
            store,
            support_threshold: DEFAULT_SUPPORT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, support_threshold: f64) -> Self {
        self.support_threshold = support_threshold;
        self
    }

    /// Evaluate every candidate. Fails only if candidates cannot be listed.
    pub async fn run(&self) -> StorageResult<FilterStats> {
        let papers = self.store.find_papers(
            &PaperQuery::new()
                .with_state(PaperState::Active)
                .with_abstract()
                .without_stubs(),
        )?;

        let total = papers.len();
        info!(total, threshold = self.support_threshold, "Evaluating papers for support");

        let mut stats = FilterStats::default();
        for (index, paper) in papers.iter().enumerate() {
            debug!(paper_id = %paper.paper_id, progress = index + 1, total, "Evaluating paper");
            self.evaluate(paper, &mut stats).await;
        }

        info!(
            processed = stats.processed,
            filtered_out = stats.filtered_out,
            errors = stats.errors,
            "Support filter finished"
        );
        Ok(stats)
    }

    async fn evaluate(&self, paper: &PaperRecord, stats: &mut FilterStats) {
        let title = paper.title.as_deref().unwrap_or_default();
        let abstract_text = paper.abstract_text.as_deref().unwrap_or_default();

        let judgment = match self
            .judge
            .evaluate_support(title, abstract_text, paper.year)
            .await
        {
            Ok(judgment) => judgment,
            Err(e) => {
                error!(paper_id = %paper.paper_id, error = %e, "Support evaluation failed");
                stats.errors += 1;
                return;
            }
        };

        if let Err(e) = self.store.append_evaluation(
            &paper.paper_id,
            judgment.support_level,
            &judgment.reasoning,
        ) {
            error!(paper_id = %paper.paper_id, error = %e, "Failed to save evaluation");
            stats.errors += 1;
            return;
        }
        stats.processed += 1;

        if judgment.support_level < self.support_threshold {
            match self.store.set_paper_state(&paper.paper_id, PaperState::Disabled) {
                Ok(_) => {
                    stats.filtered_out += 1;
                    info!(
                        paper_id = %paper.paper_id,
                        support_level = judgment.support_level,
                        "Filtered out paper"
                    );
                    debug!(paper_id = %paper.paper_id, reasoning = %judgment.reasoning, "Filter reasoning");
                }
                Err(e) => {
                    error!(paper_id = %paper.paper_id, error = %e, "Failed to disable paper");
                    stats.errors += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::MockJudge;
    use crate::paper::{PaperId, Relevance};
    use crate::storage::{OpenStore, SqliteStore};

    fn seeded_store() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, title) in [("p1", "Strong"), ("p2", "Weak")] {
            let record = PaperRecord {
                title: Some(title.to_string()),
                abstract_text: Some("An abstract".to_string()),
                relevance: Some(Relevance::new(0.8, "")),
                ..PaperRecord::stub(id)
            };
            store.upsert_paper(&record).unwrap();
        }
        // No abstract: never evaluated
        let bare = PaperRecord {
            title: Some("Bare".to_string()),
            ..PaperRecord::stub("p3")
        };
        store.upsert_paper(&bare).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn disables_papers_below_threshold() {
        let store = seeded_store();
        let judge = MockJudge::new().with_support("Strong", 8.0).with_support("Weak", 3.0);
        let filter = SupportFilter::new(Arc::new(judge), store.clone());

        let stats = filter.run().await.unwrap();

        assert_eq!(stats, FilterStats { processed: 2, filtered_out: 1, errors: 0 });
        let weak = store.get_paper(&PaperId::from("p2")).unwrap().unwrap();
        assert_eq!(weak.state, PaperState::Disabled);
        assert_eq!(store.evaluations_for(&PaperId::from("p2")).unwrap().len(), 1);
        let strong = store.get_paper(&PaperId::from("p1")).unwrap().unwrap();
        assert_eq!(strong.state, PaperState::Active);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let store = seeded_store();
        let judge = MockJudge::new().with_default_support(6.0);
        let filter = SupportFilter::new(Arc::new(judge), store.clone()).with_threshold(6.0);

        let stats = filter.run().await.unwrap();
        assert_eq!(stats.filtered_out, 0);
    }

    #[tokio::test]
    async fn failing_judge_leaves_papers_untouched() {
        let store = seeded_store();
        let filter = SupportFilter::new(Arc::new(MockJudge::failing()), store.clone());

        let stats = filter.run().await.unwrap();

        assert_eq!(stats, FilterStats { processed: 0, filtered_out: 0, errors: 2 });
        for id in ["p1", "p2"] {
            let paper = store.get_paper(&PaperId::from(id)).unwrap().unwrap();
            assert_eq!(paper.state, PaperState::Active);
            assert!(store.evaluations_for(&paper.paper_id).unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn disabled_papers_are_not_reevaluated() {
        let store = seeded_store();
        let judge = Arc::new(MockJudge::new().with_support("Strong", 8.0).with_support("Weak", 3.0));
        let filter = SupportFilter::new(judge.clone(), store.clone());

        filter.run().await.unwrap();
        let second = filter.run().await.unwrap();

        assert_eq!(second.processed, 1);
        assert_eq!(judge.calls("evaluate_support"), vec!["Strong", "Weak", "Strong"]);
    }
}
