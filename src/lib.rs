//! Citewalk: Citation-Graph Paper Discovery
//!
//! Discovers, scores and stores academic papers relevant to a set of
//! research topics. A language-model judge turns topics into search
//! queries and rates each paper; relevant papers have their references
//! followed through the citation graph and seed new queries from their
//! concepts.
//!
//! # Core Concepts
//!
//! - **Papers**: Records keyed by the source's paper id, scored on a 0-1 relevance scale
//! - **Edges**: Reference and citation relations; missing endpoints become stub records
//! - **Searches**: Every executed query is logged and linked to the papers it surfaced
//! - **Evaluations**: Append-only support judgments used to filter stored papers
//!
//! # Example
//!
//! ```
//! use citewalk::{DiscoveryConfig, DiscoveryEngine, MockJudge, MockSource, OpenStore, SqliteStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! let engine = DiscoveryEngine::new(
//!     Arc::new(MockSource::new()),
//!     Arc::new(MockJudge::new()),
//!     store,
//!     DiscoveryConfig::default(),
//! );
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let stats = runtime.block_on(engine.discover(&["citation networks".to_string()]));
//! assert_eq!(stats.topics_processed, 1);
//! ```

pub mod config;
pub mod discovery;
pub mod judge;
pub mod maintenance;
mod paper;
pub mod policy;
pub mod source;
pub mod storage;

pub use config::{ConfigError, Settings};
pub use discovery::{CancellationToken, DiscoveryConfig, DiscoveryEngine, DiscoveryStats};
pub use judge::{JudgeError, JudgeResult, MockJudge, OpenAiJudge, RelevanceJudge};
pub use maintenance::{EnrichStats, FilterStats, MetadataEnricher, SupportFilter};
pub use paper::{
    Author, EvaluationRecord, PaperId, PaperMetadata, PaperRecord, PaperState, Relevance,
    SearchId, SearchInvocation, SearchKind, SupportJudgment,
};
pub use source::{
    MockSource, PaperSource, SearchPage, SemanticScholarClient, SourceError, SourceResult,
};
pub use storage::{
    MetadataUpdate, OpenStore, PaperQuery, PaperStore, SqliteStore, StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
