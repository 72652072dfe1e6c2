//! Citation-graph discovery
//!
//! `DiscoveryEngine` turns research topics into scored, persisted papers.
//! Traversal state is a single processed-set of paper ids; the store is
//! the only place papers and edges live.

mod cancel;
mod engine;

pub use cancel::CancellationToken;
pub use engine::{
    DiscoveryConfig, DiscoveryEngine, DiscoveryStats, SEARCH_PAGE_SIZE, SEARCH_RESULT_CEILING,
};
