//! Batch passes over papers already in the store
//!
//! Neither pass is part of the discovery traversal. Both reuse the judge
//! and source contracts and report counters rather than failing per paper.

mod enrich;
mod filter;

pub use enrich::{EnrichStats, MetadataEnricher};
pub use filter::{FilterStats, SupportFilter, DEFAULT_SUPPORT_THRESHOLD};
