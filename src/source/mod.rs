//! Bibliographic paper sources
//!
//! `PaperSource` is the contract the discovery engine and the enrichment
//! pass depend on. `SemanticScholarClient` is the production
//! implementation; `MockSource` serves a fixed corpus for tests.

mod mock;
mod semantic_scholar;
mod traits;
mod wire;

pub use mock::MockSource;
pub use semantic_scholar::{SemanticScholarClient, DEFAULT_BASE_URL, MAX_PAGE_SIZE};
pub use traits::{PaperSource, SearchPage, SourceError, SourceResult};
