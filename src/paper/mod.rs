//! Core paper data structures

mod evaluation;
mod record;
mod search;

pub use evaluation::{EvaluationRecord, SupportJudgment};
pub use record::{Author, PaperId, PaperMetadata, PaperRecord, PaperState, Relevance};
pub use search::{SearchId, SearchInvocation, SearchKind};
