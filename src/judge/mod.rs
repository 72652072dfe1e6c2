//! Language-model relevance judgments
//!
//! `RelevanceJudge` is the capability contract: query generation, relevance
//! scoring, concept extraction and support evaluation. Each operation may
//! fail; the fallbacks callers substitute live next to the trait.

mod mock;
mod openai;
mod parse;
mod traits;

pub use mock::MockJudge;
pub use openai::{OpenAiJudge, DEFAULT_MODEL, OPENAI_API_URL};
pub use parse::{clamp_support, normalize_relevance, parse_concepts, parse_query_list, parse_scored};
pub use traits::{
    dedupe_queries, fallback_relevance, no_abstract_relevance, JudgeError, JudgeResult,
    RelevanceJudge, ANALYSIS_FAILED, NEUTRAL_RELEVANCE, NO_ABSTRACT,
};
