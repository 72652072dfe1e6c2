//! Runtime configuration
//!
//! Settings come from the environment (after an optional `.env` is loaded
//! by the binary) and are handed to components explicitly.

use crate::discovery::DiscoveryConfig;
use crate::judge::DEFAULT_MODEL;
use crate::maintenance::DEFAULT_SUPPORT_THRESHOLD;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Research focus injected into judge prompts when none is configured
pub const DEFAULT_RESEARCH_FOCUS: &str =
    "visualizing student-AI interactions and their impact on learning and collaboration";

/// Topics searched on every discovery run unless disabled
pub const DEFAULT_TOPICS: [&str; 5] = [
    "Visualization in AI Education: studies that use visualization to support reflection, \
     understanding, and analysis in AI-enhanced learning activities.",
    "Student Reflection and Progress: research on how visualizing interactions such as chat \
     data helps students reflect on their learning process and recognize areas for improvement.",
    "Comparative Analysis of Interactions: studies comparing similar student conversations or \
     AI interactions and their effect on understanding and retention.",
    "Learning Theories for Students and Instructors: how visualization shapes learning theories \
     and educational practice for both students and instructors.",
    "Interactive and Dynamic Systems: dynamic or interactive visualization systems that enhance \
     the educational experience, including their design and evaluation.",
];

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read topics file {path}: {source}")]
    TopicsFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("topics file {path} is not a JSON array of strings: {source}")]
    TopicsFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Process-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub gpt_model: String,
    pub semantic_scholar_api_key: Option<String>,
    pub research_focus: String,
    pub max_papers_per_search: usize,
    pub max_reference_depth: u32,
    pub relevance_threshold: f64,
    pub support_threshold: f64,
    pub log_level: String,
}

/// Get the default database path (~/.local/share/citewalk/citewalk.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("citewalk").join("citewalk.db")
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let discovery = DiscoveryConfig::default();

        Ok(Self {
            db_path: lookup("CITEWALK_DB")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            openai_api_key: lookup("OPENAI_API_KEY"),
            openai_base_url: lookup("OPENAI_BASE_URL"),
            gpt_model: lookup("GPT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            semantic_scholar_api_key: lookup("SEMANTIC_SCHOLAR_API_KEY"),
            research_focus: lookup("CITEWALK_RESEARCH_FOCUS")
                .unwrap_or_else(|| DEFAULT_RESEARCH_FOCUS.to_string()),
            max_papers_per_search: parse_var(
                &lookup,
                "MAX_PAPERS_PER_SEARCH",
                discovery.max_papers_per_search,
            )?,
            max_reference_depth: parse_var(
                &lookup,
                "MAX_REFERENCE_DEPTH",
                discovery.max_reference_depth,
            )?,
            relevance_threshold: parse_var(
                &lookup,
                "RELEVANCE_THRESHOLD",
                discovery.relevance_threshold,
            )?,
            support_threshold: parse_var(&lookup, "SUPPORT_THRESHOLD", DEFAULT_SUPPORT_THRESHOLD)?,
            log_level: lookup("LOG_LEVEL")
                .map(|level| log_filter_directive(&level).map(|_| level))
                .transpose()?
                .unwrap_or_else(|| "INFO".to_string()),
        })
    }

    /// The OpenAI key, required by every command that calls the judge
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::default()
            .with_max_papers_per_search(self.max_papers_per_search)
            .with_max_reference_depth(self.max_reference_depth)
            .with_relevance_threshold(self.relevance_threshold)
    }
}

/// Built-in topic list
pub fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}

/// Read additional topics from a JSON array of strings. Blank entries are dropped.
pub fn load_topics_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::TopicsFile {
        path: path.to_path_buf(),
        source,
    })?;

    let topics: Vec<String> =
        serde_json::from_str(&content).map_err(|source| ConfigError::TopicsFormat {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Map a log level name (DEBUG, INFO, WARNING, ERROR) to a tracing filter directive.
///
/// Unknown names are rejected; `EnvFilter` would otherwise read them as a
/// target and silence everything else.
pub fn log_filter_directive(level: &str) -> Result<&'static str, ConfigError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" | "critical" => Ok("error"),
        _ => Err(ConfigError::InvalidValue {
            key: "LOG_LEVEL",
            value: level.to_string(),
        }),
    }
}
