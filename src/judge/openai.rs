//! OpenAI chat-completions judge

use super::parse::{clamp_support, normalize_relevance, parse_concepts, parse_query_list, parse_scored};
use super::traits::{JudgeError, JudgeResult, RelevanceJudge};
use crate::paper::{Relevance, SupportJudgment};
use crate::policy::{RetryError, RetryPolicy, Transient};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You are a helpful research assistant.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Failure of a single completion attempt
#[derive(Debug)]
enum AttemptError {
    Network(reqwest::Error),
    Status { status: StatusCode, body: String },
    Decode(String),
    Empty,
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Status { status, body } => write!(f, "OpenAI API error ({}): {}", status, body),
            Self::Decode(e) => write!(f, "decode error: {}", e),
            Self::Empty => write!(f, "empty completion"),
        }
    }
}

impl Transient for AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => !e.is_builder(),
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Decode(_) => false,
            Self::Empty => true,
        }
    }
}

fn format_year(year: Option<i32>) -> String {
    year.map(|y| y.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// `RelevanceJudge` backed by an OpenAI-compatible chat completions API.
///
/// Prompts are framed around a free-text research focus so the same judge
/// serves any field of study.
pub struct OpenAiJudge {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    model: String,
    research_focus: String,
    retry: RetryPolicy,
}

impl OpenAiJudge {
    pub fn new(api_key: &str, research_focus: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            research_focus: research_focus.to_string(),
            retry: RetryPolicy::default()
                .with_backoff(Duration::from_secs(4), Duration::from_secs(10)),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn headers(&self) -> JudgeResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| JudgeError::Request(format!("invalid API key header: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// One completion with retries; returns the first choice's text.
    async fn complete(&self, operation: &str, prompt: &str) -> JudgeResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let url = &url;
        let headers = self.headers()?;
        let headers = &headers;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let request = &request;

        debug!(model = %self.model, operation, "OpenAI chat request");

        let result = self
            .retry
            .run(operation, || async move {
                let response = self
                    .http
                    .post(url)
                    .headers(headers.clone())
                    .json(request)
                    .send()
                    .await
                    .map_err(AttemptError::Network)?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::Status { status, body });
                }

                let chat: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| AttemptError::Decode(e.to_string()))?;

                chat.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .filter(|content| !content.trim().is_empty())
                    .ok_or(AttemptError::Empty)
            })
            .await;

        result.map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => JudgeError::Unavailable {
                operation: operation.to_string(),
                attempts,
                message: last.to_string(),
            },
            RetryError::Permanent(e) => JudgeError::Request(e.to_string()),
        })
    }

    fn query_prompt(&self, topic: &str) -> String {
        format!(
            "You are a research assistant with expertise in {focus}.\n\
             Generate 3-5 distinct search queries to locate academic papers pertinent to the \
             given research topic. Use diverse phrasings and synonyms and cover related concepts.\n\n\
             Research topic: {topic}\n\n\
             Output the search queries as a JSON array of strings and nothing else.",
            focus = self.research_focus,
            topic = topic,
        )
    }

    fn relevance_prompt(&self, title: &str, abstract_text: &str, year: Option<i32>) -> String {
        format!(
            "You are a research assistant evaluating academic papers for relevance to {focus}.\n\n\
             Title: {title}\nAbstract: {abstract_text}\nYear: {year}\n\n\
             Rate the relevance on a scale of 0-10 with a brief explanation.\n\n\
             Provide output in the format:\nscore: <number between 0 and 10>\nreasoning: <your explanation>",
            focus = self.research_focus,
            title = title,
            abstract_text = abstract_text,
            year = format_year(year),
        )
    }

    fn concept_prompt(&self, title: &str, abstract_text: &str) -> String {
        format!(
            "You are a research assistant analyzing academic papers on {focus}.\n\
             Extract the key concepts and themes of the following paper: techniques, frameworks, \
             theories, methods and applications.\n\n\
             Title: {title}\nAbstract: {abstract_text}\n\n\
             List the concepts ONE PER LINE, each starting and ending with a double quote. For example:\n\
             \"Concept 1\"\n\"Concept 2\"",
            focus = self.research_focus,
            title = title,
            abstract_text = abstract_text,
        )
    }

    fn support_prompt(&self, title: &str, abstract_text: &str, year: Option<i32>) -> String {
        format!(
            "You are a research assistant evaluating how well academic papers support research on {focus}.\n\n\
             Title: {title}\nAbstract: {abstract_text}\nYear: {year}\n\n\
             Evaluate the paper's contribution to this research by providing a support level between \
             0 and 10 and an explanation.\n\n\
             Format your response as:\nsupport_level: <number between 0 and 10>\nreasoning: <your explanation>",
            focus = self.research_focus,
            title = title,
            abstract_text = abstract_text,
            year = format_year(year),
        )
    }
}

#[async_trait]
impl RelevanceJudge for OpenAiJudge {
    async fn generate_queries(&self, topic: &str) -> JudgeResult<Vec<String>> {
        info!(topic, "Generating search queries");
        let response = self.complete("generate_queries", &self.query_prompt(topic)).await?;
        parse_query_list(&response)
    }

    async fn score_relevance(
        &self,
        title: &str,
        abstract_text: &str,
        year: Option<i32>,
    ) -> JudgeResult<Relevance> {
        debug!(title, "Analyzing relevance");
        let prompt = self.relevance_prompt(title, abstract_text, year);
        let response = self.complete("score_relevance", &prompt).await?;
        let (raw, reasoning) = parse_scored(&response, "score")?;
        Ok(Relevance::new(normalize_relevance(raw), reasoning))
    }

    async fn extract_concepts(&self, title: &str, abstract_text: &str) -> JudgeResult<Vec<String>> {
        debug!(title, "Extracting concepts");
        let prompt = self.concept_prompt(title, abstract_text);
        let response = self.complete("extract_concepts", &prompt).await?;

        let concepts = parse_concepts(&response);
        if concepts.is_empty() {
            warn!(title, "No concepts found in judge response");
        }
        Ok(concepts)
    }

    async fn evaluate_support(
        &self,
        title: &str,
        abstract_text: &str,
        year: Option<i32>,
    ) -> JudgeResult<SupportJudgment> {
        debug!(title, "Evaluating research support");
        let prompt = self.support_prompt(title, abstract_text, year);
        let response = self.complete("evaluate_support", &prompt).await?;
        let (raw, reasoning) = parse_scored(&response, "support_level")?;
        Ok(SupportJudgment::new(clamp_support(raw), reasoning))
    }
}
