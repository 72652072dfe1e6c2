//! Parsers for free-text model output
//!
//! Model answers are loosely formatted. Each parser accepts the shapes
//! models actually produce and reports `Malformed` when nothing usable is
//! found, so callers can fall back.

use super::traits::{JudgeError, JudgeResult};

/// Remove a surrounding Markdown code fence, if any
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json", "python") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}

/// Quoted strings inside a bracketed list, accepting single or double quotes
fn quoted_items(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = list.chars();

    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        let quote = c;
        let mut item = String::new();
        let mut escaped = false;
        for c in chars.by_ref() {
            if escaped {
                item.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                break;
            } else {
                item.push(c);
            }
        }
        items.push(item);
    }

    items
}

/// Parse a list of search queries.
///
/// Accepts a JSON array, a Python-style list literal, either wrapped in a
/// code fence or surrounded by prose.
pub fn parse_query_list(text: &str) -> JudgeResult<Vec<String>> {
    let body = strip_fence(text);

    let items = match serde_json::from_str::<Vec<String>>(body) {
        Ok(items) => items,
        Err(_) => {
            let span = match (body.find('['), body.rfind(']')) {
                (Some(start), Some(end)) if start < end => &body[start..=end],
                _ => return Err(JudgeError::Malformed(format!("no query list in: {}", body))),
            };
            serde_json::from_str::<Vec<String>>(span).unwrap_or_else(|_| quoted_items(span))
        }
    };

    let queries: Vec<String> = items
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if queries.is_empty() {
        return Err(JudgeError::Malformed(format!("empty query list in: {}", body)));
    }
    Ok(queries)
}

/// Leading numeric token of a value such as `8.5`, `8.5/10` or `7 (high)`
fn leading_number(value: &str) -> Option<f64> {
    let token: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+')
        .collect();
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Value of a `key: value` line, tolerating Markdown emphasis around the key
fn keyed_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let line = line.trim().trim_start_matches(['*', '-', '#', ' ']);
    let (name, value) = line.split_once(':')?;
    let name = name.trim().trim_matches('*').trim();
    if name.eq_ignore_ascii_case(key) {
        Some(value.trim().trim_start_matches('*').trim())
    } else {
        None
    }
}

/// Parse a `<key>: <number>` / `reasoning: <text>` answer.
///
/// Reasoning may continue over several lines; it ends at the next
/// `key:` line. Missing reasoning yields an empty string.
pub fn parse_scored(text: &str, key: &str) -> JudgeResult<(f64, String)> {
    let mut score = None;
    let mut reasoning: Option<Vec<&str>> = None;

    for line in strip_fence(text).lines() {
        if let Some(value) = keyed_value(line, key) {
            score = leading_number(value);
            if reasoning.is_some() {
                break;
            }
        } else if let Some(value) = keyed_value(line, "reasoning") {
            reasoning = Some(vec![value]);
        } else if let Some(lines) = reasoning.as_mut() {
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line);
            }
        }
    }

    let score = score.ok_or_else(|| JudgeError::Malformed(format!("no {} in: {}", key, text)))?;
    let reasoning = reasoning.map(|lines| lines.join(" ")).unwrap_or_default();
    Ok((score, reasoning.trim().to_string()))
}

/// Map a 0-10 model rating onto the 0-1 relevance scale
pub fn normalize_relevance(raw: f64) -> f64 {
    (raw / 10.0).clamp(0.0, 1.0)
}

/// Clamp a support level into 0-10
pub fn clamp_support(raw: f64) -> f64 {
    raw.clamp(0.0, 10.0)
}

/// Parse concept phrases written one per line in double quotes.
///
/// List markers before the quote are tolerated; unquoted lines are ignored.
pub fn parse_concepts(text: &str) -> Vec<String> {
    strip_fence(text)
        .lines()
        .filter_map(|line| {
            let line = line
                .trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || "-•*.) ".contains(c));
            let inner = line.strip_prefix('"')?.strip_suffix(['"', ','])?;
            let inner = inner.trim_end_matches('"').trim();
            (!inner.is_empty()).then(|| inner.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_list_from_json() {
        let queries = parse_query_list(r#"["graph search", " citation networks "]"#).unwrap();
        assert_eq!(queries, vec!["graph search", "citation networks"]);
    }

    #[test]
    fn query_list_from_python_literal_in_fence() {
        let text = "```python\n['learning analytics', \"AI tutors\", 'student\\'s view']\n```";
        let queries = parse_query_list(text).unwrap();
        assert_eq!(queries, vec!["learning analytics", "AI tutors", "student's view"]);
    }

    #[test]
    fn query_list_surrounded_by_prose() {
        let text = "Here are some queries:\n[\"a\", \"b\"]\nGood luck!";
        assert_eq!(parse_query_list(text).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn query_list_without_list_is_malformed() {
        assert!(matches!(
            parse_query_list("I cannot help with that."),
            Err(JudgeError::Malformed(_))
        ));
        assert!(parse_query_list("[]").is_err());
    }

    #[test]
    fn scored_answer_with_multiline_reasoning() {
        let text = "score: 8.5\nreasoning: Directly studies\nvisual feedback for students.";
        let (score, reasoning) = parse_scored(text, "score").unwrap();
        assert_eq!(score, 8.5);
        assert_eq!(reasoning, "Directly studies visual feedback for students.");
    }

    #[test]
    fn scored_answer_tolerates_markdown_and_suffixes() {
        let text = "**Support_Level:** 7/10\n**Reasoning:** Useful background.";
        let (score, reasoning) = parse_scored(text, "support_level").unwrap();
        assert_eq!(score, 7.0);
        assert_eq!(reasoning, "Useful background.");
    }

    #[test]
    fn scored_answer_without_score_is_malformed() {
        assert!(parse_scored("reasoning: no number here", "score").is_err());
        assert!(parse_scored("score: high\nreasoning: x", "score").is_err());
    }

    #[test]
    fn relevance_normalization_clamps() {
        assert_eq!(normalize_relevance(9.0), 0.9);
        assert_eq!(normalize_relevance(14.0), 1.0);
        assert_eq!(normalize_relevance(-3.0), 0.0);
        assert_eq!(clamp_support(11.0), 10.0);
    }

    #[test]
    fn concepts_one_per_line() {
        let text = "Concepts:\n\"Learning dashboards\"\n- \"Reflection\"\n1. \"Collaborative learning\",\nplain line\n\"\"";
        assert_eq!(
            parse_concepts(text),
            vec!["Learning dashboards", "Reflection", "Collaborative learning"]
        );
    }
}
