//! Best-effort recovery of a JSON value from free-form model text.
//!
//! Strategies run in order and the first one that yields a value wins:
//! direct parse of the normalized text, a bracket scan for an embedded
//! object or array, then the contents of fenced code blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::error::PipelineError;
use super::normalizer::clean_json_string;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("json fence pattern"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)```").expect("fence pattern"));

/// Text returned by the provider, or a value a caller already parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    Parsed(Value),
}

impl From<&str> for ModelOutput {
    fn from(text: &str) -> Self {
        ModelOutput::Text(text.to_string())
    }
}

impl From<String> for ModelOutput {
    fn from(text: String) -> Self {
        ModelOutput::Text(text)
    }
}

impl From<Value> for ModelOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ModelOutput::Text(text),
            other => ModelOutput::Parsed(other),
        }
    }
}

/// One way of pulling a JSON value out of normalized text.
pub struct ExtractionStrategy {
    pub name: &'static str,
    pub attempt: fn(&str) -> Option<Value>,
}

pub const STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy {
        name: "direct_parse",
        attempt: parse_direct,
    },
    ExtractionStrategy {
        name: "bracket_scan",
        attempt: scan_brackets,
    },
    ExtractionStrategy {
        name: "fenced_block",
        attempt: parse_fenced_block,
    },
];

/// Recovers a JSON value from `output`.
///
/// Objects and arrays that were already parsed are returned unchanged.
/// Fails with [`PipelineError::MalformedResponse`] carrying the original text
/// when no strategy succeeds.
pub fn safe_json_parse(output: impl Into<ModelOutput>) -> Result<Value, PipelineError> {
    let raw = match output.into() {
        ModelOutput::Parsed(value @ (Value::Object(_) | Value::Array(_))) => return Ok(value),
        ModelOutput::Parsed(other) => other.to_string(),
        ModelOutput::Text(text) => text,
    };

    let cleaned = clean_json_string(&raw);
    for strategy in STRATEGIES {
        match (strategy.attempt)(&cleaned) {
            Some(value) => {
                tracing::debug!(strategy = strategy.name, "extracted JSON from model response");
                return Ok(value);
            }
            None => tracing::debug!(strategy = strategy.name, "extraction strategy found nothing"),
        }
    }

    tracing::error!(response = %raw, "no valid JSON could be extracted from model response");
    Err(PipelineError::MalformedResponse { raw })
}

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Returns the first JSON object or array that starts at a `{` / `[` in
/// `text`, ignoring whatever follows it. Falls back to the outermost
/// first-open to last-close span.
///
/// Each start is parsed with a streaming deserializer that stops at the
/// first bad token, so stray brackets in prose cost only a few bytes each.
fn scan_brackets(text: &str) -> Option<Value> {
    let embedded = text
        .char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .find_map(|(start, _)| first_value_at(&text[start..]));
    if embedded.is_some() {
        return embedded;
    }

    [('{', '}'), ('[', ']')].into_iter().find_map(|(open, close)| {
        let start = text.find(open)?;
        let end = text.rfind(close)?;
        (end > start)
            .then(|| serde_json::from_str(&text[start..=end]).ok())
            .flatten()
    })
}

fn first_value_at(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()?
        .ok()
}

fn parse_fenced_block(text: &str) -> Option<Value> {
    [&*JSON_FENCE, &*ANY_FENCE].into_iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|body| serde_json::from_str(body.as_str().trim()).ok())
    })
}
