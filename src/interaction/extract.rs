//! Best-effort extraction of the event JSON from a model answer.
//!
//! Models like to wrap JSON in markdown fences or chat around it. The extractor
//! walks a fixed sequence of stages, stopping at the first one that applies:
//!
//! 1. [`JsonSource::FencedJson`]: the first "```json" block.
//! 2. [`JsonSource::FencedPlain`]: the first "```" block.
//! 3. [`JsonSource::BareObject`]: the whole (trimmed) text, if it looks like `{...}`.
//!
//! Whatever the stage yields is parsed as-is; malformed JSON is never repaired.

use serde_json::Value;
use tracing::debug;

use crate::base::types::{EventRecord, ParsedEvent};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Keys an event must carry (as strings) to be forwarded.
pub const REQUIRED_KEYS: [&str; 3] = ["title", "start_datetime", "end_datetime"];

/// Where the JSON candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSource {
    FencedJson,
    FencedPlain,
    BareObject,
}

/// Reasons the model answer could not be turned into a [`ParsedEvent`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON found in the model response")]
    NoJson,
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("event is missing required fields: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
    #[error("event has invalid fields: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Stage 1: the content after the first "```json" marker, up to the next fence.
pub fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();

    Some(until_fence(&text[start..]))
}

/// Stage 2: the content of the first "```" fence pair.
///
/// An info string (e.g. `JSON` or `javascript`) on the fence line is dropped.
pub fn fenced_plain(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let body = until_fence(&text[start..]);

    match body.split_once('\n') {
        Some((first, rest)) if is_info_string(first) => Some(rest),
        _ => Some(body),
    }
}

/// Stage 3: the trimmed text itself, if it is brace-delimited.
pub fn bare_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    (trimmed.starts_with('{') && trimmed.ends_with('}')).then_some(trimmed)
}

/// Run the stages in order and return the first candidate found.
pub fn locate_json(text: &str) -> Option<(JsonSource, &str)> {
    fenced_json(text)
        .map(|s| (JsonSource::FencedJson, s))
        .or_else(|| fenced_plain(text).map(|s| (JsonSource::FencedPlain, s)))
        .or_else(|| bare_object(text).map(|s| (JsonSource::BareObject, s)))
}

/// Extract and parse the event carried by a raw model answer.
pub fn extract_event(raw: &str) -> Result<ParsedEvent, ExtractError> {
    let (source, candidate) = locate_json(raw).ok_or(ExtractError::NoJson)?;
    let candidate = candidate.trim();

    if candidate.is_empty() {
        return Err(ExtractError::NoJson);
    }

    debug!(?source, "Located JSON candidate.");

    let map = match serde_json::from_str::<Value>(candidate).map_err(ExtractError::Malformed)? {
        Value::Object(map) => map,
        other => return Err(ExtractError::NotAnObject(json_kind(&other))),
    };

    if map.is_empty() {
        return Ok(ParsedEvent::Empty);
    }

    let missing = REQUIRED_KEYS.into_iter().filter(|key| !map.get(*key).is_some_and(Value::is_string)).collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(ExtractError::Incomplete { missing });
    }

    let event = serde_json::from_value::<EventRecord>(Value::Object(map)).map_err(ExtractError::Invalid)?;

    Ok(ParsedEvent::Event(event))
}

fn until_fence(rest: &str) -> &str {
    match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn is_info_string(line: &str) -> bool {
    let line = line.trim();

    !line.is_empty() && line.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
