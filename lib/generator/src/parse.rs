//! Extraction of a workflow draft from raw model output.
//!
//! Models wrap JSON in markdown fences, lead with prose, or nest the
//! document under a `workflow` key. All of that is tolerated; anything
//! that still is not an object with a non-empty `nodes` list is rejected.

use crate::error::GenerationError;
use flowsmith_workflow::Workflow;
use serde_json::Value as JsonValue;

/// Returns the body of the first fenced code block, if any.
fn strip_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Narrows text to the outermost `{ ... }` span.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn malformed(reason: impl Into<String>) -> GenerationError {
    GenerationError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Parses raw model output into a draft workflow.
///
/// # Errors
///
/// Returns [`GenerationError::MalformedResponse`] when no JSON object can
/// be found, the JSON is invalid, or the object has no nodes.
pub fn parse_ai_response(raw: &str) -> Result<Workflow, GenerationError> {
    let text = strip_fence(raw.trim());
    let span = object_span(text).ok_or_else(|| malformed("no JSON object in response"))?;
    let mut value: JsonValue =
        serde_json::from_str(span).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    if value.get("nodes").is_none() {
        if let Some(inner) = value.get_mut("workflow").filter(|inner| inner.is_object()) {
            value = inner.take();
        }
    }

    let has_nodes = value
        .get("nodes")
        .and_then(JsonValue::as_array)
        .is_some_and(|nodes| !nodes.is_empty());
    if !has_nodes {
        return Err(malformed("response has no nodes"));
    }

    Workflow::from_json_value(value).map_err(|e| malformed(e.to_string()))
}
