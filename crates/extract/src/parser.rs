use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::ExtractError;

fn object_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy: first '{' to last '}', across newlines.
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("object span pattern"))
}

/// Two-stage recovery of a JSON object from model output.
///
/// Stage one strips markdown code fences and tries a strict parse. Stage
/// two pattern-matches the first greedy `{...}` span and parses that. If
/// neither yields JSON the response is unrecoverable.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    if let Ok(value) = serde_json::from_str(cleaned) {
        return Ok(value);
    }

    debug!("strict JSON parse failed, attempting span recovery");
    let span = object_span()
        .find(cleaned)
        .ok_or(ExtractError::MalformedResponse)?;

    serde_json::from_str(span.as_str()).map_err(|_| ExtractError::MalformedResponse)
}

/// Pull the raw `triples` array out of a model response.
///
/// A parseable response without a `triples` array is treated as an empty
/// extraction, not an error.
pub fn parse_triples(raw: &str) -> Result<Vec<Value>, ExtractError> {
    let value = extract_json(raw)?;
    Ok(value
        .get("triples")
        .and_then(|t| t.as_array())
        .cloned()
        .unwrap_or_default())
}
