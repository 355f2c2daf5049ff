use serde_json::{Map, Value};
use thiserror::Error;

/// The model's text could not be turned into a JSON object.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response is JSON but not an object")]
    NotAnObject,
}

/// Strips a surrounding markdown code fence, if any.
///
/// Handles an opening fence annotated `json` (any case) or bare, and a trailing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Turns raw model output into a JSON object, never panicking.
pub fn normalize(raw: &str) -> Result<Map<String, Value>, ParseError> {
    match serde_json::from_str::<Value>(strip_code_fence(raw))? {
        Value::Object(object) => Ok(object),
        _ => Err(ParseError::NotAnObject),
    }
}
