//! Pulls question payloads out of free-form model output.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Question;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fenced block pattern is valid")
});

/// Why a response could not be decoded at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unexpected top-level JSON value: {0}")]
    UnexpectedShape(&'static str),
}

/// Decoded questions plus the number of entries that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub questions: Vec<Question>,
    pub dropped: usize,
}

/// Interior of the first fenced block, trimmed; the input unchanged otherwise.
#[must_use]
pub fn extract_json(raw: &str) -> &str {
    match FENCED_BLOCK.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => {
            debug!("found JSON content in fenced block");
            inner.as_str().trim()
        }
        None => raw,
    }
}

/// Decode every question in `raw`.
///
/// Accepts a top-level array of questions, an object holding a `questions`
/// array, or a single question object. Entries that fail to decode or break
/// the question invariants are dropped and counted in [`Decoded::dropped`].
///
/// # Errors
///
/// Returns `ExtractError` when the text is not JSON or the top-level value is
/// neither an array nor an object.
pub fn decode_questions(raw: &str) -> Result<Decoded, ExtractError> {
    let value: Value = serde_json::from_str(extract_json(raw))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ExtractError::UnexpectedShape("non-array questions")),
            None => vec![Value::Object(map)],
        },
        Value::Null => return Err(ExtractError::UnexpectedShape("null")),
        Value::Bool(_) => return Err(ExtractError::UnexpectedShape("boolean")),
        Value::Number(_) => return Err(ExtractError::UnexpectedShape("number")),
        Value::String(_) => return Err(ExtractError::UnexpectedShape("string")),
    };

    let mut decoded = Decoded::default();
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Question>(item) {
            Ok(question) => decoded.questions.push(question),
            Err(err) => {
                warn!(index = idx, error = %err, "dropping malformed question");
                decoded.dropped += 1;
            }
        }
    }
    Ok(decoded)
}

/// Lenient variant of [`decode_questions`]: any failure yields an empty list.
#[must_use]
pub fn parse_questions(raw: &str) -> Vec<Question> {
    match decode_questions(raw) {
        Ok(decoded) => {
            debug!(
                parsed = decoded.questions.len(),
                dropped = decoded.dropped,
                "decoded questions"
            );
            decoded.questions
        }
        Err(err) => {
            warn!(error = %err, "could not decode questions from response");
            debug!(raw = %raw.chars().take(500).collect::<String>(), "raw response");
            Vec::new()
        }
    }
}
