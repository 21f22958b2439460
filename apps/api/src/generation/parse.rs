//! Extraction of the JSON payload from free-form model replies.
//!
//! Replies may be fenced in a code block or wrapped in prose. Parsing tries the
//! whole (unfenced) reply first, then a non-greedy match bounded by the `texts`
//! array, then every object start in turn.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::llm_client::strip_json_fences;
use crate::models::ad::{AdRecord, FieldSet};

#[derive(Debug, Deserialize)]
struct TextsReply {
    texts: Vec<AdRecord>,
}

fn texts_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)\{.*?"texts"\s*:\s*\[.*?\]\s*\}"#).expect("texts object regex")
    })
}

fn first_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*?\}").expect("single object regex"))
}

/// Parses `{"texts": [...]}` out of a generation or variant reply.
/// An empty `texts` array counts as a format error.
pub fn parse_texts(raw: &str) -> Result<Vec<AdRecord>, AppError> {
    let reply: TextsReply = extract(raw, texts_object()).ok_or_else(|| AppError::response_format(raw))?;
    if reply.texts.is_empty() {
        return Err(AppError::response_format(raw));
    }
    Ok(reply.texts)
}

/// Parses a single `{headline, text, ...}` object out of a shortening reply.
pub fn parse_fields(raw: &str) -> Result<FieldSet, AppError> {
    let fields: FieldSet = extract(raw, first_object()).ok_or_else(|| AppError::response_format(raw))?;
    if fields.is_empty() {
        return Err(AppError::response_format(raw));
    }
    Ok(fields)
}

fn extract<T: DeserializeOwned>(raw: &str, candidate: &Regex) -> Option<T> {
    let unfenced = strip_json_fences(raw);
    if let Ok(value) = serde_json::from_str(unfenced) {
        return Some(value);
    }
    if let Some(found) = candidate.find(raw) {
        if let Ok(value) = serde_json::from_str(found.as_str()) {
            return Some(value);
        }
    }
    first_value_from_any_brace(raw)
}

/// Tries each `{` as the start of a JSON value, ignoring whatever follows it.
fn first_value_from_any_brace<T: DeserializeOwned>(raw: &str) -> Option<T> {
    raw.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<T>()
            .next()
            .and_then(Result::ok)
    })
}
