//! Reply parsing: fenced or raw JSON into typed reply shapes

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern must compile")
});

/// Strip an optional fenced code block; otherwise return the trimmed reply.
pub fn extract_json(reply: &str) -> &str {
    FENCE
        .captures(reply)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| reply.trim())
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse `reply` into `T`, tolerating a surrounding fence or prose.
pub fn parse_reply<T>(reply: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let candidate = extract_json(reply);
    let first_error = match serde_json::from_str(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = outermost_object(reply).filter(|span| *span != candidate) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    Err(Error::parse(
        format!("reply did not contain the expected JSON: {first_error}"),
        reply,
    ))
}
