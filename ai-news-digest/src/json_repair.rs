//! Recovery of JSON arrays from free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z]*\s*").expect("valid fence regex"));
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").expect("valid fence regex"));
static FLAT_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").expect("valid array regex"));

#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("no JSON array in model output")]
    NoArray,

    #[error("JSON array could not be repaired: {0}")]
    Unrecoverable(String),
}

/// A parsed array and whether it had to be cut back to its last complete object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArray<T> {
    pub items: Vec<T>,
    pub truncated: bool,
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let start = FENCE_OPEN.find(trimmed).map(|m| m.end()).unwrap_or(0);
    let body = &trimmed[start..];
    let end = FENCE_CLOSE.find(body).map(|m| m.start()).unwrap_or(body.len());
    &body[..end]
}

/// First bracketed array with no nested brackets, e.g. the `[3, 1, 7]` in
/// `"Selected: [3, 1, 7]."`.
pub fn extract_first_array(text: &str) -> Option<&str> {
    FLAT_ARRAY.find(text).map(|m| m.as_str())
}

/// Cuts `text` after its last `}` and closes the array there.
/// `None` when there is no complete object to keep.
pub fn truncate_to_last_object(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(format!("{}]", &text[start..=end]))
}

/// Parses a JSON array of objects out of model output.
///
/// Code fences and any prose before the opening bracket are ignored. When the
/// array does not parse, typically because the reply hit its token limit, it
/// is cut back to the last complete object and parsed again.
pub fn parse_object_array<T: DeserializeOwned>(raw: &str) -> Result<ParsedArray<T>, RepairError> {
    let body = strip_code_fences(raw);
    let start = body.find('[').ok_or(RepairError::NoArray)?;
    let body = &body[start..];

    let first_error = match serde_json::from_str::<Vec<T>>(body) {
        Ok(items) => return Ok(ParsedArray { items, truncated: false }),
        Err(e) => e,
    };

    let repaired = truncate_to_last_object(body)
        .ok_or_else(|| RepairError::Unrecoverable(first_error.to_string()))?;

    serde_json::from_str::<Vec<T>>(&repaired)
        .map(|items| ParsedArray { items, truncated: true })
        .map_err(|e| RepairError::Unrecoverable(format!("{} (after repair: {})", first_error, e)))
}
