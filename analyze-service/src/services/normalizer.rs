//! Best-effort interpretation of model output.
//!
//! Providers are asked to answer with bare JSON, but the text that comes back
//! may be wrapped in prose, truncated, or not JSON at all. [`normalize`] never
//! fails: it returns the parsed document when it can find one and otherwise
//! hands back the original text untouched.

use serde_json::{json, Value};

/// Outcome of normalizing upstream text.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The text, or a `{ ... }` span inside it, was valid JSON.
    Parsed(Value),
    /// Nothing parseable was found; carries the original text.
    Fallback(String),
}

impl Normalized {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Normalized::Fallback(_))
    }

    /// Render as the `data` payload of the success envelope.
    pub fn into_value(self) -> Value {
        match self {
            Normalized::Parsed(value) => value,
            Normalized::Fallback(raw) => json!({ "raw": raw }),
        }
    }
}

/// Interpret raw upstream text as JSON.
///
/// 1. The whole text is tried first.
/// 2. Then the span from the first `{` to the last `}`. This is a greedy
///    match, not a brace-balancing scan, so unrelated braces in surrounding
///    prose widen the span and usually make it unparseable.
/// 3. Otherwise the text is returned as [`Normalized::Fallback`].
pub fn normalize(text: &str) -> Normalized {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Normalized::Parsed(value);
    }

    if let Some(span) = outermost_object_span(text) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Normalized::Parsed(value);
        }
    }

    Normalized::Fallback(text.to_string())
}

fn outermost_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
