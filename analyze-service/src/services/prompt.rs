//! Prompt construction for the health-assistant request.

use crate::dtos::AnalysisRequest;
use serde::Serialize;
use std::collections::BTreeMap;

/// Default cap on the serialized caller input embedded in the prompt.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptInput<'a> {
    findings_text: &'a str,
    numeric_scores: &'a BTreeMap<String, f64>,
}

/// Builds the outbound prompt from caller-supplied fields.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_input_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl PromptBuilder {
    pub fn new(max_input_chars: usize) -> Self {
        Self { max_input_chars }
    }

    pub fn build(&self, request: &AnalysisRequest) -> String {
        let input = PromptInput {
            findings_text: &request.findings_text,
            numeric_scores: &request.numeric_scores,
        };
        // Serializing a str/f64 map cannot fail; keep the prompt usable regardless.
        let serialized = serde_json::to_string(&input).unwrap_or_default();
        let input_json = truncate_chars(&serialized, self.max_input_chars);

        let language_line = match request.preferred_lang.trim() {
            "" | "en" => String::new(),
            lang => format!("Write every text value in the language with code \"{lang}\".\n"),
        };

        format!(
            r#"
You are a concise, friendly health-assistant for an educational demo.
Input (json): {input_json}

Task: Return ONLY valid JSON with keys:
{{ "summary": "...", "suggestions": ["...","...","..."], "disclaimer":"...", "action":"..." }}
{language_line}Respond ONLY with JSON.
"#
        )
    }
}

/// First `max` characters of `s`, never splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
