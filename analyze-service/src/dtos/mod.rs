//! Request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

fn default_lang() -> String {
    "en".to_string()
}

/// Body of `POST /analyze`. Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub findings_text: String,

    #[serde(default)]
    pub numeric_scores: BTreeMap<String, f64>,

    #[serde(default = "default_lang")]
    #[validate(length(min = 2, max = 16))]
    pub preferred_lang: String,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            findings_text: String::new(),
            numeric_scores: BTreeMap::new(),
            preferred_lang: default_lang(),
        }
    }
}

/// Success envelope: `{ "ok": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub data: Value,
}

impl AnalyzeResponse {
    pub fn new(data: Value) -> Self {
        Self { ok: true, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let req: AnalysisRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(req.findings_text, "");
        assert!(req.numeric_scores.is_empty());
        assert_eq!(req.preferred_lang, "en");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn camel_case_fields_and_unknown_fields() {
        let req: AnalysisRequest = serde_json::from_str(
            r#"{"findingsText":"dry skin","numericScores":{"hydration":0.2},"preferredLang":"or","thumbnail64":"abc"}"#,
        )
        .unwrap();

        assert_eq!(req.findings_text, "dry skin");
        assert_eq!(req.numeric_scores["hydration"], 0.2);
        assert_eq!(req.preferred_lang, "or");
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        let result =
            serde_json::from_str::<AnalysisRequest>(r#"{"numericScores":{"redness":"high"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn overlong_language_fails_validation() {
        let req = AnalysisRequest {
            preferred_lang: "x".repeat(40),
            ..AnalysisRequest::default()
        };
        assert!(req.validate().is_err());
    }
}
