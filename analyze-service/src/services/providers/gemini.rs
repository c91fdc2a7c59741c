//! Gemini `generateContent` client.

use super::{first_text, upstream_error, GenerationParams, ProviderError, UpstreamClient};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

/// Public Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1";

/// Where the model text may live in a response, in order of preference.
const TEXT_PATHS: &[&str] = &[
    "/candidates/0/content/parts/0/text",
    "/candidates/0/output_text",
    "/output_text",
];

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    pub detail_max_chars: usize,
    pub params: GenerationParams,
}

/// Gemini text client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }

    /// URL without the key; the key is attached as a query parameter at send time.
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(&self.config.model)
        )
    }

    fn build_request<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.params.temperature,
                max_output_tokens: self.config.params.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl UpstreamClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", self.config.api_key.expose_secret().as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(response, self.config.detail_max_chars).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                ProviderError::Transport(format!("Failed to read response: {}", e.without_url()))
            })?;

        Ok(first_text(&body, TEXT_PATHS))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Gemini API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}
