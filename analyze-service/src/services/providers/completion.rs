//! Client for a configured completion endpoint authenticated with a bearer key.
//!
//! Used when `GEMINI_ENDPOINT` points at a gateway exposing a plain
//! `{ prompt, max_tokens, temperature }` completion API instead of the
//! native `generateContent` surface.

use super::{first_text, upstream_error, GenerationParams, ProviderError, UpstreamClient};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

const TEXT_PATHS: &[&str] = &["/choices/0/text", "/output"];

#[derive(Debug, Clone)]
pub struct CompletionEndpointConfig {
    pub endpoint: String,
    pub api_key: SecretString,
    pub timeout: Duration,
    pub detail_max_chars: usize,
    pub params: GenerationParams,
}

pub struct CompletionEndpointClient {
    config: CompletionEndpointConfig,
    client: Client,
}

impl CompletionEndpointClient {
    pub fn new(config: CompletionEndpointConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[async_trait]
impl UpstreamClient for CompletionEndpointClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            prompt,
            max_tokens: self.config.params.max_output_tokens,
            temperature: self.config.params.temperature,
        };

        tracing::debug!(prompt_len = prompt.len(), "Sending request to completion endpoint");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(response, self.config.detail_max_chars).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(first_text(&body, TEXT_PATHS))
    }

    fn name(&self) -> &'static str {
        "completion-endpoint"
    }
}
