//! Upstream generative-AI providers.
//!
//! The relay only needs one operation from a provider: send a prompt, get the
//! model's text back. [`UpstreamClient`] captures that so the handler can be
//! wired to Gemini, a generic completion endpoint, or a mock in tests.

pub mod completion;
pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("Upstream returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    /// The request never produced a readable response.
    #[error("Network error: {0}")]
    Transport(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Upstream { status, detail } => AppError::BadGateway {
                message: "Gemini upstream error".to_string(),
                status: Some(status),
                detail: Some(detail),
            },
            ProviderError::Transport(detail) => AppError::BadGateway {
                message: "Gemini upstream error".to_string(),
                status: None,
                detail: Some(detail),
            },
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 400,
        }
    }
}

/// A provider that turns a prompt into raw model text.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send `prompt` and return the model's text, which may be empty or not JSON.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Short identifier used in logs and the health payload.
    fn name(&self) -> &'static str;
}

/// First `max` characters of an upstream error body.
pub(crate) fn excerpt(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// Read a failed response into [`ProviderError::Upstream`] with a bounded detail.
pub(crate) async fn upstream_error(
    response: reqwest::Response,
    detail_max_chars: usize,
) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let detail = excerpt(&body, detail_max_chars);

    tracing::error!(status, detail = %detail, "Upstream provider returned an error");

    ProviderError::Upstream { status, detail }
}

/// First non-empty string at any of `paths`, else the document re-serialized.
pub(crate) fn first_text(response: &serde_json::Value, paths: &[&str]) -> String {
    paths
        .iter()
        .filter_map(|path| response.pointer(path))
        .filter_map(|value| value.as_str())
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| response.to_string())
}
