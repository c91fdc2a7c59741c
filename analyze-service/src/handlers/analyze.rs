use crate::dtos::{AnalysisRequest, AnalyzeResponse};
use crate::services::{metrics, normalize, ProviderError};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::time::Instant;
use validator::Validate;

/// `POST /analyze` and `POST /api/analyze`.
///
/// Builds the prompt, calls the configured provider and relays whatever JSON
/// can be recovered from its answer. Model output that is not JSON is never an
/// error; it comes back as `{ "raw": ... }`.
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let Some(upstream) = state.upstream.as_ref() else {
        tracing::error!("Analyze request rejected: GEMINI_API_KEY missing");
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Server not configured: GEMINI_API_KEY missing"
        )));
    };

    let body = body.map_err(body_error)?;
    let request = parse_request(&body)?;
    request.validate()?;

    let prompt = state.prompt_builder.build(&request);

    let started = Instant::now();
    let raw_text = upstream.generate(&prompt).await.map_err(|e| {
        let error_type = match &e {
            ProviderError::Upstream { .. } => "upstream_status",
            ProviderError::Transport(_) => "transport",
        };
        metrics::record_provider_error(upstream.name(), error_type);
        tracing::error!(provider = upstream.name(), error = %e, "Upstream call failed");
        e
    })?;
    metrics::record_provider_latency(upstream.name(), started.elapsed().as_secs_f64());

    let normalized = normalize(&raw_text);
    if normalized.is_fallback() {
        metrics::record_normalized("fallback");
        tracing::warn!(
            provider = upstream.name(),
            text_len = raw_text.len(),
            "Provider text was not JSON; returning raw fallback"
        );
    } else {
        metrics::record_normalized("parsed");
    }

    Ok(Json(AnalyzeResponse::new(normalized.into_value())))
}

fn body_error(rejection: BytesRejection) -> AppError {
    match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(rejection.body_text()),
        _ => AppError::BadRequest(anyhow::anyhow!(rejection.body_text())),
    }
}

/// An empty body means "all defaults", matching a bare `{}`.
fn parse_request(body: &[u8]) -> Result<AnalysisRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalysisRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e)))
}

/// Any method other than POST on the analyze routes.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// `GET /`
pub async fn index() -> &'static str {
    "Analyze backend is running. POST /analyze to call Gemini."
}
