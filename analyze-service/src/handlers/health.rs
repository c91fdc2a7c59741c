use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Liveness probe. Reports whether a provider is configured but does not call it.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.upstream.as_ref().map(|u| u.name()),
        "configured": state.upstream.is_some(),
    }))
}

/// Prometheus scrape endpoint.
pub async fn metrics() -> impl IntoResponse {
    get_metrics()
}
