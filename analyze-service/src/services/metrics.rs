//! Metrics collection and Prometheus export.
//!
//! HTTP request counters come from `service_core::middleware::metrics`; the
//! helpers here record relay-specific outcomes.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_provider_latency(provider: &str, duration_secs: f64) {
    histogram!("analyze_provider_latency_seconds", "provider" => provider.to_string())
        .record(duration_secs);
}

pub fn record_provider_error(provider: &str, error_type: &str) {
    counter!(
        "analyze_provider_errors_total",
        "provider" => provider.to_string(),
        "type" => error_type.to_string()
    )
    .increment(1);
}

/// `outcome` is `parsed` or `fallback`.
pub fn record_normalized(outcome: &'static str) {
    counter!("analyze_responses_total", "outcome" => outcome).increment(1);
}
