//! Shared helpers for analyze-service integration tests.

#![allow(dead_code)]

use analyze_service::config::AnalyzeConfig;
use analyze_service::startup::{build_router, AppState};
use analyze_service::services::UpstreamClient;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use service_core::config::Config;
use std::collections::HashMap;
use std::sync::Arc;

/// Config built from `vars` only; the process environment is never read.
pub fn test_config(vars: &[(&str, &str)]) -> AnalyzeConfig {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let common = Config { port: 0 };

    AnalyzeConfig::from_lookup(common, |k| map.get(k).cloned()).expect("test config")
}

pub fn router_with(config: AnalyzeConfig, upstream: Option<Arc<dyn UpstreamClient>>) -> Router {
    build_router(AppState::new(config, upstream))
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
