//! HTTP-level tests for the upstream clients against a local mock server.

mod common;

use analyze_service::services::providers::completion::{
    CompletionEndpointClient, CompletionEndpointConfig,
};
use analyze_service::services::providers::gemini::{GeminiClient, GeminiConfig};
use analyze_service::services::providers::{GenerationParams, ProviderError};
use analyze_service::services::UpstreamClient;
use analyze_service::startup::build_upstream;
use axum::http::StatusCode;
use common::{body_json, post_json, router_with, test_config};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        api_key: SecretString::new("test-key".to_string()),
        model: "gemini-2.0-flash".to_string(),
        api_base: server.uri(),
        timeout: Duration::from_secs(5),
        detail_max_chars: 1000,
        params: GenerationParams::default(),
    })
    .unwrap()
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 30 }
    })
}

#[tokio::test]
async fn gemini_sends_key_as_query_and_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(r#"{"summary":"ok"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let text = gemini(&server).generate("the prompt").await.unwrap();
    assert_eq!(text, r#"{"summary":"ok"}"#);

    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["contents"][0]["parts"][0]["text"], "the prompt");
    assert_eq!(sent["generationConfig"]["maxOutputTokens"], 400);
    assert_eq!(sent["generationConfig"]["temperature"], 0.0);
}

#[tokio::test]
async fn gemini_error_detail_is_truncated() {
    let server = MockServer::start().await;
    let long_body = "x".repeat(1500);
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(long_body))
        .mount(&server)
        .await;

    let err = gemini(&server).generate("p").await.unwrap_err();

    match err {
        ProviderError::Upstream { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail.len(), 1000);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn gemini_unexpected_shape_returns_whole_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        )
        .mount(&server)
        .await;

    let text = gemini(&server).generate("p").await.unwrap();
    assert_eq!(text, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let client = GeminiClient::new(GeminiConfig {
        api_key: SecretString::new("k".to_string()),
        model: "m".to_string(),
        api_base: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_secs(2),
        detail_max_chars: 1000,
        params: GenerationParams::default(),
    })
    .unwrap();

    let err = client.generate("p").await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert!(!err.to_string().contains("key="));
}

#[tokio::test]
async fn completion_endpoint_uses_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/complete"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "choices": [{ "text": "{\"summary\":\"s\"}" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionEndpointClient::new(CompletionEndpointConfig {
        endpoint: format!("{}/v1/complete", server.uri()),
        api_key: SecretString::new("test-key".to_string()),
        timeout: Duration::from_secs(5),
        detail_max_chars: 1000,
        params: GenerationParams::default(),
    })
    .unwrap();

    let text = client.generate("prompt text").await.unwrap();
    assert_eq!(text, r#"{"summary":"s"}"#);

    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        sent,
        json!({ "prompt": "prompt text", "max_tokens": 400, "temperature": 0.0 })
    );
}

#[tokio::test]
async fn endpoint_setting_selects_completion_client() {
    let config = test_config(&[
        ("GEMINI_API_KEY", "k"),
        ("GEMINI_ENDPOINT", "https://gateway.example/complete"),
    ]);
    let upstream = build_upstream(&config).unwrap().unwrap();
    assert_eq!(upstream.name(), "completion-endpoint");

    let config = test_config(&[("GEMINI_API_KEY", "k")]);
    let upstream = build_upstream(&config).unwrap().unwrap();
    assert_eq!(upstream.name(), "gemini");

    assert!(build_upstream(&test_config(&[])).unwrap().is_none());
}

#[tokio::test]
async fn end_to_end_through_gemini_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "Sure! {\"summary\":\"fine\",\"suggestions\":[\"rest\"]} Hope that helps.",
        )))
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = test_config(&[("GEMINI_API_KEY", "test-key"), ("GEMINI_API_BASE", uri.as_str())]);
    let upstream = build_upstream(&config).unwrap();
    let app = router_with(config, upstream);

    let response = app
        .oneshot(post_json("/analyze", r#"{"findingsText":"tired eyes"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "ok": true, "data": { "summary": "fine", "suggestions": ["rest"] } })
    );
}

#[tokio::test]
async fn end_to_end_upstream_error_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = test_config(&[("GEMINI_API_KEY", "bad"), ("GEMINI_API_BASE", uri.as_str())]);
    let upstream = build_upstream(&config).unwrap();
    let app = router_with(config, upstream);

    let response = app.oneshot(post_json("/analyze", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Gemini upstream error", "status": 403, "detail": "API key not valid" })
    );
}
