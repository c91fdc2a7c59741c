//! Application startup and lifecycle management.

use crate::config::AnalyzeConfig;
use crate::handlers;
use crate::services::providers::completion::{CompletionEndpointClient, CompletionEndpointConfig};
use crate::services::providers::gemini::{GeminiClient, GeminiConfig};
use crate::services::providers::GenerationParams;
use crate::services::{PromptBuilder, UpstreamClient};
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{
        create_ip_rate_limiter, ip_rate_limit_middleware, spawn_limiter_cleanup, IpRateLimiter,
    },
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AnalyzeConfig,
    /// `None` when no credential is configured.
    pub upstream: Option<Arc<dyn UpstreamClient>>,
    pub prompt_builder: PromptBuilder,
    pub rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: AnalyzeConfig, upstream: Option<Arc<dyn UpstreamClient>>) -> Self {
        let prompt_builder = PromptBuilder::new(config.limits.prompt_max_input_chars);
        let rate_limiter = create_ip_rate_limiter(
            config.rate_limit.requests,
            config.rate_limit.window_seconds,
        );

        Self {
            config,
            upstream,
            prompt_builder,
            rate_limiter,
        }
    }
}

/// Pick the provider implementation for `config`.
///
/// A configured `GEMINI_ENDPOINT` selects the bearer-authenticated completion
/// endpoint; otherwise the native Gemini API is used.
pub fn build_upstream(config: &AnalyzeConfig) -> Result<Option<Arc<dyn UpstreamClient>>, AppError> {
    let Some(api_key) = config.gemini.api_key.clone() else {
        tracing::warn!(
            "GEMINI_API_KEY not set; analyze requests will fail until it is configured"
        );
        return Ok(None);
    };

    let params = GenerationParams {
        max_output_tokens: config.gemini.max_output_tokens,
        ..GenerationParams::default()
    };
    let timeout = Duration::from_secs(config.gemini.timeout_seconds);
    let detail_max_chars = config.limits.upstream_detail_max_chars;

    let client_error = |e: reqwest::Error| {
        AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
    };

    let upstream: Arc<dyn UpstreamClient> = match &config.gemini.endpoint {
        Some(endpoint) => Arc::new(
            CompletionEndpointClient::new(CompletionEndpointConfig {
                endpoint: endpoint.clone(),
                api_key,
                timeout,
                detail_max_chars,
                params,
            })
            .map_err(client_error)?,
        ),
        None => Arc::new(
            GeminiClient::new(GeminiConfig {
                api_key,
                model: config.gemini.model.clone(),
                api_base: config.gemini.api_base.clone(),
                timeout,
                detail_max_chars,
                params,
            })
            .map_err(client_error)?,
        ),
    };

    tracing::info!(
        provider = upstream.name(),
        model = %config.gemini.model,
        "Initialized upstream provider"
    );

    Ok(Some(upstream))
}

/// POST runs the handler behind the rate limiter; any other method gets 405
/// without consuming quota.
fn analyze_route(limiter: IpRateLimiter) -> MethodRouter<AppState> {
    post(handlers::analyze)
        .layer(from_fn_with_state(limiter, ip_rate_limit_middleware))
        .fallback(handlers::method_not_allowed)
}

pub fn build_router(state: AppState) -> Router {
    let limiter = state.rate_limiter.clone();
    let body_limit = state.config.limits.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/analyze", analyze_route(limiter.clone()))
        .route("/api/analyze", analyze_route(limiter))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: AnalyzeConfig) -> Result<Self, AppError> {
        let upstream = build_upstream(&config)?;
        Self::build_with_upstream(config, upstream).await
    }

    /// Build with an explicit provider, bypassing provider selection.
    pub async fn build_with_upstream(
        config: AnalyzeConfig,
        upstream: Option<Arc<dyn UpstreamClient>>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            rate_limit = config.rate_limit.requests,
            rate_window_secs = config.rate_limit.window_seconds,
            "Analyze service listening"
        );

        let state = AppState::new(config, upstream);
        // Prune once per window, at least hourly.
        spawn_limiter_cleanup(
            &state.rate_limiter,
            Duration::from_secs(state.config.rate_limit.window_seconds.clamp(1, 3600)),
        );
        let router = build_router(state);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}
