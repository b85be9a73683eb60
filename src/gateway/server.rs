use super::handlers::{
    handle_chat, handle_chat_stream, handle_index, handle_interview_stream, handle_test,
};
use super::{AppState, CHAT_PATH, CHAT_STREAM_PATH, INDEX_PATH, INTERVIEW_STREAM_PATH, TEST_PATH};

use crate::config::GatewayConfig;
use crate::providers::Provider;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, StatusCode, header},
    routing::{MethodRouter, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Bind `host:port` from the config and serve until Ctrl-C.
pub async fn run_gateway(config: &GatewayConfig, provider: Arc<dyn Provider>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parse gateway bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind gateway socket")?;

    run_gateway_with_listener(listener, config, provider).await
}

/// Serve from a pre-bound listener (tests bind `127.0.0.1:0`).
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: &GatewayConfig,
    provider: Arc<dyn Provider>,
) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("get gateway listener local address")?;

    if !provider.has_credentials() {
        tracing::warn!(
            provider = provider.name(),
            "no API credential configured; every generation call will fail until GEMINI_API_KEY is set"
        );
    }

    print_gateway_banner(&local_addr.to_string());

    let app = build_app(AppState { provider }, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve HTTP gateway")?;

    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {error}");
        std::future::pending::<()>().await;
    }
}

fn print_gateway_banner(display_addr: &str) {
    println!("Gateway listening on http://{display_addr}");
    println!("  GET  {INDEX_PATH}");
    println!("  GET  {TEST_PATH}");
    println!("  POST {CHAT_PATH}");
    println!("  POST {CHAT_STREAM_PATH}");
    println!("  POST {INTERVIEW_STREAM_PATH}");
}

/// Registers `path` with and without its trailing slash.
fn route_both(router: Router<AppState>, path: &str, handler: MethodRouter<AppState>) -> Router<AppState> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == path {
        return router.route(path, handler);
    }
    router.route(path, handler.clone()).route(trimmed, handler)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::CACHE_CONTROL]);

    if origins.iter().any(|origin| origin == "*") {
        return Some(layer.allow_origin(Any));
    }
    let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    Some(layer.allow_origin(parsed))
}

pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let mut app = Router::new().route(INDEX_PATH, get(handle_index));
    app = route_both(app, TEST_PATH, get(handle_test));
    app = route_both(app, CHAT_PATH, post(handle_chat));
    app = route_both(app, CHAT_STREAM_PATH, post(handle_chat_stream));
    app = route_both(app, INTERVIEW_STREAM_PATH, post(handle_interview_stream));

    let mut app = app
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ));

    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }

    app
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_disables_cors() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn wildcard_and_explicit_origins_build_layers() {
        assert!(cors_layer(&["*".to_string()]).is_some());
        assert!(cors_layer(&["http://localhost:5173".to_string()]).is_some());
    }
}
