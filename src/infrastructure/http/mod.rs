pub mod client;
pub mod error;
pub mod headers;
pub mod refresh;

pub use client::{build_http_client, ApiClient, ApiRequest, ApiResponse, ClientConfig, ExecutionContext};
pub use error::ClientError;
pub use refresh::{CoalescingRefreshEndpoint, HttpRefreshEndpoint};

use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, proxy::ProxyController, session::SessionController};
use crate::infrastructure::auth::request_id_middleware;
use crate::infrastructure::config::Config;

/// Gateway routes: health checks, the forwarding path and session endpoints
pub fn build_router(
    config: &Config,
    proxy_controller: Arc<ProxyController>,
    session_controller: Arc<SessionController>,
) -> Router {
    let proxy_route = format!("{}/*path", config.proxy_prefix.trim_end_matches('/'));

    // Forwarding path (credential comes from cookies, not from the caller)
    let proxy_routes = Router::new()
        .route("/health/ready", get(health::health_ready))
        .route(&proxy_route, any(ProxyController::forward))
        .with_state(proxy_controller);

    let session_routes = Router::new()
        .route("/api/session/logout", post(SessionController::logout))
        .with_state(session_controller);

    Router::new()
        .route("/health", get(health::health))
        .merge(proxy_routes)
        .merge(session_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    proxy_controller: Arc<ProxyController>,
    session_controller: Arc<SessionController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(&config, proxy_controller, session_controller);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
