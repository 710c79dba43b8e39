use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use academy_gateway::controllers::{proxy::ProxyController, session::SessionController};
use academy_gateway::infrastructure::config::{Config, LogFormat};
use academy_gateway::infrastructure::http::{
    build_http_client, start_http_server, ClientConfig, CoalescingRefreshEndpoint,
    HttpRefreshEndpoint,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Academy Gateway on {}:{}",
        config.host,
        config.port
    );
    tracing::info!(
        api_base_url = %config.api_base_url,
        proxy_prefix = %config.proxy_prefix,
        default_locale = %config.default_locale,
        cookie_secure = config.cookie_secure,
        development = config.is_development(),
        "Gateway configuration loaded"
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Refresh endpoint, shared by every forwarded request
    tracing::info!("Instantiating refresh endpoint...");
    let http_refresh = Arc::new(HttpRefreshEndpoint::new(
        &config.api_base_url,
        config.refresh_timeout(),
    )?);
    let refresh_endpoint = Arc::new(CoalescingRefreshEndpoint::new(
        http_refresh,
        config.refresh_coalesce_ttl(),
    ));

    // 2. Upstream HTTP client (one connection pool for all requests)
    let client_config = ClientConfig::trusted(&config);
    let http_client = build_http_client(&client_config.context, client_config.request_timeout)?;

    // 3. Instantiate controllers
    tracing::info!("Instantiating controllers...");
    let proxy_controller = Arc::new(ProxyController::new(
        http_client,
        config.api_base_url.clone(),
        &config.proxy_prefix,
        refresh_endpoint,
        config.cookie_settings(),
    ));
    let session_controller = Arc::new(SessionController::new(config.cookie_settings()));

    // Start HTTP server with all routes
    start_http_server(config, proxy_controller, session_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "academy_gateway=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "academy_gateway=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
