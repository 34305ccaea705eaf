use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cep_crm_sync::api;
use cep_crm_sync::bitrix_client::BitrixClient;
use cep_crm_sync::config::Config;
use cep_crm_sync::handlers::AppState;
use cep_crm_sync::resolver::AddressResolver;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The CEP resolver (providers, circuit breakers, result cache).
/// - The Bitrix24 client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cep_crm_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let resolver = AddressResolver::from_config(&config.providers)?;
    tracing::info!(
        "CEP resolver initialized (ViaCEP → OpenCEP → BrasilAPI, cache capacity {})",
        config.providers.cache_capacity
    );

    let bitrix = BitrixClient::new(
        config.bitrix_webhook_url.clone(),
        config.crm_fields.clone(),
        config.providers.http_timeout(),
    )?;
    tracing::info!("✓ Bitrix24 client initialized");

    let port = config.port;
    let app_state = Arc::new(AppState {
        config,
        resolver,
        bitrix,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Health check bypasses rate limiting
    let protected_routes = api::business_routes().layer(
        ServiceBuilder::new()
            // Path-only API, anything bigger than 64KB is not a legitimate request
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20 (free upstream APIs)
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    let app = api::app(app_state, protected_routes);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
