use axum::{routing::get, Router};
use nexus_leads::api::handlers::{self, AppState};
use nexus_leads::config::Config;
use nexus_leads::core::prospector::Prospector;
use nexus_leads::integrations::{ai_gateway::GeminiClient, store_client::StoreClient};
use nexus_leads::settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, persisted store settings and the two
/// API clients, loads the lead list once, then serves the dashboard API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus_leads=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Stored settings override the environment defaults unless unusable
    let defaults = Settings::new(config.store_url.clone(), config.store_api_key.clone());
    let settings = Settings::load_or_heal(&config.settings_path, &defaults)?;
    tracing::info!("Store endpoint: {}", settings.store_url);

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let store = StoreClient::new(
        settings.store_url.clone(),
        settings.store_key.clone(),
        timeout,
    )?;
    let gemini = GeminiClient::new(
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        timeout,
    )?;
    tracing::info!("✓ Model client initialized: {}", gemini.model());

    let prospector = Arc::new(Prospector::new(store, gemini));

    // Initial load of the lead list and insight
    {
        let prospector = Arc::clone(&prospector);
        tokio::spawn(async move {
            prospector.refresh().await;
        });
    }

    let app_state = Arc::new(AppState {
        config: config.clone(),
        settings,
        prospector,
    });

    // Configure rate limiter: 5 requests/second per IP, burst of 10
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let api_routes = handlers::api_routes().layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
