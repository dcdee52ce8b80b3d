mod auth;
mod capi_client;
mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod processor;
mod sender;
mod store;
mod webhook_handler;
mod webhook_models;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::capi_client::CapiClient;
use crate::config::Config;
use crate::db::Database;
use crate::sender::CapiEventSender;
use crate::store::SignalStore;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, and the CAPI
/// dispatcher, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wmg_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and run migrations
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Build the CAPI dispatcher once at startup; handlers share it by
    // reference instead of lazily initializing a global client.
    let capi_client = CapiClient::new(
        config.capi_base_url.clone(),
        config.capi_access_token.clone(),
    )?;
    let sender = Arc::new(CapiEventSender::new(
        &config,
        SignalStore::new(db.pool.clone()),
        capi_client,
    ));
    if config.capi_enabled {
        tracing::info!(
            "CAPI dispatch enabled (dataset {}, {} day window)",
            config.capi_datasource_id,
            config.attribution_window_days
        );
    } else {
        tracing::info!("CAPI dispatch disabled; matched events will be gated off");
    }

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
        sender,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Management routes require the security token; the webhook does not.
    let api_routes = Router::new()
        .route(
            "/keywords",
            get(handlers::list_keywords).post(handlers::create_keyword),
        )
        .route(
            "/keywords/:id",
            get(handlers::get_keyword).put(handlers::update_keyword),
        )
        .route("/capi_events", get(handlers::list_capi_events))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_security_token,
        ));

    let webhook_routes = Router::new().route(
        "/webhook",
        post(webhook_handler::receive_webhook).get(webhook_handler::verify_webhook),
    );

    let service_routes = webhook_routes.merge(api_routes).layer(
        ServiceBuilder::new()
            // Request size limit: 2MB max payload
            .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(service_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
