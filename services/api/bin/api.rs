//! Main Entrypoint for the Voicebridge API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading and validating the provider catalog.
//! 3. Building the shared resolver, tool dispatcher and relay engine.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::{Context, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use voicebridge_api::{config::Config, router::create_router, state::AppState};
use voicebridge_core::{ProviderCatalog, ToolDispatcher};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // Upstream realtime endpoints are wss://
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // --- 3. Load the Provider Catalog ---
    let catalog = ProviderCatalog::from_path(&config.providers_config_path)
        .context("Failed to load provider catalog")?;
    info!(
        path = %config.providers_config_path.display(),
        openai_models = catalog.enabled_models().len(),
        azure_deployments = catalog.enabled_deployments().len(),
        "Provider catalog loaded."
    );

    // --- 4. Initialize Shared Services ---
    let bind_address = config.bind_address;
    let default_provider = config.realtime.default_provider.clone();
    let app_state = Arc::new(AppState::new(config, catalog, ToolDispatcher::default()));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        default_provider = %default_provider,
        bind_address = %bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
