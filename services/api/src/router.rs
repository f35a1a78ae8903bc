//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the settings endpoint, the realtime WebSocket endpoint, the
//! OpenAPI documentation and optional static assets.

use crate::{
    handlers,
    models::{ProviderKeyStatus, ProviderKeys, SettingsResponse},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::settings),
    components(schemas(SettingsResponse, ProviderKeys, ProviderKeyStatus)),
    tags(
        (name = "Voicebridge API", description = "Realtime voice relay for hosted AI models")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let static_dir = app_state.config.static_dir.clone();

    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/settings", get(handlers::settings))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router);

    // Static assets are registered last so they never shadow API routes.
    match static_dir {
        Some(dir) if dir.is_dir() => router.fallback_service(ServeDir::new(dir)),
        Some(dir) => {
            warn!(static_dir = %dir.display(), "STATIC_DIR is not a directory; not serving assets");
            router
        }
        None => router,
    }
}
