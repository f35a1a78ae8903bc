//! Axum Handlers for the REST API
//!
//! Only `/settings` lives here; the realtime endpoint is in `ws`.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{extract::State, response::Json};
use std::sync::Arc;
use voicebridge_core::{provider::SUPPORTED_PROVIDERS, settings::has_secret};

use crate::{
    models::{ProviderKeyStatus, ProviderKeys, SettingsResponse},
    state::AppState,
};

/// Report which providers the server can serve and how sessions are configured.
#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Server realtime capabilities", body = SettingsResponse)
    )
)]
pub async fn settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    let realtime = &state.config.realtime;

    Json(SettingsResponse {
        default_provider: realtime.default_provider.clone(),
        supported_realtime_providers: SUPPORTED_PROVIDERS
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        providers: ProviderKeys {
            openai: ProviderKeyStatus {
                server_key: has_secret(realtime.openai.api_key.as_ref()),
            },
            azure: ProviderKeyStatus {
                server_key: has_secret(realtime.azure.api_key.as_ref()),
            },
        },
        provider_catalog: state.catalog.raw().clone(),
        chat_system_prompt: realtime.system_prompt.clone(),
    })
}
