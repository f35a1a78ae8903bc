//! Handles the `/ws` upgrade: provider resolution, then the relay session.

use super::relay::close_client;
use crate::state::AppState;
use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use voicebridge_core::ProviderConfigError;

/// Close code sent when the requested provider cannot be resolved.
pub const CLOSE_PROVIDER_CONFIG: u16 = 4001;

/// Query parameters of `/ws`. Not `Debug`: it carries the caller's API key.
#[derive(Deserialize, Default)]
pub struct RelayParams {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub deployment: Option<String>,
}

/// Axum handler to upgrade an HTTP connection to a relay session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<RelayParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let resolved = state.resolver.resolve(
        params.provider.as_deref(),
        params.api_key.as_deref(),
        params.model.as_deref(),
        params.deployment.as_deref(),
    );

    match resolved {
        Ok(connection) => {
            info!(
                provider = %connection.provider,
                model = %connection.resolved_model,
                "Realtime session requested"
            );
            let session_update = state.session_config.build(&connection);
            let relay = state.relay.clone();
            ws.on_upgrade(move |socket| async move {
                relay.run(socket, connection, session_update).await;
            })
        }
        Err(e) => {
            warn!(reason = %e, "Rejecting realtime session");
            ws.on_upgrade(move |socket| reject(socket, e))
        }
    }
}

async fn reject(socket: WebSocket, error: ProviderConfigError) {
    close_client(socket, CLOSE_PROVIDER_CONFIG, error.to_string()).await;
}
