//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the immutable
//! configuration and the services built from it once at startup.

use crate::{config::Config, ws::relay::RelayEngine};
use std::sync::Arc;
use voicebridge_core::{
    ProviderCatalog, ProviderResolver, SessionConfigBuilder, ToolDispatcher,
};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<ProviderCatalog>,
    pub resolver: ProviderResolver,
    pub session_config: SessionConfigBuilder,
    pub relay: RelayEngine,
}

impl AppState {
    pub fn new(config: Config, catalog: ProviderCatalog, tools: ToolDispatcher) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(catalog);
        let realtime = Arc::new(config.realtime.clone());

        Self {
            resolver: ProviderResolver::new(realtime.clone(), catalog.clone()),
            session_config: SessionConfigBuilder::new(realtime, tools.definitions()),
            relay: RelayEngine::new(Arc::new(tools), config.upstream_connect_timeout),
            config,
            catalog,
        }
    }
}
