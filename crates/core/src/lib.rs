//! Core logic for the voicebridge realtime relay.
//!
//! Everything here is transport-agnostic: resolving which upstream to talk to,
//! the session configuration sent to it, and the tools the model may call.
//! The WebSocket plumbing lives in the API service.

pub mod catalog;
pub mod events;
pub mod provider;
pub mod session_config;
pub mod settings;
pub mod tools;

pub use catalog::{CatalogError, ProviderCatalog};
pub use provider::{Provider, ProviderConfigError, ProviderConnectionConfig, ProviderResolver};
pub use session_config::{SessionConfigBuilder, SessionUpdate};
pub use settings::RealtimeSettings;
pub use tools::{ToolCallError, ToolDispatcher};
