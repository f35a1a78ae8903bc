//! API Models
//!
//! Response bodies for the HTTP endpoints, annotated for OpenAPI generation
//! with `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq)]
pub struct ProviderKeyStatus {
    /// Whether the server holds its own API key for this provider.
    pub server_key: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ProviderKeys {
    pub openai: ProviderKeyStatus,
    pub azure: ProviderKeyStatus,
}

/// Capabilities reported to the browser client before it opens a session.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SettingsResponse {
    #[schema(example = "openai")]
    pub default_provider: String,
    #[schema(example = json!(["openai", "azure"]))]
    pub supported_realtime_providers: Vec<String>,
    pub providers: ProviderKeys,
    /// The provider catalog document, as loaded.
    #[schema(value_type = Object)]
    pub provider_catalog: serde_json::Value,
    pub chat_system_prompt: String,
}
