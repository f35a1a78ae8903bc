//! Immutable realtime settings shared by every relay session.
//!
//! A `RealtimeSettings` value is built once at startup (the API service
//! derives it from the environment) and handed to the resolver and the
//! session config builder. Nothing in this crate reads the environment.

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_REALTIME_BASE_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-10-01-preview";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly and polite assistant. Be warm, helpful, and concise in your responses.";

/// Settings for the OpenAI realtime upstream.
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub api_key: Option<SecretString>,
    pub realtime_base_url: String,
    /// Model used when the client does not request one.
    pub realtime_model: Option<String>,
    pub transcription_model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            realtime_base_url: DEFAULT_OPENAI_REALTIME_BASE_URL.to_string(),
            realtime_model: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

/// Settings for the Azure OpenAI realtime upstream.
#[derive(Clone, Debug)]
pub struct AzureSettings {
    pub api_key: Option<SecretString>,
    pub endpoint: Option<String>,
    pub api_version: String,
    /// Deployment used when the client does not request one.
    pub deployment: Option<String>,
    pub transcription_model: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            deployment: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

/// Server-side voice activity detection parameters sent in `session.update`.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnDetectionSettings {
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetectionSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 600,
        }
    }
}

/// Everything the core needs to resolve providers and configure sessions.
#[derive(Clone, Debug)]
pub struct RealtimeSettings {
    /// Provider name used when the client omits one. Validated at resolution time.
    pub default_provider: String,
    pub openai: OpenAiSettings,
    pub azure: AzureSettings,
    pub system_prompt: String,
    pub turn_detection: TurnDetectionSettings,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            openai: OpenAiSettings::default(),
            azure: AzureSettings::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            turn_detection: TurnDetectionSettings::default(),
        }
    }
}

/// Returns true when the optional secret holds something other than whitespace.
pub fn has_secret(secret: Option<&SecretString>) -> bool {
    secret.is_some_and(|s| !s.expose_secret().trim().is_empty())
}
