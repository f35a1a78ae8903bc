use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use voicebridge_core::settings::{
    AzureSettings, DEFAULT_AZURE_API_VERSION, DEFAULT_OPENAI_REALTIME_BASE_URL, DEFAULT_PROVIDER,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TRANSCRIPTION_MODEL, OpenAiSettings, RealtimeSettings,
    TurnDetectionSettings,
};

/// Catalog locations tried in order when `PROVIDERS_CONFIG_PATH` is not set.
const PROVIDERS_CONFIG_CANDIDATES: [&str; 2] =
    ["config/providers.json", "services/api/config/providers.json"];

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub providers_config_path: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub upstream_connect_timeout: Duration,
    pub realtime: RealtimeSettings,
}

/// Reads a variable, treating blank values as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

fn secret_var(name: &str) -> Option<SecretString> {
    optional_var(name).map(SecretString::from)
}

fn find_providers_config(candidates: &[&str]) -> PathBuf {
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .unwrap_or_else(|| Path::new(candidates[0]))
        .to_path_buf()
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:8000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let providers_config_path = optional_var("PROVIDERS_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| find_providers_config(&PROVIDERS_CONFIG_CANDIDATES));

        let static_dir = optional_var("STATIC_DIR").map(PathBuf::from);

        let timeout_str = var_or(
            "UPSTREAM_CONNECT_TIMEOUT_SECS",
            &DEFAULT_CONNECT_TIMEOUT_SECS.to_string(),
        );
        let timeout_secs = timeout_str
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "UPSTREAM_CONNECT_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                )
            })?;

        let realtime = RealtimeSettings {
            default_provider: var_or("DEFAULT_LLM_PROVIDER", DEFAULT_PROVIDER).to_lowercase(),
            openai: OpenAiSettings {
                api_key: secret_var("OPENAI_API_KEY"),
                realtime_base_url: var_or(
                    "OPENAI_REALTIME_BASE_URL",
                    DEFAULT_OPENAI_REALTIME_BASE_URL,
                ),
                realtime_model: optional_var("OPENAI_REALTIME_MODEL"),
                transcription_model: var_or(
                    "OPENAI_TRANSCRIPTION_MODEL",
                    DEFAULT_TRANSCRIPTION_MODEL,
                ),
            },
            azure: AzureSettings {
                api_key: secret_var("AZURE_OPENAI_API_KEY"),
                endpoint: optional_var("AZURE_OPENAI_REALTIME_ENDPOINT"),
                api_version: var_or(
                    "AZURE_OPENAI_REALTIME_API_VERSION",
                    DEFAULT_AZURE_API_VERSION,
                ),
                deployment: optional_var("AZURE_OPENAI_REALTIME_DEPLOYMENT"),
                transcription_model: var_or(
                    "AZURE_OPENAI_TRANSCRIPTION_MODEL",
                    DEFAULT_TRANSCRIPTION_MODEL,
                ),
            },
            system_prompt: var_or("CHAT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            turn_detection: TurnDetectionSettings::default(),
        };

        Ok(Self {
            bind_address,
            log_level,
            providers_config_path,
            static_dir,
            upstream_connect_timeout: Duration::from_secs(timeout_secs),
            realtime,
        })
    }
}
