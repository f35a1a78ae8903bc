//! Provider Connection Resolution
//!
//! Turns the client's connection request (provider name, optional API key,
//! optional model or deployment) into a fully specified upstream connection:
//! the WebSocket URL, the authentication headers and the model actually used.
//!
//! Resolution is a pure function over `RealtimeSettings` and the
//! `ProviderCatalog`; it never touches the network.

use crate::{
    catalog::ProviderCatalog,
    settings::{AzureSettings, OpenAiSettings, RealtimeSettings},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
const OPENAI_BETA_VALUE: &str = "realtime=v1";

/// Defines the supported realtime upstream providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Azure,
}

pub const SUPPORTED_PROVIDERS: [Provider; 2] = [Provider::OpenAi, Provider::Azure];

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ProviderConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "openai" => Ok(Provider::OpenAi),
            "azure" => Ok(Provider::Azure),
            _ => Err(ProviderConfigError::UnsupportedProvider(normalized)),
        }
    }
}

/// Reasons a connection request cannot be resolved.
///
/// The `Display` text is what the client receives as the WebSocket close reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderConfigError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("API key required for provider '{0}'")]
    MissingApiKey(Provider),
    #[error("Unsupported or disabled model for provider 'openai': {0}")]
    UnsupportedModel(String),
    #[error("OPENAI_REALTIME_MODEL is not enabled in config/providers.json: {0}")]
    DefaultModelNotEnabled(String),
    #[error("No enabled OpenAI realtime model configured")]
    NoModelConfigured,
    #[error("Azure endpoint is missing (AZURE_OPENAI_REALTIME_ENDPOINT)")]
    MissingEndpoint,
    #[error("Unsupported or disabled deployment for provider 'azure': {0}")]
    UnsupportedOrDisabledDeployment(String),
    #[error("AZURE_OPENAI_REALTIME_DEPLOYMENT is not enabled in config/providers.json: {0}")]
    DefaultDeploymentNotEnabled(String),
    #[error("No enabled Azure deployment configured")]
    NoDeploymentConfigured,
}

/// The immutable result of resolution, owned by a single relay session.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConnectionConfig {
    pub provider: Provider,
    pub ws_url: String,
    pub headers: BTreeMap<String, String>,
    pub resolved_model: String,
    pub requested_model: Option<String>,
    pub requested_deployment: Option<String>,
}

// Header values carry credentials; only their names are printed.
impl fmt::Debug for ProviderConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConnectionConfig")
            .field("provider", &self.provider)
            .field("ws_url", &self.ws_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("resolved_model", &self.resolved_model)
            .field("requested_model", &self.requested_model)
            .field("requested_deployment", &self.requested_deployment)
            .finish()
    }
}

fn append_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

pub fn build_openai_ws_url(base_url: &str, model: &str) -> String {
    append_query(base_url, &format!("model={model}"))
}

/// `api-version` always precedes `deployment`.
pub fn build_azure_ws_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    let with_api_version = append_query(endpoint, &format!("api-version={api_version}"));
    append_query(&with_api_version, &format!("deployment={deployment}"))
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require_api_key(
    provider: Provider,
    caller_key: Option<&str>,
    server_key: Option<&SecretString>,
) -> Result<String, ProviderConfigError> {
    trimmed(caller_key)
        .or_else(|| trimmed(server_key.map(|k| k.expose_secret())))
        .map(str::to_string)
        .ok_or(ProviderConfigError::MissingApiKey(provider))
}

/// Resolves connection requests against the shared settings and catalog.
#[derive(Clone, Debug)]
pub struct ProviderResolver {
    settings: Arc<RealtimeSettings>,
    catalog: Arc<ProviderCatalog>,
}

impl ProviderResolver {
    pub fn new(settings: Arc<RealtimeSettings>, catalog: Arc<ProviderCatalog>) -> Self {
        Self { settings, catalog }
    }

    /// Case-insensitive provider lookup; an absent or blank name selects the
    /// configured default.
    pub fn normalize_provider(&self, raw: Option<&str>) -> Result<Provider, ProviderConfigError> {
        trimmed(raw)
            .unwrap_or(self.settings.default_provider.as_str())
            .parse()
    }

    /// Resolves a full upstream connection descriptor.
    pub fn resolve(
        &self,
        provider: Option<&str>,
        caller_api_key: Option<&str>,
        requested_model: Option<&str>,
        requested_deployment: Option<&str>,
    ) -> Result<ProviderConnectionConfig, ProviderConfigError> {
        match self.normalize_provider(provider)? {
            Provider::OpenAi => self.resolve_openai(
                &self.settings.openai,
                caller_api_key,
                trimmed(requested_model),
            ),
            Provider::Azure => self.resolve_azure(
                &self.settings.azure,
                caller_api_key,
                trimmed(requested_deployment),
            ),
        }
    }

    fn resolve_openai_model(
        &self,
        settings: &OpenAiSettings,
        requested: Option<&str>,
    ) -> Result<String, ProviderConfigError> {
        let allowed = self.catalog.enabled_models();
        let is_allowed = |id: &str| allowed.is_empty() || allowed.iter().any(|m| m == id);

        if let Some(model) = requested {
            if !is_allowed(model) {
                return Err(ProviderConfigError::UnsupportedModel(model.to_string()));
            }
            return Ok(model.to_string());
        }

        if let Some(default_model) = trimmed(settings.realtime_model.as_deref()) {
            if !is_allowed(default_model) {
                return Err(ProviderConfigError::DefaultModelNotEnabled(
                    default_model.to_string(),
                ));
            }
            return Ok(default_model.to_string());
        }

        allowed
            .first()
            .cloned()
            .ok_or(ProviderConfigError::NoModelConfigured)
    }

    fn resolve_openai(
        &self,
        settings: &OpenAiSettings,
        caller_api_key: Option<&str>,
        requested_model: Option<&str>,
    ) -> Result<ProviderConnectionConfig, ProviderConfigError> {
        let api_key = require_api_key(Provider::OpenAi, caller_api_key, settings.api_key.as_ref())?;
        let resolved_model = self.resolve_openai_model(settings, requested_model)?;

        let headers = BTreeMap::from([
            ("Authorization".to_string(), format!("Bearer {api_key}")),
            (OPENAI_BETA_HEADER.to_string(), OPENAI_BETA_VALUE.to_string()),
        ]);

        Ok(ProviderConnectionConfig {
            provider: Provider::OpenAi,
            ws_url: build_openai_ws_url(&settings.realtime_base_url, &resolved_model),
            headers,
            resolved_model,
            requested_model: requested_model.map(str::to_string),
            requested_deployment: None,
        })
    }

    /// Returns the deployment name and the model it serves.
    fn resolve_azure_deployment(
        &self,
        settings: &AzureSettings,
        requested: Option<&str>,
    ) -> Result<(String, String), ProviderConfigError> {
        let allowed = self.catalog.enabled_deployments();
        let companion = |name: &str| {
            self.catalog
                .find_deployment(name)
                .and_then(|d| d.model.clone())
                .unwrap_or_else(|| name.to_string())
        };

        if let Some(deployment) = requested {
            if !allowed.is_empty() && self.catalog.find_deployment(deployment).is_none() {
                return Err(ProviderConfigError::UnsupportedOrDisabledDeployment(
                    deployment.to_string(),
                ));
            }
            return Ok((deployment.to_string(), companion(deployment)));
        }

        if let Some(default_deployment) = trimmed(settings.deployment.as_deref()) {
            if !allowed.is_empty() && self.catalog.find_deployment(default_deployment).is_none() {
                return Err(ProviderConfigError::DefaultDeploymentNotEnabled(
                    default_deployment.to_string(),
                ));
            }
            return Ok((default_deployment.to_string(), companion(default_deployment)));
        }

        allowed
            .first()
            .map(|d| (d.name.clone(), d.model.clone().unwrap_or_else(|| d.name.clone())))
            .ok_or(ProviderConfigError::NoDeploymentConfigured)
    }

    fn resolve_azure(
        &self,
        settings: &AzureSettings,
        caller_api_key: Option<&str>,
        requested_deployment: Option<&str>,
    ) -> Result<ProviderConnectionConfig, ProviderConfigError> {
        let api_key = require_api_key(Provider::Azure, caller_api_key, settings.api_key.as_ref())?;
        let endpoint =
            trimmed(settings.endpoint.as_deref()).ok_or(ProviderConfigError::MissingEndpoint)?;

        let (deployment, resolved_model) =
            self.resolve_azure_deployment(settings, requested_deployment)?;

        let headers = BTreeMap::from([
            ("api-key".to_string(), api_key),
            (OPENAI_BETA_HEADER.to_string(), OPENAI_BETA_VALUE.to_string()),
        ]);

        Ok(ProviderConnectionConfig {
            provider: Provider::Azure,
            ws_url: build_azure_ws_url(endpoint, &deployment, &settings.api_version),
            headers,
            resolved_model,
            requested_model: None,
            requested_deployment: requested_deployment.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "providers": {
            "openai": { "models": [
                { "id": "gpt-realtime-mini" },
                { "id": "gpt-realtime" },
                { "id": "gpt-4o-realtime-preview", "enabled": false }
            ]},
            "azure": { "deployments": [
                { "name": "rt-prod", "model": "gpt-4o-realtime-preview" },
                { "name": "rt-mini" },
                { "name": "rt-off", "enabled": false }
            ]}
        }
    }"#;

    fn settings() -> RealtimeSettings {
        let mut settings = RealtimeSettings::default();
        settings.openai.api_key = Some(SecretString::from("server-openai-key"));
        settings.azure.api_key = Some(SecretString::from("server-azure-key"));
        settings.azure.endpoint =
            Some("wss://example.openai.azure.com/openai/realtime".to_string());
        settings
    }

    fn resolver(settings: RealtimeSettings, catalog: ProviderCatalog) -> ProviderResolver {
        ProviderResolver::new(Arc::new(settings), Arc::new(catalog))
    }

    fn with_catalog(settings: RealtimeSettings) -> ProviderResolver {
        resolver(settings, ProviderCatalog::from_json_str(CATALOG).unwrap())
    }

    #[test]
    fn test_provider_parsing_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" AZURE ".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!(
            "gemini".parse::<Provider>().unwrap_err(),
            ProviderConfigError::UnsupportedProvider("gemini".to_string())
        );
    }

    #[test]
    fn test_absent_provider_uses_default() {
        let r = with_catalog(settings());
        assert_eq!(r.normalize_provider(None).unwrap(), Provider::OpenAi);
        assert_eq!(r.normalize_provider(Some("")).unwrap(), Provider::OpenAi);

        let mut s = settings();
        s.default_provider = "Azure".to_string();
        let r = with_catalog(s);
        assert_eq!(r.normalize_provider(None).unwrap(), Provider::Azure);
    }

    #[test]
    fn test_unsupported_default_provider_fails() {
        let mut s = settings();
        s.default_provider = "gemini".to_string();
        let err = with_catalog(s).resolve(None, None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported provider: gemini");
    }

    #[test]
    fn test_openai_url_and_headers() {
        let config = with_catalog(settings())
            .resolve(Some("openai"), None, Some("gpt-realtime-mini"), None)
            .unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(
            config.ws_url,
            "wss://api.openai.com/v1/realtime?model=gpt-realtime-mini"
        );
        assert_eq!(
            config.headers.keys().collect::<Vec<_>>(),
            vec!["Authorization", "OpenAI-Beta"]
        );
        assert_eq!(config.headers["Authorization"], "Bearer server-openai-key");
        assert_eq!(config.headers["OpenAI-Beta"], "realtime=v1");
        assert_eq!(config.resolved_model, "gpt-realtime-mini");
        assert_eq!(config.requested_model.as_deref(), Some("gpt-realtime-mini"));
        assert_eq!(config.requested_deployment, None);
    }

    #[test]
    fn test_openai_base_url_with_existing_query() {
        let mut s = settings();
        s.openai.realtime_base_url = "wss://proxy.local/realtime?tenant=a".to_string();
        let config = with_catalog(s)
            .resolve(Some("openai"), None, Some("gpt-realtime"), None)
            .unwrap();
        assert_eq!(
            config.ws_url,
            "wss://proxy.local/realtime?tenant=a&model=gpt-realtime"
        );
    }

    #[test]
    fn test_caller_key_takes_precedence_and_is_trimmed() {
        let config = with_catalog(settings())
            .resolve(Some("openai"), Some("  caller-key  "), None, None)
            .unwrap();
        assert_eq!(config.headers["Authorization"], "Bearer caller-key");

        let config = with_catalog(settings())
            .resolve(Some("openai"), Some("   "), None, None)
            .unwrap();
        assert_eq!(config.headers["Authorization"], "Bearer server-openai-key");
    }

    #[test]
    fn test_missing_api_key() {
        let mut s = settings();
        s.openai.api_key = None;
        s.azure.api_key = Some(SecretString::from("  "));
        let r = with_catalog(s);

        assert_eq!(
            r.resolve(Some("openai"), None, None, None).unwrap_err(),
            ProviderConfigError::MissingApiKey(Provider::OpenAi)
        );
        let err = r.resolve(Some("azure"), Some(""), None, None).unwrap_err();
        assert_eq!(err.to_string(), "API key required for provider 'azure'");
    }

    #[test]
    fn test_openai_rejects_model_outside_catalog() {
        let r = with_catalog(settings());
        assert_eq!(
            r.resolve(Some("openai"), None, Some("gpt-4o-realtime-preview"), None)
                .unwrap_err(),
            ProviderConfigError::UnsupportedModel("gpt-4o-realtime-preview".to_string())
        );
        assert!(matches!(
            r.resolve(Some("openai"), None, Some("made-up"), None),
            Err(ProviderConfigError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_openai_accepts_any_model_with_empty_catalog() {
        let config = resolver(settings(), ProviderCatalog::empty())
            .resolve(Some("openai"), None, Some("anything-goes"), None)
            .unwrap();
        assert_eq!(config.resolved_model, "anything-goes");
    }

    #[test]
    fn test_openai_default_model_precedence() {
        let mut s = settings();
        s.openai.realtime_model = Some("gpt-realtime".to_string());
        let config = with_catalog(s)
            .resolve(Some("openai"), None, None, None)
            .unwrap();
        assert_eq!(config.resolved_model, "gpt-realtime");
        assert_eq!(config.requested_model, None);

        let mut s = settings();
        s.openai.realtime_model = Some("gpt-4o-realtime-preview".to_string());
        assert_eq!(
            with_catalog(s)
                .resolve(Some("openai"), None, None, None)
                .unwrap_err(),
            ProviderConfigError::DefaultModelNotEnabled("gpt-4o-realtime-preview".to_string())
        );
    }

    #[test]
    fn test_openai_falls_back_to_first_enabled_model() {
        let config = with_catalog(settings())
            .resolve(Some("openai"), None, None, None)
            .unwrap();
        assert_eq!(config.resolved_model, "gpt-realtime-mini");
    }

    #[test]
    fn test_openai_no_model_configured() {
        let err = resolver(settings(), ProviderCatalog::empty())
            .resolve(Some("openai"), None, None, None)
            .unwrap_err();
        assert_eq!(err, ProviderConfigError::NoModelConfigured);
    }

    #[test]
    fn test_azure_url_order_and_headers() {
        let config = with_catalog(settings())
            .resolve(Some("azure"), None, None, Some("rt-prod"))
            .unwrap();

        assert_eq!(config.provider, Provider::Azure);
        assert_eq!(
            config.ws_url,
            "wss://example.openai.azure.com/openai/realtime?api-version=2024-10-01-preview&deployment=rt-prod"
        );
        assert_eq!(
            config.headers.keys().collect::<Vec<_>>(),
            vec!["OpenAI-Beta", "api-key"]
        );
        assert_eq!(config.headers["api-key"], "server-azure-key");
        assert_eq!(config.resolved_model, "gpt-4o-realtime-preview");
        assert_eq!(config.requested_deployment.as_deref(), Some("rt-prod"));
        assert_eq!(config.requested_model, None);
    }

    #[test]
    fn test_azure_companion_model_falls_back_to_deployment_name() {
        let config = with_catalog(settings())
            .resolve(Some("azure"), None, None, Some("rt-mini"))
            .unwrap();
        assert_eq!(config.resolved_model, "rt-mini");
    }

    #[test]
    fn test_azure_missing_endpoint() {
        let mut s = settings();
        s.azure.endpoint = None;
        let err = with_catalog(s)
            .resolve(Some("azure"), None, None, None)
            .unwrap_err();
        assert_eq!(err, ProviderConfigError::MissingEndpoint);
        assert!(err.to_string().contains("AZURE_OPENAI_REALTIME_ENDPOINT"));
    }

    #[test]
    fn test_azure_rejects_disabled_deployment() {
        let err = with_catalog(settings())
            .resolve(Some("azure"), None, None, Some("rt-off"))
            .unwrap_err();
        assert_eq!(
            err,
            ProviderConfigError::UnsupportedOrDisabledDeployment("rt-off".to_string())
        );
    }

    #[test]
    fn test_azure_default_deployment_precedence() {
        let mut s = settings();
        s.azure.deployment = Some("rt-mini".to_string());
        let config = with_catalog(s)
            .resolve(Some("azure"), None, None, None)
            .unwrap();
        assert!(config.ws_url.ends_with("&deployment=rt-mini"));

        let mut s = settings();
        s.azure.deployment = Some("rt-off".to_string());
        assert_eq!(
            with_catalog(s)
                .resolve(Some("azure"), None, None, None)
                .unwrap_err(),
            ProviderConfigError::DefaultDeploymentNotEnabled("rt-off".to_string())
        );
    }

    #[test]
    fn test_azure_first_enabled_and_empty_catalog() {
        let config = with_catalog(settings())
            .resolve(Some("azure"), None, None, None)
            .unwrap();
        assert!(config.ws_url.ends_with("deployment=rt-prod"));
        assert_eq!(config.resolved_model, "gpt-4o-realtime-preview");

        let r = resolver(settings(), ProviderCatalog::empty());
        assert_eq!(
            r.resolve(Some("azure"), None, None, None).unwrap_err(),
            ProviderConfigError::NoDeploymentConfigured
        );
        let config = r.resolve(Some("azure"), None, None, Some("custom")).unwrap();
        assert_eq!(config.resolved_model, "custom");
    }

    #[test]
    fn test_debug_redacts_header_values() {
        let config = with_catalog(settings())
            .resolve(Some("openai"), Some("sk-secret"), None, None)
            .unwrap();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("Authorization"));
        assert!(!debug_str.contains("sk-secret"));
    }
}
