//! Provider Catalog
//!
//! A read-only description of which realtime models (OpenAI) and deployments
//! (Azure) are allowed. The catalog is parsed and validated once at startup and
//! then shared, immutable, by every session.
//!
//! The file format is a JSON document with a top-level `providers` object:
//!
//! ```json
//! {
//!   "providers": {
//!     "openai": { "models": [{ "id": "gpt-realtime-mini", "enabled": true }] },
//!     "azure": { "deployments": [{ "name": "rt-prod", "model": "gpt-4o-realtime-preview" }] }
//!   }
//! }
//! ```
//!
//! `enabled` defaults to `true` when absent. Unknown fields (labels, pricing)
//! are kept in the raw document, which `/settings` reports verbatim.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Errors raised while loading the catalog. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read provider catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Provider catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid providers.json: 'providers' must be an object")]
    MissingProviders,
    #[error("Invalid catalog entry for provider '{provider}': {message}")]
    InvalidEntry { provider: String, message: String },
}

#[derive(Debug, Deserialize)]
struct CatalogModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CatalogDeployment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderEntry {
    #[serde(default)]
    models: Vec<CatalogModel>,
    #[serde(default)]
    deployments: Vec<CatalogDeployment>,
}

/// An enabled Azure deployment together with the model it serves, if the
/// catalog names one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledDeployment {
    pub name: String,
    pub model: Option<String>,
}

/// The validated, immutable provider catalog.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    raw: Value,
    openai_models: Vec<String>,
    azure_deployments: Vec<EnabledDeployment>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProviderCatalog {
    /// A catalog with no providers. Resolution then accepts any requested model.
    pub fn empty() -> Self {
        Self {
            raw: serde_json::json!({ "providers": {} }),
            openai_models: Vec::new(),
            azure_deployments: Vec::new(),
        }
    }

    /// Parses and validates a catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_value(raw)
    }

    /// Reads and validates the catalog file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_value(raw: Value) -> Result<Self, CatalogError> {
        let providers = raw
            .get("providers")
            .and_then(Value::as_object)
            .ok_or(CatalogError::MissingProviders)?;

        let entry = |name: &str| -> Result<ProviderEntry, CatalogError> {
            match providers.get(name) {
                Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                    CatalogError::InvalidEntry {
                        provider: name.to_string(),
                        message: e.to_string(),
                    }
                }),
                None => Ok(ProviderEntry::default()),
            }
        };

        let openai_models = entry("openai")?
            .models
            .into_iter()
            .filter(|m| m.enabled != Some(false))
            .filter_map(|m| non_blank(m.id))
            .collect();

        let azure_deployments = entry("azure")?
            .deployments
            .into_iter()
            .filter(|d| d.enabled != Some(false))
            .filter_map(|d| {
                non_blank(d.name).map(|name| EnabledDeployment {
                    name,
                    model: non_blank(d.model),
                })
            })
            .collect();

        Ok(Self {
            raw,
            openai_models,
            azure_deployments,
        })
    }

    /// Enabled OpenAI model ids, in catalog order.
    pub fn enabled_models(&self) -> &[String] {
        &self.openai_models
    }

    /// Enabled Azure deployments, in catalog order.
    pub fn enabled_deployments(&self) -> &[EnabledDeployment] {
        &self.azure_deployments
    }

    pub fn find_deployment(&self, name: &str) -> Option<&EnabledDeployment> {
        self.azure_deployments.iter().find(|d| d.name == name)
    }

    /// The document as loaded, including fields the relay does not interpret.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
