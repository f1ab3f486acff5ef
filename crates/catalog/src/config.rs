//! Catalog configuration.

use serde::{Deserialize, Serialize};

use lode_core::{LodeError, LodeResult};

/// Which storage engine backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Column,
    PropertyGraph,
    TraversalGraph,
}

/// Credentials for backends that require authentication. The in-process
/// engines ignore them; the field is part of the external contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Address of a remote store, unused by the in-process engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl CatalogConfig {
    pub fn new(backend: BackendKind) -> Self {
        CatalogConfig {
            backend,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> LodeResult<Self> {
        toml::from_str(s).map_err(|e| LodeError::connection(format!("invalid config: {}", e)))
    }
}
