//! Static provider configuration.

use serde::Deserialize;
use serde_json::json;

use super::client::StructuredValue;

/// Configuration handed to each per-alias `Configure` call.
///
/// An alias namespaces one plugin process; for cloud providers the alias is
/// the region itself, so reading resources from several regions means one
/// configured process per region. Credentials and retry settings are read
/// once at startup and reused for every alias.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider name, e.g. `aws`.
    pub name: String,
    /// Alias used when a read carries no override, e.g. the home region.
    pub default_alias: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    10
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, default_alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_alias: default_alias.into(),
            access_key: None,
            secret_key: None,
            max_retries: default_max_retries(),
        }
    }

    /// Builds the typed configuration value sent to the plugin for `alias`.
    pub fn config_value(&self, alias: &str) -> StructuredValue {
        json!({
            "region": alias,
            "access_key": self.access_key,
            "secret_key": self.secret_key,
            "max_retries": self.max_retries,
        })
    }
}
