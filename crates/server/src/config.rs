use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level server configuration, loaded from a TOML file.
///
/// Each section carries its own defaults so a deployment only needs to
/// override what it cares about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub server: HttpConfig,
    pub cache: CacheConfig,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self { server: HttpConfig::default(), cache: CacheConfig::default() }
    }
}

impl GuardrailConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.as_ref().display())))?;
        toml::from_str(&raw).map_err(|e| ServerError::Config(format!("parsing {}: {e}", path.as_ref().display())))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_owned() }
    }
}

/// Default TTL and key prefix applied to cached rulesets, lender
/// configurations, and the user authorization matrix.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub key_prefix: String,
    pub default_ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { key_prefix: String::new(), default_ttl_seconds: None }
    }
}
