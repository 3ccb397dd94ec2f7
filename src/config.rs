//! Configuration management

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::token::TokenAlgorithm;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Catalog configuration
    pub catalog: CatalogConfig,
    /// CDN redirect configuration
    pub cdn: CdnConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding the repository JSON files
    pub data_dir: String,
    /// Reload the catalog when files in the data directory change
    pub hot_reload: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            hot_reload: true,
        }
    }
}

/// CDN redirect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    /// URL prefix redirect targets are built against, e.g.
    /// `https://cdn.example.com`. Empty means redirects stay relative.
    pub base_url: String,
    /// Hex-encoded shared secret for signed tokens. Empty disables signing
    /// and redirects go out bare.
    pub secret: String,
    /// Token lifetime in seconds from the moment of the redirect
    pub token_ttl_secs: u64,
    /// Digest algorithm for token HMACs
    pub algorithm: TokenAlgorithm,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret: String::new(),
            token_ttl_secs: 1800,
            algorithm: TokenAlgorithm::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (REGISTRY_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("REGISTRY_GATEWAY_").split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.catalog.data_dir, "data");
        assert!(config.catalog.hot_reload);
        assert!(config.cdn.secret.is_empty());
        assert_eq!(config.cdn.algorithm, TokenAlgorithm::Sha256);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 8080\ncdn:\n  secret: \"abc123\"\n  algorithm: sha512\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cdn.secret, "abc123");
        assert_eq!(config.cdn.algorithm, TokenAlgorithm::Sha512);
        // Untouched sections keep their defaults.
        assert_eq!(config.catalog.data_dir, "data");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
