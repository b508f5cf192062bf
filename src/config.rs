//! Configuration for the triple store service
//!
//! Layering: built-in defaults, then an optional TOML file, then
//! `FABRIC__<SECTION>__<KEY>` environment variables.

use config::{ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Sqlite,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use (memory, sqlite)
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// SQLite database file
    #[serde(default = "default_path")]
    pub path: String,

    /// In-memory backend: error on unrecognized weight operators instead of
    /// matching nothing
    #[serde(default)]
    pub strict_weight_ops: bool,

    /// SQLite backend: permit re-weight without any clause
    #[serde(default = "default_allow_unfiltered_reweight")]
    pub allow_unfiltered_reweight: bool,
}

fn default_backend() -> Backend {
    Backend::Memory
}

fn default_path() -> String {
    "fabric.db".to_string()
}

fn default_allow_unfiltered_reweight() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            strict_weight_ops: false,
            allow_unfiltered_reweight: default_allow_unfiltered_reweight(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder
            .add_source(Environment::with_prefix("FABRIC").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load from a TOML file that must exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Parse TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.store.path, "fabric.db");
        assert!(!config.store.strict_weight_ops);
        assert!(config.store.allow_unfiltered_reweight);
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
            [store]
            backend = "sqlite"
            path = "/tmp/triples.db"
            allow_unfiltered_reweight = false

            [server]
            port = 9090

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, Backend::Sqlite);
        assert_eq!(config.store.path, "/tmp/triples.db");
        assert!(!config.store.allow_unfiltered_reweight);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.server.body_limit, 64 * 1024);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::from_toml_str("[store]\nbackend = \"postgres\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_optional() {
        let config = Config::load(Some(Path::new("/nonexistent/fabric.toml"))).unwrap();
        assert_eq!(config.store.backend, Backend::Memory);
    }
}
