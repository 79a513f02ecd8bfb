//! Server configuration module.
//!
//! Configuration is layered: built-in defaults, then an optional
//! `tally.toml` in the working directory, then `TALLY__*` environment
//! variables (`TALLY__SERVER__PORT=8080`, `TALLY__AUTH__JWT_SECRET=...`).

use std::net::SocketAddr;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Signing secret used when none is configured. Startup warns about it.
pub const DEV_JWT_SECRET: &str = "tally-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every API route is nested under.
    pub api_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3001,
            api_root: "/api".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, created on first start.
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("data/tally.db"),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_lifetime_hours: i64,
    /// Password of the `admin` account created on an empty user table.
    pub bootstrap_admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_lifetime_hours: tally_core::SESSION_LIFETIME_HOURS,
            bootstrap_admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Public upload root, served under `/uploads`.
    pub uploads_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub max_image_bytes: usize,
    /// Request body limit for multipart routes.
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            uploads_dir: PathBuf::from("public/uploads"),
            backup_dir: PathBuf::from("backups"),
            max_image_bytes: tally_core::MAX_IMAGE_BYTES,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// When false, paying an invoice fails instead of driving stock below zero.
    pub allow_negative_stock: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            allow_negative_stock: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `tally.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;

        let config: AppConfig = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("tally").required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port".to_string()));
        }
        if !self.server.api_root.starts_with('/') {
            return Err(ConfigError::InvalidValue("server.api_root".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.auth.token_lifetime_hours <= 0 {
            return Err(ConfigError::InvalidValue("auth.token_lifetime_hours".to_string()));
        }
        if self.storage.max_image_bytes > self.storage.max_upload_bytes {
            return Err(ConfigError::InvalidValue("storage.max_image_bytes".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("server.host".to_string()))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.auth.token_lifetime_hours, 24);
        assert!(config.inventory.allow_negative_stock);
        assert!(config.uses_dev_secret());
        assert_eq!(config.bind_addr().unwrap().port(), 3001);
    }

    #[test]
    fn test_rejects_relative_api_root() {
        let mut config = AppConfig::default();
        config.server.api_root = "api".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_empty_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }
}
