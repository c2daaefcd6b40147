//! # session-config
//!
//! Layered configuration loading for the session service using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SESSION_SERVICE_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `./session-service.toml`
//! 4. User-level `~/.config/session-service/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SESSION_SERVICE_SERVER__BIND` -> `server.bind`,
//! `SESSION_SERVICE_DATABASE__PATH` -> `database.path`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use session_config::SessionServiceConfig;
//!
//! let config = SessionServiceConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! println!("listening on {}", config.server.bind);
//! ```

mod database;
mod error;
mod query;
mod server;

pub use database::{DatabaseConfig, IN_MEMORY_PATH};
pub use error::ConfigError;
pub use query::QueryConfig;
pub use server::ServerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of every environment variable read by the service.
pub const ENV_PREFIX: &str = "SESSION_SERVICE_";

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "session-service.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl SessionServiceConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`load_with_dotenv`](Self::load_with_dotenv)
    /// if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be read or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(None).extract().map_err(ConfigError::from)
    }

    /// Load configuration with an extra TOML file layered above the defaults
    /// and project file, still below environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if extraction fails.
    pub fn load_from(extra: &Path) -> Result<Self, ConfigError> {
        Self::figment(Some(extra)).extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if extraction fails.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_with_dotenv_from(None)
    }

    /// Load `.env`, then all sources with an optional explicit file layer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if extraction fails.
    pub fn load_with_dotenv_from(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::figment(extra).extract().map_err(ConfigError::from)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment(extra: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Explicit file
        if let Some(extra) = extra {
            figment = figment.merge(Toml::file(extra));
        }

        // Layer 4: Environment variables (highest priority)
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable bind address, an
    /// empty database path, or an unusable query policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        self.query.field_policy()?;
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("session-service").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(config.query.allowed_fields.is_empty());
    }

    #[test]
    fn figment_builds_without_files() {
        let figment = SessionServiceConfig::figment(None);
        let config: SessionServiceConfig = figment.extract().expect("should extract defaults");
        assert_eq!(config.query.max_depth, session_core::query::MAX_FIELD_DEPTH);
    }

    #[test]
    fn empty_database_path_is_invalid() {
        let mut config = SessionServiceConfig::default();
        config.database.path = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "database.path"
        ));
    }
}
