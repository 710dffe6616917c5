//! # Configuration Management for Quarry
//!
//! This crate provides the configuration structures shared by the Quarry
//! facade and the query core: database pool settings and query execution
//! settings.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{DatabaseConfig, QueryConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "myapp".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let query_config = QueryConfig::new(128, true);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "myapp"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [query]
//! row_buffer = 64
//! log_statements = true
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from quarry.toml or the path named by QUARRY_CONFIG
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./quarry.toml";
const CONFIG_PATH_VAR: &str = "QUARRY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// Query execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Rows the producer may read ahead of a slow consumer
    pub row_buffer: usize,
    /// Emit each compiled statement at debug level
    pub log_statements: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            row_buffer: 64,
            log_statements: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the TOML file named in .env, or the default path
    pub fn load() -> Result<Self, ConfigError> {
        let config = {
            match dotenvy::dotenv() {
                Ok(_) => {}
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }

            if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
                Self::from_file(&config_path)
            } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
                Self::from_file(DEFAULT_CONFIG_PATH)
            } else {
                Err(ConfigError::Invalid(format!(
                    "Config path must be specified in .env file as {} or in {} file",
                    CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
                )))
            }
        }?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.query.validate()
    }
}

/// First failed check, reported as `ConfigError::Invalid`
fn check(checks: &[(bool, &str)]) -> Result<(), ConfigError> {
    match checks.iter().find(|(failed, _)| *failed) {
        Some((_, reason)) => Err(ConfigError::Invalid(reason.to_string())),
        None => Ok(()),
    }
}

impl QueryConfig {
    /// Create a new query configuration
    pub fn new(row_buffer: usize, log_statements: bool) -> Self {
        Self {
            row_buffer,
            log_statements,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(&[(self.row_buffer == 0, "query.row_buffer must be at least 1")])
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(&[
            (self.host.is_empty(), "database.host is required"),
            (self.port == 0, "database.port is required"),
            (self.database.is_empty(), "database.database is required"),
            (self.username.is_empty(), "database.username is required"),
            (self.max_connections == 0, "database.max_connections must be at least 1"),
            (
                self.min_connections > self.max_connections,
                "database.min_connections exceeds database.max_connections",
            ),
            (
                self.connection_timeout_seconds == 0,
                "database.connection_timeout_seconds must be at least 1",
            ),
        ])
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}
