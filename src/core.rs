//! Core Quarry functionality
//!
//! This module contains the main Quarry struct, which owns the connection
//! pool and hands out lazy query sets bound to it.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::QuarryError;
use crate::postgres::PgSource;
use config::{AppConfig, DatabaseConfig, QueryConfig};
use query_set::{EntityDescriptor, QuerySet};

/// Main Quarry coordinator that manages the database pool
pub struct Quarry {
    source: Arc<PgSource>,
    config: QueryConfig,
}

impl Quarry {
    /// Create new Quarry with database connection and default query settings
    pub async fn new(config: DatabaseConfig) -> Result<Self, QuarryError> {
        Self::connect(&config, QueryConfig::default()).await
    }

    /// Create new Quarry from a complete application configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, QuarryError> {
        config.query.validate()?;
        Self::connect(&config.database, config.query).await
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: PgPool, config: QueryConfig) -> Self {
        Self {
            source: Arc::new(PgSource::new(pool, config.row_buffer)),
            config,
        }
    }

    async fn connect(database: &DatabaseConfig, query: QueryConfig) -> Result<Self, QuarryError> {
        let connection_string = database.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        debug_log!(
            "[CONNECT] {}:{}/{} (max {} connections)",
            database.host,
            database.port,
            database.database,
            database.max_connections
        );

        Ok(Self::with_pool(pool, query))
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        self.source.pool()
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.config
    }

    /// Start a query chain over `entity`
    pub fn query(&self, entity: Arc<dyn EntityDescriptor>) -> QuerySet {
        QuerySet::new(entity, self.source.clone()).with_config(self.config.clone())
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), QuarryError> {
        sqlx::query("SELECT 1").fetch_one(self.pool()).await?;
        Ok(())
    }
}
