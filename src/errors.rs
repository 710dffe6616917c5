//! Error types for the Quarry crate
//!
//! This module contains all error types that can be returned by Quarry operations.

use config::ConfigError;
use query_set::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
