//! Convenience re-exports for common Quarry usage
//!
//! This prelude module re-exports the most commonly used items from the Quarry workspace,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use quarry::prelude::*;
//!
//! // Now you have access to the query set, schema and config types
//! ```

// Core Quarry components
pub use crate::core::Quarry;
pub use crate::errors::QuarryError;
pub use crate::postgres::PgSource;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, QueryConfig};

// Query handle, schema description and connection contract
pub use query_set::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{PgPool, Postgres};
