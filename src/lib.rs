//! # Quarry
//!
//! A lazy, immutable query builder for PostgreSQL. Query sets chain
//! filters, ordering, slicing and row shaping without touching the
//! database; foreign-key paths in filters are joined automatically, and
//! results stream with backpressure from a pooled connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::prelude::*;
//! use std::sync::Arc;
//!
//! fn authors() -> Arc<dyn EntityDescriptor> {
//!     Table::new("authors", "Author")
//!         .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
//!         .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
//!         .into_entity()
//! }
//!
//! fn books() -> Arc<dyn EntityDescriptor> {
//!     Table::new("books", "Book")
//!         .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
//!         .with_column(ColumnDescriptor::plain("title", ColumnType::Text))
//!         .with_column(ColumnDescriptor::foreign_key(
//!             "author", "author_id", ColumnType::Integer, Relation::lazy(authors),
//!         ))
//!         .into_entity()
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "quarry".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let quarry = Quarry::new(config).await?;
//!
//!     let by_jane = quarry
//!         .query(books())
//!         .filter(Filter::new().and("author.name", "Jane"))?
//!         .order(["-title"])?;
//!
//!     for book in by_jane.slice(0..10).await? {
//!         println!("{}", book["title"]);
//!     }
//!
//!     let mut rows = by_jane.values(["title"]).stream();
//!     while let Some(row) = rows.next().await {
//!         println!("{}", row?);
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod postgres;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::Quarry;
pub use errors::QuarryError;
pub use postgres::PgSource;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, QueryConfig};

// Re-export internal crates that make up the public API
pub use query_set;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use sqlx;
pub use async_trait;
