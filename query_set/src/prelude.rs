//! Convenience re-exports for common query-set usage

// Query handle and results
pub use crate::query_set::QuerySet;
pub use crate::execution::RowStream;
pub use crate::query_builder::{CompiledQuery, Filter, Record};

// Error types
pub use crate::errors::QueryError;

// Schema description
pub use crate::schema::{ColumnDescriptor, EntityDescriptor, Relation, Table};

// Connection collaborator
pub use crate::connection::{Connection, ConnectionSource};
pub use crate::transform::Row;

// Common external dependencies that are frequently used
pub use futures::StreamExt;
pub use serde_json::{json, Value};
pub use type_mapping::{ColumnType, PostgresValue};
