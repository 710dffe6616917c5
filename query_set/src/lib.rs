//! Query Set - lazy query construction and streaming execution
//!
//! This crate holds the query core: an immutable builder chain, its
//! resolver, the SQL compiler with automatic foreign-key join discovery,
//! and a backpressured execution pipeline over a pluggable connection.

pub mod chain;
pub mod connection;
pub mod errors;
pub mod execution;
pub mod prelude;
pub mod query_builder;
pub mod query_set;
pub mod schema;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{Action, QueryNode, ResolvedQuery};
pub use connection::{Connection, ConnectionSource, RowChannel};
pub use errors::{EngineError, QueryError};
pub use execution::RowStream;
pub use query_builder::{CompiledQuery, Filter, Operator, Record, SortOrder, Window};
pub use query_set::QuerySet;
pub use schema::{ColumnDescriptor, ColumnKind, Direction, EntityDescriptor, Relation, Table, ValueCodec};
pub use transform::{Row, RowTransformer};
