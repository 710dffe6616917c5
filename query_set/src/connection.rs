//! Connection collaborator contract
//!
//! The core never speaks a wire protocol. It acquires a [`Connection`] from a
//! [`ConnectionSource`] and hands it a compiled statement; rows come back on a
//! [`RowChannel`] that owns the connection until the channel is dropped.

use crate::errors::EngineError;
use crate::transform::Row;
use async_trait::async_trait;
use futures::stream::BoxStream;
use type_mapping::PostgresValue;

/// Rows in engine order. Dropping the channel stops production and
/// releases the connection that produced it.
pub type RowChannel = BoxStream<'static, Result<Row, EngineError>>;

#[async_trait]
pub trait Connection: Send {
    /// Run a row-producing statement
    fn query(self: Box<Self>, sql: String, params: Vec<PostgresValue>) -> RowChannel;

    /// Run a statement for its affected-row count
    async fn execute(self: Box<Self>, sql: String, params: Vec<PostgresValue>) -> Result<u64, EngineError>;
}

#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Connection>, EngineError>;
}
