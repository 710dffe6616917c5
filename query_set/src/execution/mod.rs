//! Execution pipeline
//!
//! Settles pending operands and acquires a connection concurrently, then
//! compiles and runs the statement. Every result, aggregate or not, is read
//! through the same [`RowStream`].

pub mod stream;


pub use stream::RowStream;

use crate::chain::{Action, ResolvedQuery};
use crate::connection::{Connection, ConnectionSource};
use crate::errors::QueryError;
use crate::query_builder::{CompiledQuery, SqlGenerator};
use crate::schema::EntityDescriptor;
use config::QueryConfig;
use futures::future;
use futures::stream::{self as futures_stream, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

type ShapedRows = BoxStream<'static, Result<Value, QueryError>>;

/// One resolved query bound to its collaborators
pub(crate) struct Execution {
    pub entity: Arc<dyn EntityDescriptor>,
    pub source: Arc<dyn ConnectionSource>,
    pub config: QueryConfig,
    pub resolved: ResolvedQuery,
}

impl Execution {
    /// Start executing lazily; nothing happens until the stream is polled
    pub fn stream(self) -> RowStream {
        RowStream::new(futures_stream::once(self.run()).try_flatten().boxed())
    }

    /// Settle operands and compile without touching a connection
    pub async fn compile(&self) -> Result<CompiledQuery, QueryError> {
        let statement = self.resolved.settle().await?;
        SqlGenerator::compile(&self.entity, &statement)
    }

    async fn prepare(&self) -> Result<(CompiledQuery, Box<dyn Connection>), QueryError> {
        let (filters, data, conn) = future::try_join3(
            self.resolved.settle_filters(),
            self.resolved.settle_data(),
            async { self.source.acquire().await.map_err(QueryError::Engine) },
        )
        .await?;

        let statement = self.resolved.statement(filters, data);
        let compiled = SqlGenerator::compile(&self.entity, &statement)?;
        if self.config.log_statements {
            debug!(
                table = self.entity.table_name(),
                action = ?statement.action,
                sql = %compiled.sql,
                params = compiled.params.len(),
                "executing statement"
            );
        }
        Ok((compiled, conn))
    }

    async fn run(self) -> Result<ShapedRows, QueryError> {
        let (CompiledQuery { sql, params }, conn) = self.prepare().await?;

        match self.resolved.action {
            Action::Update | Action::Delete => {
                let affected = conn.execute(sql, params).await.map_err(QueryError::Engine)?;
                Ok(futures_stream::once(future::ready(Ok(Value::from(affected)))).boxed())
            }
            Action::Select | Action::Insert | Action::Count => {
                let transformer = self
                    .resolved
                    .transformer
                    .clone()
                    .unwrap_or_else(|| self.entity.object_transformer());
                Ok(conn
                    .query(sql, params)
                    .map(move |row| match row {
                        Ok(row) => transformer(row).map_err(QueryError::consumer),
                        Err(err) => Err(QueryError::Engine(err)),
                    })
                    .boxed())
            }
        }
    }
}
