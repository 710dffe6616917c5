//! Lazy, immutable query handle
//!
//! Builder calls return a new [`QuerySet`] over a new node; nothing runs
//! until a terminal call (`all`, `get`, `count`, `stream`, a mutation) or
//! the handle itself is awaited.

use crate::chain::{Action, QueryNode, ResolvedQuery};
use crate::connection::ConnectionSource;
use crate::errors::QueryError;
use crate::execution::stream::drain;
use crate::execution::{Execution, RowStream};
use crate::query_builder::{CompiledQuery, Filter, FilterKey, JoinPlan, Record, SortKey, Window};
use crate::schema::EntityDescriptor;
use crate::transform::Row;
use config::QueryConfig;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::IntoFuture;
use std::ops::RangeBounds;
use std::sync::Arc;

#[derive(Clone)]
pub struct QuerySet {
    entity: Arc<dyn EntityDescriptor>,
    source: Arc<dyn ConnectionSource>,
    config: QueryConfig,
    node: Arc<QueryNode>,
}

impl QuerySet {
    pub fn new(entity: Arc<dyn EntityDescriptor>, source: Arc<dyn ConnectionSource>) -> Self {
        Self {
            entity,
            source,
            config: QueryConfig::default(),
            node: QueryNode::root(),
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn entity(&self) -> &Arc<dyn EntityDescriptor> {
        &self.entity
    }

    pub fn node(&self) -> &Arc<QueryNode> {
        &self.node
    }

    fn derive(&self, node: QueryNode) -> Self {
        Self {
            entity: self.entity.clone(),
            source: self.source.clone(),
            config: self.config.clone(),
            node: Arc::new(node),
        }
    }

    fn child(&self) -> QueryNode {
        QueryNode::child(&self.node)
    }

    /// Check that every path names a reachable column
    fn check_paths(&self, paths: &[Vec<String>]) -> Result<(), QueryError> {
        let plan = JoinPlan::discover(&self.entity, paths.iter().map(Vec::as_slice))?;
        for path in paths {
            plan.resolve(path)?;
        }
        Ok(())
    }

    /// Narrow by `filter`, ANDed with every filter already on the chain.
    /// Unknown fields and operators are reported here, not at execution.
    pub fn filter(&self, filter: Filter) -> Result<Self, QueryError> {
        let paths = filter
            .keys()
            .into_iter()
            .map(|key| FilterKey::parse(key).map(|k| k.path))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_paths(&paths)?;
        Ok(self.derive(self.child().with_filter(filter)))
    }

    /// [`QuerySet::filter`] from a JSON object (AND) or array (OR)
    pub fn filter_json(&self, filter: Value) -> Result<Self, QueryError> {
        self.filter(Filter::from_json(filter)?)
    }

    /// Replace the ordering; `-field` sorts descending
    pub fn order<I, S>(&self, keys: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|key| SortKey::parse(key.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let paths: Vec<_> = keys.iter().map(|key| key.path.clone()).collect();
        self.check_paths(&paths)?;
        Ok(self.derive(self.child().with_order(keys)))
    }

    /// Narrow the result window, relative to any window already applied
    pub fn slice(&self, range: impl RangeBounds<u64>) -> Self {
        self.derive(self.child().with_window(Window::from_range(range)))
    }

    /// Shape rows as objects holding only `fields`
    pub fn values<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let transformer = self.entity.values_transformer(&fields);
        self.derive(self.child().with_transformer(transformer))
    }

    /// Shape rows as arrays of `fields`, in order
    pub fn values_list<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let transformer = self.entity.values_list_transformer(&fields);
        self.derive(self.child().with_transformer(transformer))
    }

    /// Shape rows with a custom transformer
    pub fn transform<F>(&self, transformer: F) -> Self
    where
        F: Fn(Row) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.derive(self.child().with_transformer(Arc::new(transformer)))
    }

    fn execution(&self) -> Execution {
        Execution {
            entity: self.entity.clone(),
            source: self.source.clone(),
            config: self.config.clone(),
            resolved: ResolvedQuery::resolve(&self.node),
        }
    }

    /// Rows as they arrive, pulled at the consumer's pace
    pub fn stream(&self) -> RowStream {
        self.execution().stream()
    }

    /// Every row, in engine order
    pub async fn all(&self) -> Result<Vec<Value>, QueryError> {
        drain(self.stream(), Ok).await
    }

    /// Every row, deserialized into `T`
    pub async fn fetch_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, QueryError> {
        drain(self.stream(), |row| {
            serde_json::from_value(row).map_err(|e| QueryError::StreamConsumer(e.to_string()))
        })
        .await
    }

    /// The statement this chain would run, without running it
    pub async fn raw(&self) -> Result<CompiledQuery, QueryError> {
        self.execution().compile().await
    }

    pub async fn sql(&self) -> Result<String, QueryError> {
        Ok(self.raw().await?.sql)
    }

    /// The single row matching `filter`
    pub async fn get(&self, filter: Filter) -> Result<Value, QueryError> {
        let mut rows = self.filter(filter)?.slice(0..2).all().await?;
        match rows.len() {
            0 => Err(QueryError::NotFound(self.entity.display_name().to_string())),
            1 => Ok(rows.remove(0)),
            _ => Err(QueryError::MultipleResults(format!(
                "{} matched more than one row",
                self.entity.display_name()
            ))),
        }
    }

    pub async fn count(&self) -> Result<i64, QueryError> {
        let transformer = self.entity.values_list_transformer(&["count".to_string()]);
        let node = self
            .child()
            .with_action(Action::Count)
            .with_transformer(transformer);
        let rows = self.derive(node).all().await?;
        rows.first()
            .and_then(|row| row.get(0))
            .and_then(Value::as_i64)
            .ok_or_else(|| QueryError::StreamConsumer("count query returned no count".to_string()))
    }

    /// Delete every matching row, returning how many were removed
    pub async fn delete(&self) -> Result<u64, QueryError> {
        self.mutate(self.child().with_action(Action::Delete)).await
    }

    /// Update every matching row, returning how many were changed
    pub async fn update(&self, data: Record) -> Result<u64, QueryError> {
        self.mutate(self.child().with_action(Action::Update).with_data(vec![data]))
            .await
    }

    async fn mutate(&self, node: QueryNode) -> Result<u64, QueryError> {
        let rows = self.derive(node).all().await?;
        rows.first()
            .and_then(Value::as_u64)
            .ok_or_else(|| QueryError::StreamConsumer("mutation returned no row count".to_string()))
    }

    /// Insert one record and return it as stored
    pub async fn create(&self, data: Record) -> Result<Value, QueryError> {
        self.create_many(vec![data])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::NotFound(self.entity.display_name().to_string()))
    }

    /// Insert several records with one statement, returning them in order
    pub async fn create_many(&self, data: Vec<Record>) -> Result<Vec<Value>, QueryError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let node = self.child().with_action(Action::Insert).with_data(data);
        self.derive(node).all().await
    }
}

impl fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("entity", &self.entity.table_name())
            .field("config", &self.config)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Awaiting a query set settles it into every row
impl IntoFuture for QuerySet {
    type Output = Result<Vec<Value>, QueryError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.all().await }.boxed()
    }
}
