//! Filter mini-language
//!
//! A filter is either a list of alternatives (OR) or an ordered set of
//! `"path[:operator]"` entries (AND). Operands may still be in flight; they
//! are settled concurrently right before compilation.

use crate::errors::QueryError;
use crate::query_builder::operator::Operator;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use futures::TryFutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;

type PendingValue = Shared<BoxFuture<'static, Result<Value, String>>>;

/// Filter or mutation operand, either known now or resolved later
#[derive(Clone)]
pub enum Operand {
    Ready(Value),
    Pending(PendingValue),
}

impl Operand {
    /// Wrap an in-flight computation. The result is shared, so a query can
    /// be executed more than once without re-running it.
    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Operand::Pending(fut.map_err(|e| format!("{e:#}")).boxed().shared())
    }

    pub async fn settle(&self) -> Result<Value, QueryError> {
        match self {
            Operand::Ready(value) => Ok(value.clone()),
            Operand::Pending(pending) => pending.clone().await.map_err(QueryError::Pending),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Ready(value)
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Operand::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Filter specification, generic over its operand so the same shape
/// describes both the caller's (possibly pending) filter and the settled one.
#[derive(Debug, Clone)]
pub enum FilterSpec<V = Operand> {
    /// Logical OR over sub-filters
    Any(Vec<FilterSpec<V>>),
    /// Logical AND over `"path[:operator]"` entries, in insertion order
    All(Vec<(String, V)>),
}

/// A filter whose operands may still be pending
pub type Filter = FilterSpec<Operand>;

/// A filter with every operand settled
pub type SettledFilter = FilterSpec<Value>;

impl Filter {
    /// Empty AND filter
    pub fn new() -> Self {
        FilterSpec::All(Vec::new())
    }

    /// OR over the given filters
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        FilterSpec::Any(filters.into_iter().collect())
    }

    /// Add an AND entry. On an OR filter the entry is added to every branch.
    pub fn and(self, key: &str, value: impl Into<Value>) -> Self {
        self.and_operand(key, Operand::Ready(value.into()))
    }

    /// Add an AND entry whose operand is still being computed
    pub fn and_pending<F>(self, key: &str, fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.and_operand(key, Operand::pending(fut))
    }

    fn and_operand(self, key: &str, operand: Operand) -> Self {
        match self {
            FilterSpec::All(mut entries) => {
                entries.push((key.to_string(), operand));
                FilterSpec::All(entries)
            }
            FilterSpec::Any(branches) => FilterSpec::Any(
                branches
                    .into_iter()
                    .map(|branch| branch.and_operand(key, operand.clone()))
                    .collect(),
            ),
        }
    }

    /// Build from JSON: an object is an AND map, an array is an OR list
    pub fn from_json(value: Value) -> Result<Self, QueryError> {
        match value {
            Value::Object(map) => Ok(FilterSpec::All(
                map.into_iter()
                    .map(|(key, value)| (key, Operand::Ready(value)))
                    .collect(),
            )),
            Value::Array(items) => items
                .into_iter()
                .map(Filter::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(FilterSpec::Any),
            other => Err(QueryError::InvalidOperand {
                operator: "filter".to_string(),
                reason: format!("expected an object or an array, got {}", other),
            }),
        }
    }

    /// Settle every operand concurrently, failing on the first rejection
    pub fn settle(&self) -> BoxFuture<'_, Result<SettledFilter, QueryError>> {
        async move {
            match self {
                FilterSpec::Any(branches) => {
                    let settled = future::try_join_all(branches.iter().map(Filter::settle)).await?;
                    Ok(FilterSpec::Any(settled))
                }
                FilterSpec::All(entries) => {
                    let values =
                        future::try_join_all(entries.iter().map(|(_, operand)| operand.settle()))
                            .await?;
                    Ok(FilterSpec::All(
                        entries
                            .iter()
                            .map(|(key, _)| key.clone())
                            .zip(values)
                            .collect(),
                    ))
                }
            }
        }
        .boxed()
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Value> for Filter {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Filter::from_json(value)
    }
}

impl<V> FilterSpec<V> {
    /// Every entry key, depth first, in declaration order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            FilterSpec::Any(branches) => {
                for branch in branches {
                    branch.collect_keys(keys);
                }
            }
            FilterSpec::All(entries) => keys.extend(entries.iter().map(|(key, _)| key.as_str())),
        }
    }
}

/// Parsed `"path[:operator]"` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterKey {
    pub path: Vec<String>,
    pub operator: Operator,
}

impl FilterKey {
    pub fn parse(key: &str) -> Result<Self, QueryError> {
        let (path, operator) = match key.split_once(':') {
            Some((path, op)) => (path, op.parse::<Operator>()?),
            None => (key, Operator::Eq),
        };
        Ok(Self {
            path: parse_path(path)?,
            operator,
        })
    }
}

/// Split a dotted field path, rejecting empty segments
pub fn parse_path(path: &str) -> Result<Vec<String>, QueryError> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(QueryError::UnknownField {
            entity: "filter".to_string(),
            field: path.to_string(),
        });
    }
    Ok(segments)
}

/// Mutation record: field name to operand, in insertion order
#[derive(Debug, Clone)]
pub struct Record<V = Operand> {
    pub(crate) entries: Vec<(String, V)>,
}

/// A record with every value settled
pub type SettledRecord = Record<Value>;

impl Record {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.entries
            .push((field.to_string(), Operand::Ready(value.into())));
        self
    }

    pub fn set_pending<F>(mut self, field: &str, fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.entries.push((field.to_string(), Operand::pending(fut)));
        self
    }

    /// Build from a JSON object
    pub fn from_json(value: Value) -> Result<Self, QueryError> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map
                    .into_iter()
                    .map(|(key, value)| (key, Operand::Ready(value)))
                    .collect(),
            }),
            other => Err(QueryError::InvalidOperand {
                operator: "record".to_string(),
                reason: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Settle every field concurrently, failing on the first rejection
    pub async fn settle(&self) -> Result<SettledRecord, QueryError> {
        let values =
            future::try_join_all(self.entries.iter().map(|(_, operand)| operand.settle())).await?;
        Ok(Record {
            entries: self
                .entries
                .iter()
                .map(|(field, _)| field.clone())
                .zip(values)
                .collect(),
        })
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Value> for Record {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Record::from_json(value)
    }
}

impl<V> Record<V> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(field, value)| (field.as_str(), value))
    }
}
