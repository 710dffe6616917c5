//! Chain resolver
//!
//! Merges the intent accumulated along a chain. Action, mutation data,
//! ordering and row transformer are taken from the nearest node that set
//! them; filters and windows are collected from every node, oldest first.

use crate::chain::node::{Action, QueryNode};
use crate::errors::QueryError;
use crate::query_builder::{Filter, Record, SettledFilter, SettledRecord, SortKey, Statement, Window};
use crate::transform::RowTransformer;
use futures::future;
use std::fmt;

#[derive(Clone)]
pub struct ResolvedQuery {
    pub action: Action,
    pub data: Vec<Record>,
    pub transformer: Option<RowTransformer>,
    pub order: Vec<SortKey>,
    pub filters: Vec<Filter>,
    pub windows: Vec<Window>,
}

impl ResolvedQuery {
    pub fn resolve(leaf: &QueryNode) -> Self {
        let mut action = None;
        let mut data = None;
        let mut transformer = None;
        let mut order = None;
        let mut filters = Vec::new();
        let mut windows = Vec::new();

        for node in leaf.ancestry() {
            if action.is_none() {
                action = node.action;
            }
            if data.is_none() {
                data = node.data.as_ref().filter(|d| !d.is_empty()).cloned();
            }
            if transformer.is_none() {
                transformer = node.transformer.clone();
            }
            if order.is_none() {
                order = node.order.as_ref().filter(|o| !o.is_empty()).cloned();
            }
            if let Some(filter) = &node.filter {
                filters.push(filter.clone());
            }
            if let Some(window) = node.window {
                windows.push(window);
            }
        }

        // collected leaf-first; callers expect oldest first
        filters.reverse();
        windows.reverse();

        Self {
            action: action.unwrap_or(Action::Select),
            data: data.unwrap_or_default(),
            transformer,
            order: order.unwrap_or_default(),
            filters,
            windows,
        }
    }

    /// Absolute window after composing every slice
    pub fn bounds(&self) -> Window {
        Window::compose(&self.windows)
    }

    /// Settle every filter operand concurrently
    pub async fn settle_filters(&self) -> Result<Vec<SettledFilter>, QueryError> {
        future::try_join_all(self.filters.iter().map(Filter::settle)).await
    }

    /// Settle mutation data; only inserts and updates carry any
    pub async fn settle_data(&self) -> Result<Vec<SettledRecord>, QueryError> {
        match self.action {
            Action::Insert | Action::Update => {
                future::try_join_all(self.data.iter().map(Record::settle)).await
            }
            _ => Ok(Vec::new()),
        }
    }

    pub fn statement(&self, filters: Vec<SettledFilter>, data: Vec<SettledRecord>) -> Statement {
        Statement {
            action: self.action,
            filters,
            order: self.order.clone(),
            window: self.bounds(),
            data,
        }
    }

    /// Settle everything and build the compilable statement
    pub async fn settle(&self) -> Result<Statement, QueryError> {
        let (filters, data) = future::try_join(self.settle_filters(), self.settle_data()).await?;
        Ok(self.statement(filters, data))
    }
}

impl fmt::Debug for ResolvedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedQuery")
            .field("action", &self.action)
            .field("data", &self.data)
            .field("transformer", &self.transformer.as_ref().map(|_| "<fn>"))
            .field("order", &self.order)
            .field("filters", &self.filters)
            .field("windows", &self.windows)
            .finish()
    }
}
