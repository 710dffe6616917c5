//! Immutable query nodes
//!
//! Every builder call produces a new node pointing at the node it was called
//! on. Nodes are never mutated after construction, so derived chains share
//! their common ancestry.

use crate::query_builder::{Filter, Record, SortKey, Window};
use crate::transform::RowTransformer;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
    Count,
}

pub struct QueryNode {
    pub(crate) action: Option<Action>,
    pub(crate) filter: Option<Filter>,
    pub(crate) window: Option<Window>,
    pub(crate) data: Option<Vec<Record>>,
    pub(crate) order: Option<Vec<SortKey>>,
    pub(crate) transformer: Option<RowTransformer>,
    pub(crate) parent: Option<Arc<QueryNode>>,
}

impl QueryNode {
    fn empty(parent: Option<Arc<QueryNode>>) -> Self {
        Self {
            action: None,
            filter: None,
            window: None,
            data: None,
            order: None,
            transformer: None,
            parent,
        }
    }

    /// Chain root; selects unless a descendant says otherwise
    pub fn root() -> Arc<Self> {
        Arc::new(Self::empty(None).with_action(Action::Select))
    }

    /// Blank child of `parent`
    pub fn child(parent: &Arc<QueryNode>) -> Self {
        Self::empty(Some(parent.clone()))
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_data(mut self, data: Vec<Record>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_order(mut self, order: Vec<SortKey>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_transformer(mut self, transformer: RowTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn parent(&self) -> Option<&Arc<QueryNode>> {
        self.parent.as_ref()
    }

    /// This node followed by each ancestor up to the root
    pub fn ancestry(&self) -> impl Iterator<Item = &QueryNode> {
        std::iter::successors(Some(self), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryNode")
            .field("action", &self.action)
            .field("filter", &self.filter)
            .field("window", &self.window)
            .field("data", &self.data)
            .field("order", &self.order)
            .field("transformer", &self.transformer.as_ref().map(|_| "<fn>"))
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

// Unlink long chains iteratively instead of recursing once per ancestor
impl Drop for QueryNode {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}
