//! Query node chain and its resolver

pub mod node;
pub mod resolver;

pub use node::{Action, QueryNode};
pub use resolver::ResolvedQuery;
