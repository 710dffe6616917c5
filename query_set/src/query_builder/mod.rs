//! Query builder utilities
//!
//! Filter mini-language, operator table, join resolver, where-clause and
//! statement compilers, plus the ordering and pagination pieces they share.

pub mod filter;
pub mod join;
pub mod operator;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod where_clause;

#[cfg(test)]
mod tests;

pub use filter::{Filter, FilterKey, FilterSpec, Operand, Record, SettledFilter, SettledRecord};
pub use join::{JoinEdge, JoinPlan, ScopedColumn};
pub use operator::Operator;
pub use ordering::{SortKey, SortOrder};
pub use pagination::Window;
pub use sql_generation::{CompiledQuery, Params, SqlGenerator, Statement};
pub use where_clause::WhereCompiler;
