//! Where-clause compiler
//!
//! Compiles settled filters into one parameterized boolean expression.
//! Operand values are always bound, never interpolated.

use crate::errors::QueryError;
use crate::query_builder::filter::{FilterKey, FilterSpec, SettledFilter};
use crate::query_builder::join::JoinPlan;
use crate::query_builder::sql_generation::Params;
use serde_json::Value;

pub struct WhereCompiler<'p> {
    plan: &'p JoinPlan,
}

impl<'p> WhereCompiler<'p> {
    pub fn new(plan: &'p JoinPlan) -> Self {
        Self { plan }
    }

    /// AND every filter of a chain together; `None` when there is nothing to filter on
    pub fn compile_all(
        &self,
        filters: &[SettledFilter],
        params: &mut Params,
    ) -> Result<Option<String>, QueryError> {
        if filters.is_empty() {
            return Ok(None);
        }
        let parts = filters
            .iter()
            .map(|filter| self.compile(filter, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(combine(parts, " AND ", "TRUE")))
    }

    pub fn compile(&self, filter: &SettledFilter, params: &mut Params) -> Result<String, QueryError> {
        match filter {
            FilterSpec::Any(branches) => {
                let parts = branches
                    .iter()
                    .map(|branch| self.compile(branch, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine(parts, " OR ", "FALSE"))
            }
            FilterSpec::All(entries) => {
                let parts = entries
                    .iter()
                    .map(|(key, operand)| self.compile_entry(key, operand, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine(parts, " AND ", "TRUE"))
            }
        }
    }

    fn compile_entry(&self, key: &str, operand: &Value, params: &mut Params) -> Result<String, QueryError> {
        let key = FilterKey::parse(key)?;
        let scoped = self.plan.resolve(&key.path)?;
        key.operator
            .compile(&scoped.to_sql(), operand, scoped.column, params)
    }
}

/// Join boolean fragments; an empty set becomes the operator's identity
fn combine(parts: Vec<String>, separator: &str, empty: &str) -> String {
    match parts.len() {
        0 => empty.to_string(),
        1 => parts.into_iter().collect(),
        _ => parts
            .iter()
            .map(|part| format!("({})", part))
            .collect::<Vec<_>>()
            .join(separator),
    }
}
