//! Operator table
//!
//! Maps each filter operator name to its SQL rendering. Pattern operators
//! escape LIKE metacharacters in the operand before binding it.

use crate::errors::QueryError;
use crate::query_builder::sql_generation::Params;
use crate::schema::{ColumnDescriptor, Direction};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use type_mapping::PostgresValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    In,
    NotIn,
    IsNull,
    Contains,
    StartsWith,
    EndsWith,
    IContains,
    IStartsWith,
    IEndsWith,
}

impl Operator {
    pub const ALL: [Operator; 15] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Lt,
        Operator::Gt,
        Operator::Lte,
        Operator::Gte,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::IContains,
        Operator::IStartsWith,
        Operator::IEndsWith,
    ];

    /// Name used after the `:` in a filter key
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Lte => "lte",
            Operator::Gte => "gte",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::IsNull => "isNull",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::IContains => "iContains",
            Operator::IStartsWith => "iStartsWith",
            Operator::IEndsWith => "iEndsWith",
        }
    }

    fn comparison_sql(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Neq => Some("!="),
            Operator::Lt => Some("<"),
            Operator::Gt => Some(">"),
            Operator::Lte => Some("<="),
            Operator::Gte => Some(">="),
            _ => None,
        }
    }

    /// Render `column <op> operand`, binding operands into `params`
    pub fn compile(
        &self,
        column_sql: &str,
        operand: &Value,
        column: &ColumnDescriptor,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        match self {
            Operator::Eq if operand.is_null() => Ok(format!("{} IS NULL", column_sql)),
            Operator::Neq if operand.is_null() => Ok(format!("{} IS NOT NULL", column_sql)),
            Operator::Lt | Operator::Gt | Operator::Lte | Operator::Gte if operand.is_null() => {
                Err(self.invalid("cannot compare against null"))
            }
            Operator::Eq
            | Operator::Neq
            | Operator::Lt
            | Operator::Gt
            | Operator::Lte
            | Operator::Gte => {
                let value = column.to_sql(relation_key(column, operand), Direction::Read)?;
                let sql_op = self.comparison_sql().unwrap_or("=");
                Ok(format!("{} {} {}", column_sql, sql_op, params.bind(value)))
            }
            Operator::In | Operator::NotIn => self.compile_membership(column_sql, operand, column, params),
            Operator::IsNull => {
                if is_truthy(operand) {
                    Ok(format!("{} IS NULL", column_sql))
                } else {
                    Ok(format!("{} IS NOT NULL", column_sql))
                }
            }
            Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::IContains
            | Operator::IStartsWith
            | Operator::IEndsWith => self.compile_pattern(column_sql, operand, params),
        }
    }

    fn compile_membership(
        &self,
        column_sql: &str,
        operand: &Value,
        column: &ColumnDescriptor,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let items = operand
            .as_array()
            .ok_or_else(|| self.invalid(&format!("expected an array, got {}", operand)))?;

        if items.is_empty() {
            // x IN () is never true; x NOT IN () always is
            return Ok(match self {
                Operator::NotIn => "true".to_string(),
                _ => "false".to_string(),
            });
        }

        let placeholders = items
            .iter()
            .map(|item| {
                column
                    .to_sql(relation_key(column, item), Direction::Read)
                    .map(|value| params.bind(value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let keyword = if *self == Operator::NotIn { "NOT IN" } else { "IN" };
        Ok(format!("{} {} ({})", column_sql, keyword, placeholders.join(", ")))
    }

    fn compile_pattern(
        &self,
        column_sql: &str,
        operand: &Value,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let needle = operand
            .as_str()
            .ok_or_else(|| self.invalid(&format!("expected a string, got {}", operand)))?;
        let escaped = escape_like(needle);

        let pattern = match self {
            Operator::Contains | Operator::IContains => format!("%{}%", escaped),
            Operator::StartsWith | Operator::IStartsWith => format!("{}%", escaped),
            _ => format!("%{}", escaped),
        };
        let placeholder = params.bind(PostgresValue::Text(pattern));

        match self {
            Operator::IContains | Operator::IStartsWith | Operator::IEndsWith => {
                Ok(format!("UPPER({}) LIKE UPPER({})", column_sql, placeholder))
            }
            _ => Ok(format!("{} LIKE {}", column_sql, placeholder)),
        }
    }

    fn invalid(&self, reason: &str) -> QueryError {
        QueryError::InvalidOperand {
            operator: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| QueryError::UnsupportedOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backslash-escape `\`, `%` and `_` so the operand matches literally
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// A related object stands in for its primary key on a foreign key column
pub(crate) fn relation_key<'v>(column: &ColumnDescriptor, value: &'v Value) -> &'v Value {
    match value {
        Value::Object(map) if column.is_foreign_key() => map.get("id").unwrap_or(value),
        _ => value,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
