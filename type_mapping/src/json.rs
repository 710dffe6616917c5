//! JSON conversion utilities
//!
//! Decoded rows leave as `serde_json::Value`; typed coercion of incoming
//! JSON reports failures through [`CoerceError`].

use crate::types::PostgresValue;
use serde_json::Value;
use thiserror::Error;

/// A JSON value could not be converted for a column of the expected type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value} to {expected}")]
pub struct CoerceError {
    pub expected: &'static str,
    pub value: String,
}

impl CoerceError {
    pub fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            value: value.to_string(),
        }
    }
}

impl PostgresValue {
    /// Convert a decoded cell back into JSON for shaped output
    pub fn to_json(&self) -> Value {
        match self {
            PostgresValue::Text(s) | PostgresValue::Decimal(s) => Value::String(s.clone()),
            PostgresValue::Integer(v) => Value::from(*v),
            PostgresValue::BigInt(v) => Value::from(*v),
            PostgresValue::SmallInt(v) => Value::from(*v),
            PostgresValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PostgresValue::Boolean(b) => Value::Bool(*b),
            PostgresValue::Uuid(u) => Value::String(u.to_string()),
            PostgresValue::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            PostgresValue::Json(v) => v.clone(),
            PostgresValue::Array(items) => {
                Value::Array(items.iter().map(PostgresValue::to_json).collect())
            }
            PostgresValue::Null => Value::Null,
        }
    }
}
