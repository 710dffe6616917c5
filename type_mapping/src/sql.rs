//! SQL type conversion utilities
//!
//! This module maps declared column types to PostgreSQL type names and
//! coerces JSON operands into the matching `PostgresValue` variant.

use crate::json::CoerceError;
use crate::types::PostgresValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a physical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Boolean,
    Uuid,
    Timestamp,
    Decimal,
    Json,
    TextArray,
}

impl ColumnType {
    /// PostgreSQL type name for this column type
    pub fn pg_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Uuid => "UUID",
            ColumnType::Timestamp => "TIMESTAMP WITH TIME ZONE",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::Json => "JSONB",
            ColumnType::TextArray => "TEXT[]",
        }
    }

    /// Coerce a JSON operand into a value of this column type.
    /// `null` is accepted for every type; nullability is the caller's concern.
    pub fn coerce(&self, value: &Value) -> Result<PostgresValue, CoerceError> {
        if value.is_null() {
            return Ok(PostgresValue::Null);
        }

        let err = || CoerceError::new(self.pg_type(), value);

        match self {
            ColumnType::Text => match value {
                Value::String(s) => Ok(PostgresValue::Text(s.clone())),
                Value::Number(n) => Ok(PostgresValue::Text(n.to_string())),
                Value::Bool(b) => Ok(PostgresValue::Text(b.to_string())),
                _ => Err(err()),
            },
            ColumnType::SmallInt => integer(value)
                .and_then(|i| i16::try_from(i).ok())
                .map(PostgresValue::SmallInt)
                .ok_or_else(err),
            ColumnType::Integer => integer(value)
                .and_then(|i| i32::try_from(i).ok())
                .map(PostgresValue::Integer)
                .ok_or_else(err),
            ColumnType::BigInt => integer(value).map(PostgresValue::BigInt).ok_or_else(err),
            ColumnType::Float => match value {
                Value::Number(n) => n.as_f64().map(PostgresValue::Float).ok_or_else(err),
                Value::String(s) => s.parse().map(PostgresValue::Float).map_err(|_| err()),
                _ => Err(err()),
            },
            ColumnType::Boolean => value.as_bool().map(PostgresValue::Boolean).ok_or_else(err),
            ColumnType::Uuid => value
                .as_str()
                .and_then(|s| uuid::Uuid::parse_str(s).ok())
                .map(PostgresValue::Uuid)
                .ok_or_else(err),
            ColumnType::Timestamp => value
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| PostgresValue::Timestamp(ts.with_timezone(&chrono::Utc)))
                .ok_or_else(err),
            ColumnType::Decimal => match value {
                Value::Number(n) => Ok(PostgresValue::Decimal(n.to_string())),
                Value::String(s) if s.parse::<f64>().is_ok() => {
                    Ok(PostgresValue::Decimal(s.clone()))
                }
                _ => Err(err()),
            },
            ColumnType::Json => Ok(PostgresValue::Json(value.clone())),
            ColumnType::TextArray => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| ColumnType::Text.coerce(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(PostgresValue::Array),
                _ => Err(err()),
            },
        }
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
