//! Type mapping definitions
//!
//! This module defines the runtime value carried in positional parameter
//! lists and in the cells of raw result rows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// PostgreSQL runtime value for bound parameters and decoded row cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostgresValue {
    Text(String),
    Integer(i32),
    BigInt(i64),
    SmallInt(i16),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Decimal(String), // Store as string to preserve precision
    Json(serde_json::Value),
    Array(Vec<PostgresValue>),
    Null,
}

impl PostgresValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PostgresValue::Null)
    }

    /// Explicit cast appended to a placeholder when the driver cannot infer
    /// the parameter type from a text encoding.
    pub fn placeholder_cast(&self) -> Option<&'static str> {
        match self {
            PostgresValue::Decimal(_) => Some("numeric"),
            _ => None,
        }
    }
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PostgresValue {
                fn from(val: $ty) -> Self {
                    PostgresValue::$variant(val.into())
                }
            }
        )*
    };
}

from_scalar! {
    String => Text,
    &str => Text,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f64 => Float,
    bool => Boolean,
    Uuid => Uuid,
    chrono::DateTime<chrono::Utc> => Timestamp,
}

impl<T> From<Option<T>> for PostgresValue
where
    T: Into<PostgresValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => PostgresValue::Null,
        }
    }
}
