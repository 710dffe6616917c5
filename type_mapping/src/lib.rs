//! Unified value mapping between JSON operands and PostgreSQL parameters
//! This crate provides the value types shared by the query compiler and the driver layer

pub mod json;
pub mod sql;
pub mod types;

pub use json::CoerceError;
pub use sql::ColumnType;
pub use types::PostgresValue;
