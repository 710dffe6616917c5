//! Ordering keys
//!
//! An order key is a dotted field path, optionally prefixed with `-` for
//! descending order.

use crate::errors::QueryError;
use crate::query_builder::filter::parse_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: Vec<String>,
    pub order: SortOrder,
}

impl SortKey {
    pub fn parse(key: &str) -> Result<Self, QueryError> {
        let (path, order) = match key.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Desc),
            None => (key, SortOrder::Asc),
        };
        Ok(Self {
            path: parse_path(path)?,
            order,
        })
    }

    /// Dotted path as written, without the direction prefix
    pub fn field_path(&self) -> String {
        self.path.join(".")
    }
}
