//! Raw rows and row transformers
//!
//! A raw row is the flat, aliased output of one compiled statement. A row
//! transformer shapes it into the JSON value handed to callers.

use anyhow::anyhow;
use serde_json::{Map, Value};
use std::sync::Arc;
use type_mapping::PostgresValue;

/// Shapes one raw row; a failure surfaces as a stream consumer error
pub type RowTransformer = Arc<dyn Fn(Row) -> anyhow::Result<Value> + Send + Sync>;

/// One raw result row: output column names paired with decoded cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<PostgresValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: PostgresValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder form of [`Row::push`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<PostgresValue>) -> Self {
        self.push(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&PostgresValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostgresValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Rebuilds nested objects from `<base>.<path>` column names.
/// Joined entities land under their relation field, replacing the raw key.
/// A relation whose LEFT JOIN matched nothing comes back as `null`.
pub fn object_transformer(base_alias: &str) -> RowTransformer {
    let prefix = format!("{}.", base_alias);
    Arc::new(move |row: Row| {
        let mut out = Map::new();
        let mut relations: Vec<&str> = Vec::new();
        for (column, value) in row.iter() {
            let path = column.strip_prefix(prefix.as_str()).unwrap_or(column);
            let mut parent = path;
            while let Some((head, _)) = parent.rsplit_once('.') {
                if !relations.contains(&head) {
                    relations.push(head);
                }
                parent = head;
            }
            insert_path(&mut out, path, value.to_json());
        }

        // innermost first, so an unmatched nested join can empty its parent
        relations.sort_by_key(|path| std::cmp::Reverse(path.matches('.').count()));
        for path in relations {
            null_unmatched(&mut out, path);
        }
        Ok(Value::Object(out))
    })
}

/// Every joined entity selects its primary key, so a nested object with
/// only NULL cells can only come from an unmatched join.
fn null_unmatched(out: &mut Map<String, Value>, path: &str) {
    let (parent, field) = match path.rsplit_once('.') {
        Some((parent, field)) => (Some(parent), field),
        None => (None, path),
    };
    let mut scope = out;
    if let Some(parent) = parent {
        for segment in parent.split('.') {
            match scope.get_mut(segment) {
                Some(Value::Object(inner)) => scope = inner,
                _ => return,
            }
        }
    }
    if let Some(slot) = scope.get_mut(field) {
        if matches!(slot, Value::Object(inner) if inner.values().all(Value::is_null)) {
            *slot = Value::Null;
        }
    }
}

/// Object holding only the requested fields, keyed as requested
pub fn values_transformer(base_alias: &str, fields: &[String]) -> RowTransformer {
    let base = base_alias.to_string();
    let fields = fields.to_vec();
    Arc::new(move |row: Row| {
        let mut out = Map::new();
        for field in &fields {
            out.insert(field.clone(), lookup(&row, &base, field)?.to_json());
        }
        Ok(Value::Object(out))
    })
}

/// Array holding the requested fields in order
pub fn values_list_transformer(base_alias: &str, fields: &[String]) -> RowTransformer {
    let base = base_alias.to_string();
    let fields = fields.to_vec();
    Arc::new(move |row: Row| {
        fields
            .iter()
            .map(|field| lookup(&row, &base, field).map(PostgresValue::to_json))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Value::Array)
    })
}

fn lookup<'r>(row: &'r Row, base: &str, field: &str) -> anyhow::Result<&'r PostgresValue> {
    row.get(&format!("{}.{}", base, field))
        .or_else(|| row.get(field))
        .ok_or_else(|| anyhow!("column '{}' is not part of the result", field))
}

fn insert_path(out: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            // a joined object already filled in under this key wins over the raw id
            if !matches!(out.get(path), Some(Value::Object(_))) {
                out.insert(path.to_string(), value);
            }
        }
        Some((head, rest)) => {
            let slot = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn joined_row() -> Row {
        Row::new()
            .with("books.id", 1)
            .with("books.title", "Dune")
            .with("books.author", 7)
            .with("books.author.id", 7)
            .with("books.author.name", "Frank")
    }

    #[test]
    fn test_object_transformer_nests_joined_columns() {
        let shaped = object_transformer("books")(joined_row()).unwrap();
        assert_eq!(
            shaped,
            json!({"id": 1, "title": "Dune", "author": {"id": 7, "name": "Frank"}})
        );
    }

    #[test]
    fn test_unmatched_join_shapes_to_null() {
        let row = Row::new()
            .with("books.id", 1)
            .with("books.author", PostgresValue::Null)
            .with("books.author.id", PostgresValue::Null)
            .with("books.author.name", PostgresValue::Null);
        let shaped = object_transformer("books")(row).unwrap();
        assert_eq!(shaped, json!({"id": 1, "author": null}));
    }

    #[test]
    fn test_unmatched_nested_join_nulls_only_that_level() {
        let row = Row::new()
            .with("books.id", 1)
            .with("books.author", 7)
            .with("books.author.id", 7)
            .with("books.author.agent", PostgresValue::Null)
            .with("books.author.agent.id", PostgresValue::Null)
            .with("books.author.agent.name", PostgresValue::Null);
        let shaped = object_transformer("books")(row).unwrap();
        assert_eq!(shaped, json!({"id": 1, "author": {"id": 7, "agent": null}}));

        let orphan = Row::new()
            .with("books.id", 2)
            .with("books.author", PostgresValue::Null)
            .with("books.author.id", PostgresValue::Null)
            .with("books.author.agent.id", PostgresValue::Null);
        let shaped = object_transformer("books")(orphan).unwrap();
        assert_eq!(shaped, json!({"id": 2, "author": null}));
    }

    #[test]
    fn test_null_json_members_are_not_relations() {
        let row = Row::new()
            .with("books.id", 1)
            .with("books.meta", PostgresValue::Json(json!({"rating": null})));
        let shaped = object_transformer("books")(row).unwrap();
        assert_eq!(shaped, json!({"id": 1, "meta": {"rating": null}}));
    }

    #[test]
    fn test_values_transformer_projects_fields() {
        let fields = vec!["title".to_string(), "author.name".to_string()];
        let shaped = values_transformer("books", &fields)(joined_row()).unwrap();
        assert_eq!(shaped, json!({"title": "Dune", "author.name": "Frank"}));
    }

    #[test]
    fn test_values_list_falls_back_to_bare_column() {
        let row = Row::new().with("count", 3i64);
        let shaped = values_list_transformer("books", &["count".to_string()])(row).unwrap();
        assert_eq!(shaped, json!([3]));
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let err = values_list_transformer("books", &["isbn".to_string()])(joined_row())
            .unwrap_err();
        assert!(err.to_string().contains("isbn"));
    }
}
