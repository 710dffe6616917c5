//! Schema collaborator contract
//!
//! The query core never owns entity metadata. It reads table names, column
//! descriptors and relations through [`EntityDescriptor`], and converts
//! operands through each column's [`ValueCodec`].

use crate::errors::QueryError;
use crate::query_builder::sql_generation::quote_ident;
use crate::transform::{self, RowTransformer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use type_mapping::{ColumnType, PostgresValue};

/// Which way a value is travelling when it is converted for SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Operand of a filter comparison
    Read,
    /// Value written by INSERT or UPDATE
    Write,
}

/// Column-level value conversion
pub trait ValueCodec: Send + Sync + fmt::Debug {
    fn to_sql(&self, value: &Value, direction: Direction) -> Result<PostgresValue, String>;
}

/// Codec driven by the declared column type
#[derive(Debug, Clone, Copy)]
pub struct TypedCodec {
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ValueCodec for TypedCodec {
    fn to_sql(&self, value: &Value, direction: Direction) -> Result<PostgresValue, String> {
        if value.is_null() && direction == Direction::Write && !self.nullable {
            return Err("column is not nullable".to_string());
        }
        self.column_type.coerce(value).map_err(|e| e.to_string())
    }
}

/// Handle to the entity on the far side of a foreign key.
/// Resolution is deferred so that entities may reference each other.
#[derive(Clone)]
pub struct Relation {
    target: Arc<dyn Fn() -> Arc<dyn EntityDescriptor> + Send + Sync>,
}

impl Relation {
    pub fn to(entity: Arc<dyn EntityDescriptor>) -> Self {
        Self {
            target: Arc::new(move || entity.clone()),
        }
    }

    pub fn lazy<F>(resolve: F) -> Self
    where
        F: Fn() -> Arc<dyn EntityDescriptor> + Send + Sync + 'static,
    {
        Self {
            target: Arc::new(resolve),
        }
    }

    pub fn target(&self) -> Arc<dyn EntityDescriptor> {
        (self.target)()
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ColumnKind {
    Plain,
    ForeignKey(Relation),
}

/// Logical field mapped onto one physical column
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    /// Logical field name used in filter paths and mutation data
    pub field: String,
    /// Physical column name; for a foreign key, the underlying id column
    pub name: String,
    pub kind: ColumnKind,
    pub column_type: ColumnType,
    pub codec: Arc<dyn ValueCodec>,
}

impl ColumnDescriptor {
    pub fn plain(field: &str, column_type: ColumnType) -> Self {
        Self {
            field: field.to_string(),
            name: field.to_string(),
            kind: ColumnKind::Plain,
            column_type,
            codec: Arc::new(TypedCodec {
                column_type,
                nullable: false,
            }),
        }
    }

    pub fn foreign_key(field: &str, column: &str, column_type: ColumnType, relation: Relation) -> Self {
        Self {
            field: field.to_string(),
            name: column.to_string(),
            kind: ColumnKind::ForeignKey(relation),
            column_type,
            codec: Arc::new(TypedCodec {
                column_type,
                nullable: false,
            }),
        }
    }

    /// Rename the physical column
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the codec
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Accept NULL on write, replacing the codec with a nullable typed codec
    pub fn nullable(self) -> Self {
        let column_type = self.column_type;
        self.with_codec(Arc::new(TypedCodec {
            column_type,
            nullable: true,
        }))
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.kind, ColumnKind::ForeignKey(_))
    }

    pub fn relation(&self) -> Option<&Relation> {
        match &self.kind {
            ColumnKind::ForeignKey(relation) => Some(relation),
            ColumnKind::Plain => None,
        }
    }

    /// Convert a value through the column codec
    pub fn to_sql(&self, value: &Value, direction: Direction) -> Result<PostgresValue, QueryError> {
        self.codec
            .to_sql(value, direction)
            .map_err(|reason| QueryError::Codec {
                column: self.name.clone(),
                reason,
            })
    }
}

/// Metadata the query core needs about one entity
pub trait EntityDescriptor: Send + Sync + fmt::Debug {
    /// The table name in the database
    fn table_name(&self) -> &str;

    /// Human readable name used in error messages
    fn display_name(&self) -> &str;

    /// Columns in declaration order
    fn columns(&self) -> &[ColumnDescriptor];

    fn column(&self, field: &str) -> Option<&ColumnDescriptor> {
        self.columns().iter().find(|c| c.field == field)
    }

    /// Physical primary key column
    fn primary_key(&self) -> &str {
        "id"
    }

    /// Aliased selection list; each output column is named `<alias>.<field>`
    fn select_columns(&self, alias: &str) -> Vec<String> {
        self.columns()
            .iter()
            .map(|c| {
                format!(
                    "{}.{} AS {}",
                    quote_ident(alias),
                    quote_ident(&c.name),
                    quote_ident(&format!("{}.{}", alias, c.field))
                )
            })
            .collect()
    }

    /// Default full-object shaping
    fn object_transformer(&self) -> RowTransformer {
        transform::object_transformer(self.table_name())
    }

    /// Object-shaped projection of the named fields
    fn values_transformer(&self, fields: &[String]) -> RowTransformer {
        transform::values_transformer(self.table_name(), fields)
    }

    /// Positional-list projection of the named fields
    fn values_list_transformer(&self, fields: &[String]) -> RowTransformer {
        transform::values_list_transformer(self.table_name(), fields)
    }
}

/// Plain in-memory entity description
#[derive(Debug, Clone)]
pub struct Table {
    table_name: String,
    display_name: String,
    primary_key: String,
    columns: Vec<ColumnDescriptor>,
}

impl Table {
    pub fn new(table_name: &str, display_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            display_name: display_name.to_string(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    pub fn into_entity(self) -> Arc<dyn EntityDescriptor> {
        Arc::new(self)
    }
}

impl EntityDescriptor for Table {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn authors() -> Arc<dyn EntityDescriptor> {
        Table::new("authors", "Author")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
            .into_entity()
    }

    #[test]
    fn test_select_columns_are_aliased_by_field() {
        let entity = Table::new("books", "Book")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::foreign_key(
                "author",
                "author_id",
                ColumnType::Integer,
                Relation::to(authors()),
            ))
            .into_entity();

        assert_eq!(
            entity.select_columns("books"),
            vec![
                r#""books"."id" AS "books.id""#.to_string(),
                r#""books"."author_id" AS "books.author""#.to_string(),
            ]
        );
    }

    #[test]
    fn test_relation_resolves_target() {
        let column = ColumnDescriptor::foreign_key(
            "author",
            "author_id",
            ColumnType::Integer,
            Relation::lazy(authors),
        );
        assert!(column.is_foreign_key());
        let target = column.relation().map(|r| r.target()).unwrap();
        assert_eq!(target.table_name(), "authors");
    }

    #[test]
    fn test_write_null_respects_nullability() {
        let strict = ColumnDescriptor::plain("name", ColumnType::Text);
        assert!(matches!(
            strict.to_sql(&Value::Null, Direction::Write),
            Err(QueryError::Codec { .. })
        ));
        assert_eq!(
            strict.to_sql(&Value::Null, Direction::Read).unwrap(),
            PostgresValue::Null
        );

        let loose = ColumnDescriptor::plain("bio", ColumnType::Text).nullable();
        assert_eq!(
            loose.to_sql(&Value::Null, Direction::Write).unwrap(),
            PostgresValue::Null
        );
        assert_eq!(
            loose.to_sql(&json!("x"), Direction::Write).unwrap(),
            PostgresValue::Text("x".into())
        );
    }
}
