//! Statement compiler tests

#[cfg(test)]
mod tests {
    use crate::chain::Action;
    use crate::errors::QueryError;
    use crate::query_builder::{
        FilterSpec, Record, SettledFilter, SettledRecord, SortKey, SqlGenerator, Statement, Window,
    };
    use crate::schema::{ColumnDescriptor, EntityDescriptor, Relation, Table};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use type_mapping::{ColumnType, PostgresValue};

    fn authors() -> Arc<dyn EntityDescriptor> {
        Table::new("authors", "Author")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
            .into_entity()
    }

    fn books() -> Arc<dyn EntityDescriptor> {
        Table::new("books", "Book")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("title", ColumnType::Text))
            .with_column(ColumnDescriptor::plain("price", ColumnType::Decimal).nullable())
            .with_column(ColumnDescriptor::foreign_key(
                "author",
                "author_id",
                ColumnType::Integer,
                Relation::lazy(authors),
            ))
            .into_entity()
    }

    fn entry(key: &str, value: Value) -> SettledFilter {
        FilterSpec::All(vec![(key.to_string(), value)])
    }

    fn record(value: Value) -> SettledRecord {
        let Value::Object(map) = value else {
            panic!("record must be an object");
        };
        Record {
            entries: map.into_iter().collect(),
        }
    }

    fn statement(action: Action) -> Statement {
        Statement {
            action,
            filters: Vec::new(),
            order: Vec::new(),
            window: Window::unbounded(),
            data: Vec::new(),
        }
    }

    // ========================================
    // SELECT
    // ========================================

    #[test]
    fn test_select_without_filters() {
        let compiled = SqlGenerator::compile(&books(), &statement(Action::Select)).unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT "books"."id" AS "books.id", "books"."title" AS "books.title", "books"."price" AS "books.price", "books"."author_id" AS "books.author" FROM "books" LIMIT ALL OFFSET 0"#
        );
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_select_with_join_order_and_window() {
        let mut stmt = statement(Action::Select);
        stmt.filters = vec![entry("author.name", json!("Jane")), entry("title:startsWith", json!("D"))];
        stmt.order = vec![SortKey::parse("-author.name").unwrap(), SortKey::parse("title").unwrap()];
        stmt.window = Window::compose(&[Window::from_range(10..20), Window::from_range(2..5)]);

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert_eq!(compiled.sql.matches("LEFT JOIN").count(), 1);
        assert!(compiled.sql.contains(
            r#"LEFT JOIN "authors" AS "books.author" ON ("books"."author_id" = "books.author"."id")"#
        ));
        assert!(compiled.sql.contains(
            r#"WHERE ("books.author"."name" = $1) AND ("books"."title" LIKE $2)"#
        ));
        assert!(compiled
            .sql
            .contains(r#"ORDER BY "books.author"."name" DESC, "books"."title" ASC"#));
        assert!(compiled.sql.ends_with("LIMIT 3 OFFSET 12"));
        assert!(compiled
            .sql
            .contains(r#""books.author"."name" AS "books.author.name""#));
        assert_eq!(
            compiled.params,
            vec![PostgresValue::Text("Jane".into()), PostgresValue::Text("D%".into())]
        );
    }

    #[test]
    fn test_order_only_path_is_joined() {
        let mut stmt = statement(Action::Select);
        stmt.order = vec![SortKey::parse("author.name").unwrap()];
        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert!(compiled.sql.contains(r#"LEFT JOIN "authors" AS "books.author""#));
    }

    #[test]
    fn test_unknown_field_fails_compilation() {
        let mut stmt = statement(Action::Select);
        stmt.filters = vec![entry("isbn", json!("x"))];
        assert!(matches!(
            SqlGenerator::compile(&books(), &stmt),
            Err(QueryError::UnknownField { field, .. }) if field == "isbn"
        ));

        stmt.filters = vec![entry("title:between", json!([1, 2]))];
        assert!(matches!(
            SqlGenerator::compile(&books(), &stmt),
            Err(QueryError::UnsupportedOperator(_))
        ));
    }

    // ========================================
    // COUNT
    // ========================================

    #[test]
    fn test_count_wraps_windowed_ids() {
        let mut stmt = statement(Action::Count);
        stmt.filters = vec![entry("author.name", json!("Jane"))];
        stmt.window = Window::from_range(5..);

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT COUNT(*) AS "count" FROM (SELECT "books"."id" FROM "books" LEFT JOIN "authors" AS "books.author" ON ("books"."author_id" = "books.author"."id") WHERE "books.author"."name" = $1 LIMIT ALL OFFSET 5) AS "counted""#
        );
    }

    // ========================================
    // UPDATE / DELETE
    // ========================================

    #[test]
    fn test_update_targets_ids_from_select() {
        let mut stmt = statement(Action::Update);
        stmt.filters = vec![entry("author.name", json!("Jane"))];
        stmt.data = vec![record(json!({"title": "New", "author": {"id": 9}, "unknown": 1}))];

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert_eq!(
            compiled.sql,
            r#"UPDATE "books" SET "title" = $1, "author_id" = $2 WHERE "books"."id" IN (SELECT "books"."id" FROM "books" LEFT JOIN "authors" AS "books.author" ON ("books"."author_id" = "books.author"."id") WHERE "books.author"."name" = $3 LIMIT ALL OFFSET 0)"#
        );
        assert_eq!(
            compiled.params,
            vec![
                PostgresValue::Text("New".into()),
                PostgresValue::Integer(9),
                PostgresValue::Text("Jane".into()),
            ]
        );
    }

    #[test]
    fn test_update_without_known_fields_is_rejected() {
        let mut stmt = statement(Action::Update);
        stmt.data = vec![record(json!({"nope": 1}))];
        assert!(matches!(
            SqlGenerator::compile(&books(), &stmt),
            Err(QueryError::EmptyMutation(_))
        ));
    }

    #[test]
    fn test_update_rejects_null_for_required_column() {
        let mut stmt = statement(Action::Update);
        stmt.data = vec![record(json!({"title": null}))];
        assert!(matches!(
            SqlGenerator::compile(&books(), &stmt),
            Err(QueryError::Codec { column, .. }) if column == "title"
        ));
    }

    #[test]
    fn test_delete_targets_ids_from_select() {
        let mut stmt = statement(Action::Delete);
        stmt.filters = vec![entry("title:in", json!([]))];
        stmt.window = Window::from_range(0..10);

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert_eq!(
            compiled.sql,
            r#"DELETE FROM "books" WHERE "books"."id" IN (SELECT "books"."id" FROM "books" WHERE false LIMIT 10 OFFSET 0)"#
        );
    }

    // ========================================
    // INSERT
    // ========================================

    #[test]
    fn test_insert_single_record() {
        let mut stmt = statement(Action::Insert);
        stmt.data = vec![record(json!({"title": "x", "author": 3, "extra": true}))];

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert_eq!(
            compiled.sql,
            r#"INSERT INTO "books" ("title", "author_id") VALUES ($1, $2) RETURNING "books"."id" AS "books.id", "books"."title" AS "books.title", "books"."price" AS "books.price", "books"."author_id" AS "books.author""#
        );
        assert_eq!(
            compiled.params,
            vec![PostgresValue::Text("x".into()), PostgresValue::Integer(3)]
        );
    }

    #[test]
    fn test_insert_many_fills_missing_cells_with_default() {
        let mut stmt = statement(Action::Insert);
        stmt.data = vec![
            record(json!({"title": "x"})),
            record(json!({"title": "y", "price": "9.50"})),
            record(json!({"price": null, "title": "z"})),
        ];

        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert!(compiled.sql.starts_with(
            r#"INSERT INTO "books" ("title", "price") VALUES ($1, DEFAULT), ($2, $3::numeric), ($4, NULL) RETURNING"#
        ));
        assert_eq!(compiled.params.len(), 4);
    }

    #[test]
    fn test_insert_without_columns_uses_defaults() {
        let mut stmt = statement(Action::Insert);
        stmt.data = vec![record(json!({}))];
        let compiled = SqlGenerator::compile(&books(), &stmt).unwrap();
        assert!(compiled
            .sql
            .starts_with(r#"INSERT INTO "books" DEFAULT VALUES RETURNING"#));

        stmt.data.clear();
        assert!(matches!(
            SqlGenerator::compile(&books(), &stmt),
            Err(QueryError::EmptyMutation(_))
        ));
    }
}
