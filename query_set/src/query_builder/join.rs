//! Join resolver
//!
//! Walks every dotted field path used by a statement and discovers the
//! foreign-key joins needed to reach its final column. Each relationship
//! path is joined once per statement, aliased by the path that reached it.

use crate::errors::QueryError;
use crate::query_builder::sql_generation::quote_ident;
use crate::schema::{ColumnDescriptor, EntityDescriptor};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// One discovered relationship traversal, always joined with LEFT JOIN
/// so that rows without a related entity are kept
#[derive(Debug, Clone)]
pub struct JoinEdge {
    /// Alias of the entity holding the foreign key
    pub from_alias: String,
    /// Relation field traversed
    pub relation: String,
    /// Physical foreign-key column on the `from` side
    pub fk_column: String,
    /// Alias given to the joined entity
    pub to_alias: String,
    pub to: Arc<dyn EntityDescriptor>,
}

impl JoinEdge {
    pub fn to_sql(&self) -> String {
        format!(
            "LEFT JOIN {} AS {} ON ({}.{} = {}.{})",
            quote_ident(self.to.table_name()),
            quote_ident(&self.to_alias),
            quote_ident(&self.from_alias),
            quote_ident(&self.fk_column),
            quote_ident(&self.to_alias),
            quote_ident(self.to.primary_key()),
        )
    }
}

/// A column reference scoped to the alias of the entity that owns it
#[derive(Debug, Clone, Copy)]
pub struct ScopedColumn<'p> {
    pub alias: &'p str,
    pub column: &'p ColumnDescriptor,
}

impl ScopedColumn<'_> {
    pub fn to_sql(&self) -> String {
        format!("{}.{}", quote_ident(self.alias), quote_ident(&self.column.name))
    }
}

/// Joins and alias map for one statement
#[derive(Debug, Clone)]
pub struct JoinPlan {
    base_alias: String,
    aliases: HashMap<String, Arc<dyn EntityDescriptor>>,
    edges: Vec<JoinEdge>,
}

impl JoinPlan {
    /// Discover joins from full field paths (the last segment names a column)
    pub fn discover<'a, I>(base: &Arc<dyn EntityDescriptor>, paths: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let base_alias = base.table_name().to_string();
        let mut aliases = HashMap::new();
        aliases.insert(base_alias.clone(), base.clone());

        // from alias -> target table -> relation fields already joined
        let mut seen: HashMap<String, HashMap<String, HashSet<String>>> = HashMap::new();
        let mut edges = Vec::new();

        for path in paths {
            let Some((_, relations)) = path.split_last() else {
                continue;
            };

            let mut from_alias = base_alias.clone();
            let mut current = base.clone();
            for field in relations {
                let column = current
                    .column(field)
                    .ok_or_else(|| QueryError::unknown_field(current.display_name(), field))?;
                let relation = column.relation().ok_or_else(|| QueryError::NotARelation {
                    entity: current.display_name().to_string(),
                    field: field.clone(),
                })?;
                let target = relation.target();
                let to_alias = format!("{}.{}", from_alias, field);

                let is_new = seen
                    .entry(from_alias.clone())
                    .or_default()
                    .entry(target.table_name().to_string())
                    .or_default()
                    .insert(field.clone());

                if is_new {
                    trace!(from = %from_alias, relation = %field, to = %to_alias, "join discovered");
                    edges.push(JoinEdge {
                        from_alias: from_alias.clone(),
                        relation: field.clone(),
                        fk_column: column.name.clone(),
                        to_alias: to_alias.clone(),
                        to: target.clone(),
                    });
                    aliases.insert(to_alias.clone(), target.clone());
                }

                from_alias = to_alias;
                current = target;
            }
        }

        Ok(Self {
            base_alias,
            aliases,
            edges,
        })
    }

    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    /// Scope a full field path to its owning alias
    pub fn resolve(&self, path: &[String]) -> Result<ScopedColumn<'_>, QueryError> {
        let Some((field, relations)) = path.split_last() else {
            return Err(QueryError::unknown_field(&self.base_alias, ""));
        };

        let alias = relations
            .iter()
            .fold(self.base_alias.clone(), |alias, rel| format!("{}.{}", alias, rel));
        let (alias, entity) = self
            .aliases
            .get_key_value(&alias)
            .ok_or_else(|| QueryError::unknown_field(&self.base_alias, &path.join(".")))?;
        let column = entity
            .column(field)
            .ok_or_else(|| QueryError::unknown_field(entity.display_name(), field))?;

        Ok(ScopedColumn {
            alias: alias.as_str(),
            column,
        })
    }

    /// `LEFT JOIN ...` clauses in discovery order
    pub fn join_sql(&self) -> Vec<String> {
        self.edges.iter().map(JoinEdge::to_sql).collect()
    }

    /// Base columns followed by the columns of every joined entity
    pub fn select_list(&self) -> Vec<String> {
        let mut columns = self
            .aliases
            .get(&self.base_alias)
            .map(|base| base.select_columns(&self.base_alias))
            .unwrap_or_default();
        for edge in &self.edges {
            columns.extend(edge.to.select_columns(&edge.to_alias));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Relation, Table};
    use type_mapping::ColumnType;

    fn books() -> Arc<dyn EntityDescriptor> {
        let publishers = Table::new("publishers", "Publisher")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
            .into_entity();
        let authors = Table::new("authors", "Author")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
            .with_column(ColumnDescriptor::plain("email", ColumnType::Text))
            .with_column(ColumnDescriptor::foreign_key(
                "publisher",
                "publisher_id",
                ColumnType::Integer,
                Relation::to(publishers),
            ))
            .into_entity();
        Table::new("books", "Book")
            .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
            .with_column(ColumnDescriptor::plain("title", ColumnType::Text))
            .with_column(ColumnDescriptor::foreign_key(
                "author",
                "author_id",
                ColumnType::Integer,
                Relation::to(authors.clone()),
            ))
            .with_column(ColumnDescriptor::foreign_key(
                "editor",
                "editor_id",
                ColumnType::Integer,
                Relation::to(authors),
            ))
            .into_entity()
    }

    fn paths(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|p| p.split('.').map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_repeated_relation_is_joined_once() {
        let paths = paths(&["author.name", "author.email", "title"]);
        let plan = JoinPlan::discover(&books(), paths.iter().map(Vec::as_slice)).unwrap();

        assert_eq!(
            plan.join_sql(),
            vec![r#"LEFT JOIN "authors" AS "books.author" ON ("books"."author_id" = "books.author"."id")"#]
        );
    }

    #[test]
    fn test_same_target_through_two_relations() {
        let paths = paths(&["author.name", "editor.name"]);
        let plan = JoinPlan::discover(&books(), paths.iter().map(Vec::as_slice)).unwrap();

        let aliases: Vec<_> = plan.edges().iter().map(|e| e.to_alias.as_str()).collect();
        assert_eq!(aliases, vec!["books.author", "books.editor"]);
        assert_eq!(
            plan.resolve(&paths[1]).unwrap().to_sql(),
            r#""books.editor"."name""#
        );
    }

    #[test]
    fn test_nested_path_extends_alias() {
        let paths = paths(&["author.publisher.name"]);
        let plan = JoinPlan::discover(&books(), paths.iter().map(Vec::as_slice)).unwrap();

        assert_eq!(plan.edges().len(), 2);
        assert_eq!(
            plan.join_sql()[1],
            r#"LEFT JOIN "publishers" AS "books.author.publisher" ON ("books.author"."publisher_id" = "books.author.publisher"."id")"#
        );
        assert_eq!(
            plan.resolve(&paths[0]).unwrap().to_sql(),
            r#""books.author.publisher"."name""#
        );
    }

    #[test]
    fn test_foreign_key_column_resolves_on_owner() {
        let paths = paths(&["author"]);
        let plan = JoinPlan::discover(&books(), paths.iter().map(Vec::as_slice)).unwrap();
        assert!(plan.edges().is_empty());
        assert_eq!(
            plan.resolve(&paths[0]).unwrap().to_sql(),
            r#""books"."author_id""#
        );
    }

    #[test]
    fn test_select_list_covers_joined_entities() {
        let paths = paths(&["author.name"]);
        let plan = JoinPlan::discover(&books(), paths.iter().map(Vec::as_slice)).unwrap();
        let columns = plan.select_list();
        assert_eq!(columns.len(), 4 + 4);
        assert!(columns.contains(&r#""books.author"."name" AS "books.author.name""#.to_string()));
    }

    #[test]
    fn test_bad_paths_are_reported() {
        let unknown = paths(&["isbn.code"]);
        assert!(matches!(
            JoinPlan::discover(&books(), unknown.iter().map(Vec::as_slice)),
            Err(QueryError::UnknownField { field, .. }) if field == "isbn"
        ));

        let not_relation = paths(&["title.length"]);
        assert!(matches!(
            JoinPlan::discover(&books(), not_relation.iter().map(Vec::as_slice)),
            Err(QueryError::NotARelation { field, .. }) if field == "title"
        ));

        let plan = JoinPlan::discover(&books(), std::iter::empty()).unwrap();
        assert!(matches!(
            plan.resolve(&paths(&["isbn"])[0]),
            Err(QueryError::UnknownField { .. })
        ));
    }
}
