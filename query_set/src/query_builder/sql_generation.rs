//! Statement compiler
//!
//! Produces SELECT/INSERT/UPDATE/DELETE/COUNT text with `$n` placeholders
//! and the matching positional parameter list.

use crate::chain::Action;
use crate::errors::QueryError;
use crate::query_builder::filter::{FilterKey, SettledFilter, SettledRecord};
use crate::query_builder::join::JoinPlan;
use crate::query_builder::operator::relation_key;
use crate::query_builder::ordering::SortKey;
use crate::query_builder::pagination::Window;
use crate::query_builder::where_clause::WhereCompiler;
use crate::schema::{ColumnDescriptor, Direction, EntityDescriptor};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use type_mapping::PostgresValue;

/// Double-quote an identifier, doubling any embedded quote
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Positional parameter list local to one compilation pass
#[derive(Debug, Default)]
pub struct Params {
    values: Vec<PostgresValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a value and return its placeholder. NULL is written inline.
    pub fn bind(&mut self, value: PostgresValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        let cast = value.placeholder_cast();
        self.values.push(value);
        match cast {
            Some(cast) => format!("${}::{}", self.values.len(), cast),
            None => format!("${}", self.values.len()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<PostgresValue> {
        self.values
    }
}

/// Statement text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<PostgresValue>,
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Everything the compiler needs, with every operand settled
#[derive(Debug, Clone)]
pub struct Statement {
    pub action: Action,
    pub filters: Vec<SettledFilter>,
    pub order: Vec<SortKey>,
    pub window: Window,
    pub data: Vec<SettledRecord>,
}

enum Projection {
    /// Every column of the base entity and of each joined entity
    Full,
    /// Only the base primary key, for mutation and count subqueries
    Ids,
}

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn compile(entity: &Arc<dyn EntityDescriptor>, stmt: &Statement) -> Result<CompiledQuery, QueryError> {
        let mut params = Params::new();
        let sql = match stmt.action {
            Action::Select => Self::build_select(entity, stmt, Projection::Full, &mut params)?,
            Action::Count => Self::build_count(entity, stmt, &mut params)?,
            Action::Update => Self::build_update(entity, stmt, &mut params)?,
            Action::Delete => Self::build_delete(entity, stmt, &mut params)?,
            Action::Insert => Self::build_insert(entity, &stmt.data, &mut params)?,
        };
        Ok(CompiledQuery {
            sql,
            params: params.into_values(),
        })
    }

    fn build_select(
        entity: &Arc<dyn EntityDescriptor>,
        stmt: &Statement,
        projection: Projection,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let mut paths = Vec::new();
        for filter in &stmt.filters {
            for key in filter.keys() {
                paths.push(FilterKey::parse(key)?.path);
            }
        }
        paths.extend(stmt.order.iter().map(|key| key.path.clone()));

        let plan = JoinPlan::discover(entity, paths.iter().map(Vec::as_slice))?;

        let columns = match projection {
            Projection::Full => plan.select_list(),
            Projection::Ids => vec![Self::id_column(entity)],
        };

        let mut parts = vec![
            format!("SELECT {}", columns.join(", ")),
            format!("FROM {}", quote_ident(entity.table_name())),
        ];
        parts.extend(plan.join_sql());

        if let Some(where_sql) = WhereCompiler::new(&plan).compile_all(&stmt.filters, params)? {
            parts.push(format!("WHERE {}", where_sql));
        }

        if !stmt.order.is_empty() {
            let order = stmt
                .order
                .iter()
                .map(|key| {
                    plan.resolve(&key.path)
                        .map(|scoped| format!("{} {}", scoped.to_sql(), key.order.to_sql()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            parts.push(format!("ORDER BY {}", order.join(", ")));
        }

        parts.push(stmt.window.to_sql());
        Ok(parts.join(" "))
    }

    fn build_count(
        entity: &Arc<dyn EntityDescriptor>,
        stmt: &Statement,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let inner = Self::build_select(entity, stmt, Projection::Ids, params)?;
        Ok(format!(
            "SELECT COUNT(*) AS \"count\" FROM ({}) AS \"counted\"",
            inner
        ))
    }

    fn build_update(
        entity: &Arc<dyn EntityDescriptor>,
        stmt: &Statement,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let record = stmt
            .data
            .first()
            .ok_or_else(|| QueryError::EmptyMutation(entity.display_name().to_string()))?;

        let mut assignments = Vec::new();
        for (field, value) in record.iter() {
            let Some(column) = entity.column(field) else {
                continue;
            };
            let value = column.to_sql(relation_key(column, value), Direction::Write)?;
            assignments.push(format!("{} = {}", quote_ident(&column.name), params.bind(value)));
        }
        if assignments.is_empty() {
            return Err(QueryError::EmptyMutation(entity.display_name().to_string()));
        }

        let targets = Self::build_select(entity, stmt, Projection::Ids, params)?;
        Ok(format!(
            "UPDATE {} SET {} WHERE {} IN ({})",
            quote_ident(entity.table_name()),
            assignments.join(", "),
            Self::id_column(entity),
            targets
        ))
    }

    fn build_delete(
        entity: &Arc<dyn EntityDescriptor>,
        stmt: &Statement,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let targets = Self::build_select(entity, stmt, Projection::Ids, params)?;
        Ok(format!(
            "DELETE FROM {} WHERE {} IN ({})",
            quote_ident(entity.table_name()),
            Self::id_column(entity),
            targets
        ))
    }

    fn build_insert(
        entity: &Arc<dyn EntityDescriptor>,
        records: &[SettledRecord],
        params: &mut Params,
    ) -> Result<String, QueryError> {
        if records.is_empty() {
            return Err(QueryError::EmptyMutation(entity.display_name().to_string()));
        }

        // union of schema-known fields, in first-seen order
        let mut columns = Vec::new();
        for record in records {
            for (field, _) in record.iter() {
                if let Some(column) = entity.column(field) {
                    if !columns.iter().any(|c: &&ColumnDescriptor| c.field == column.field) {
                        columns.push(column);
                    }
                }
            }
        }

        let table = quote_ident(entity.table_name());
        let returning = entity.select_columns(entity.table_name()).join(", ");

        if columns.is_empty() {
            if records.len() > 1 {
                return Err(QueryError::EmptyMutation(entity.display_name().to_string()));
            }
            return Ok(format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning));
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut cells = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = record
                    .iter()
                    .find(|(field, _)| *field == column.field)
                    .map(|(_, value)| value);
                let cell = match value {
                    Some(value) => {
                        params.bind(column.to_sql(relation_key(column, value), Direction::Write)?)
                    }
                    None => "DEFAULT".to_string(),
                };
                cells.push(cell);
            }
            rows.push(format!("({})", cells.join(", ")));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING {}",
            table,
            columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", "),
            rows.join(", "),
            returning
        ))
    }

    fn id_column(entity: &Arc<dyn EntityDescriptor>) -> String {
        format!(
            "{}.{}",
            quote_ident(entity.table_name()),
            quote_ident(entity.primary_key())
        )
    }
}
