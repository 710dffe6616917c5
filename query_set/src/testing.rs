//! In-memory collaborators for tests

use crate::connection::{Connection, ConnectionSource, RowChannel};
use crate::errors::EngineError;
use crate::schema::{ColumnDescriptor, EntityDescriptor, Relation, Table};
use crate::transform::Row;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use type_mapping::{ColumnType, PostgresValue};

pub(crate) fn authors() -> Arc<dyn EntityDescriptor> {
    Table::new("authors", "Author")
        .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
        .with_column(ColumnDescriptor::plain("name", ColumnType::Text))
        .with_column(ColumnDescriptor::plain("email", ColumnType::Text).nullable())
        .into_entity()
}

pub(crate) fn books() -> Arc<dyn EntityDescriptor> {
    Table::new("books", "Book")
        .with_column(ColumnDescriptor::plain("id", ColumnType::Integer))
        .with_column(ColumnDescriptor::plain("title", ColumnType::Text))
        .with_column(ColumnDescriptor::foreign_key(
            "author",
            "author_id",
            ColumnType::Integer,
            Relation::lazy(authors),
        ))
        .into_entity()
}

pub(crate) fn book_row(id: i32, title: &str, author: i32) -> Row {
    Row::new()
        .with("books.id", id)
        .with("books.title", title)
        .with("books.author", author)
}

#[derive(Default)]
pub(crate) struct FakeState {
    statements: Mutex<Vec<(String, Vec<PostgresValue>)>>,
    results: Mutex<VecDeque<Vec<Result<Row, String>>>>,
    affected: AtomicU64,
    fail_acquire: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
    produced: AtomicUsize,
}

/// Scripted connection pool. Each `query` call consumes the next scripted
/// result set; rows are produced lazily, one per poll.
#[derive(Default)]
pub(crate) struct FakeSource {
    state: Arc<FakeState>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, rows: Vec<Result<Row, String>>) {
        self.state.results.lock().unwrap().push_back(rows);
    }

    pub fn script_rows(&self, rows: Vec<Row>) {
        self.script(rows.into_iter().map(Ok).collect());
    }

    pub fn set_affected(&self, affected: u64) {
        self.state.affected.store(affected, Ordering::SeqCst);
    }

    pub fn fail_acquire(&self) {
        self.state.fail_acquire.store(true, Ordering::SeqCst);
    }

    pub fn statements(&self) -> Vec<(String, Vec<PostgresValue>)> {
        self.state.statements.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> String {
        self.statements()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }

    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn produced(&self) -> usize {
        self.state.produced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for FakeSource {
    async fn acquire(&self) -> Result<Box<dyn Connection>, EngineError> {
        if self.state.fail_acquire.load(Ordering::SeqCst) {
            return Err("pool exhausted".into());
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    state: Arc<FakeState>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn query(self: Box<Self>, sql: String, params: Vec<PostgresValue>) -> RowChannel {
        self.state.statements.lock().unwrap().push((sql, params));
        let rows = self
            .state
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let conn = self;
        stream::iter(rows)
            .map(move |row| {
                conn.state.produced.fetch_add(1, Ordering::SeqCst);
                row.map_err(|e| -> EngineError { e.into() })
            })
            .boxed()
    }

    async fn execute(self: Box<Self>, sql: String, params: Vec<PostgresValue>) -> Result<u64, EngineError> {
        self.state.statements.lock().unwrap().push((sql, params));
        Ok(self.state.affected.load(Ordering::SeqCst))
    }
}
