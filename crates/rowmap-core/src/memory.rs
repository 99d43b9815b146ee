//! In-memory driver serving scripted result sets.
//!
//! Results are keyed by command text. The provider records every executed
//! command along with open and close counts, which makes it suitable for
//! exercising the execution pipeline without a database.

use async_trait::async_trait;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::command::Command;
use crate::connection::{AsyncConnection, AsyncConnectionProvider, Connection, ConnectionProvider};
use crate::error::{Result, RowMapError};
use crate::query::DatabaseExt;
use crate::row::{AsyncRowCursor, ColumnDescriptor, Row, RowCursor};
use crate::value::Value;

/// A scripted result: column schema plus rows of raw values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            columns: names
                .into_iter()
                .enumerate()
                .map(|(i, name)| ColumnDescriptor::new(name, i))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Attach type names to the columns, in order.
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        for (column, type_name) in self.columns.iter_mut().zip(types) {
            column.type_name = Some(type_name.into());
        }
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cursor over a [`ResultSet`].
#[derive(Debug)]
pub struct MemoryCursor {
    set: ResultSet,
    /// Index of the current row plus one; zero before the first advance.
    position: usize,
    advances: usize,
    state: Option<Arc<Mutex<MemoryState>>>,
}

impl MemoryCursor {
    pub fn new(set: ResultSet) -> Self {
        Self {
            set,
            position: 0,
            advances: 0,
            state: None,
        }
    }

    pub fn with_columns(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self::new(ResultSet { columns, rows })
    }

    /// Number of `advance` calls so far, including the one that hit the end.
    pub fn advances(&self) -> usize {
        self.advances
    }

    fn step(&mut self) -> bool {
        self.advances += 1;
        if self.position < self.set.rows.len() {
            self.position += 1;
            if let Some(state) = &self.state {
                lock(state).rows_fetched += 1;
            }
            true
        } else {
            self.position = self.set.rows.len() + 1;
            false
        }
    }

    fn current(&self) -> Option<&Vec<Value>> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.set.rows.get(i))
    }
}

impl Row for MemoryCursor {
    fn has_rows(&self) -> bool {
        !self.set.rows.is_empty()
    }

    fn field_count(&self) -> usize {
        self.set.columns.len()
    }

    fn value_at(&self, ordinal: usize) -> Result<Value> {
        let field_count = self.field_count();
        if ordinal >= field_count {
            return Err(RowMapError::ColumnOutOfRange { ordinal, field_count });
        }
        let row = self
            .current()
            .ok_or_else(|| RowMapError::execution("cursor is not positioned on a row"))?;
        Ok(row.get(ordinal).cloned().unwrap_or_default())
    }

    fn name_at(&self, ordinal: usize) -> Option<&str> {
        self.set.columns.get(ordinal).map(|c| c.name.as_str())
    }

    fn type_at(&self, ordinal: usize) -> Option<&str> {
        self.set.columns.get(ordinal)?.type_name.as_deref()
    }

    fn column_schema(&self) -> Vec<ColumnDescriptor> {
        self.set.columns.clone()
    }
}

impl RowCursor for MemoryCursor {
    fn advance(&mut self) -> Result<bool> {
        Ok(self.step())
    }
}

#[async_trait]
impl AsyncRowCursor for MemoryCursor {
    async fn advance_async(&mut self) -> Result<bool> {
        tokio::task::yield_now().await;
        Ok(self.step())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    results: HashMap<String, ResultSet>,
    failures: HashMap<String, String>,
    executed: Vec<Command>,
    opens: usize,
    closes: usize,
    rows_fetched: usize,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection provider backed by scripted results.
///
/// Cloning shares the underlying state.
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    state: Arc<Mutex<MemoryState>>,
    preopened: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out connections that report themselves as already open.
    pub fn preopened(mut self, preopened: bool) -> Self {
        self.preopened = preopened;
        self
    }

    /// Serve `set` whenever a command with exactly this text is executed.
    pub fn with_result(self, text: impl Into<String>, set: ResultSet) -> Self {
        lock(&self.state).results.insert(text.into(), set);
        self
    }

    /// Fail with an execution error whenever a command with this text is executed.
    pub fn with_failure(self, text: impl Into<String>, message: impl Into<String>) -> Self {
        lock(&self.state).failures.insert(text.into(), message.into());
        self
    }

    pub fn executed(&self) -> Vec<Command> {
        lock(&self.state).executed.clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.state).opens
    }

    pub fn close_count(&self) -> usize {
        lock(&self.state).closes
    }

    pub fn rows_fetched(&self) -> usize {
        lock(&self.state).rows_fetched
    }

    fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            state: Arc::clone(&self.state),
            open: self.preopened,
        }
    }
}

impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    fn connection(&self) -> Result<MemoryConnection> {
        Ok(self.connect())
    }
}

impl AsyncConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    fn async_connection(&self) -> Result<MemoryConnection> {
        Ok(self.connect())
    }
}

impl DatabaseExt for MemoryProvider {}

#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    open: bool,
}

impl MemoryConnection {
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn do_open(&mut self) {
        lock(&self.state).opens += 1;
        self.open = true;
        debug!("memory connection opened");
    }

    fn do_close(&mut self) {
        lock(&self.state).closes += 1;
        self.open = false;
        debug!("memory connection closed");
    }

    fn run(&mut self, command: Command) -> Result<MemoryCursor> {
        if !self.open {
            return Err(RowMapError::execution("connection is not open"));
        }
        let mut state = lock(&self.state);
        let text = command.text.clone();
        state.executed.push(command);

        if let Some(message) = state.failures.get(&text) {
            return Err(RowMapError::execution(message.clone()));
        }
        let set = state
            .results
            .get(&text)
            .cloned()
            .ok_or_else(|| RowMapError::execution(format!("no result scripted for `{text}`")))?;
        drop(state);

        Ok(MemoryCursor {
            state: Some(Arc::clone(&self.state)),
            ..MemoryCursor::new(set)
        })
    }
}

impl Connection for MemoryConnection {
    type Cursor = MemoryCursor;

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<()> {
        self.do_open();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.do_close();
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<MemoryCursor> {
        self.run(command)
    }
}

#[async_trait]
impl AsyncConnection for MemoryConnection {
    type Cursor = MemoryCursor;

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open_async(&mut self) -> Result<()> {
        tokio::task::yield_now().await;
        self.do_open();
        Ok(())
    }

    async fn close_async(&mut self) -> Result<()> {
        self.do_close();
        Ok(())
    }

    async fn execute_async(&mut self, command: Command) -> Result<MemoryCursor> {
        tokio::task::yield_now().await;
        self.run(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_cursor_walks_rows() {
        let mut cursor = MemoryCursor::new(
            ResultSet::new(["a"]).row(vec![Value::I32(1)]).row(vec![Value::I32(2)]),
        );
        assert!(cursor.has_rows());
        assert!(cursor.value_at(0).is_err());
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value_at(0).unwrap(), Value::I32(1));
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value_at(0).unwrap(), Value::I32(2));
        assert!(!cursor.advance().unwrap());
        assert!(!cursor.advance().unwrap());
        assert!(matches!(
            cursor.value_at(1),
            Err(RowMapError::ColumnOutOfRange { ordinal: 1, field_count: 1 })
        ));
    }

    #[test]
    fn test_connection_records_activity() {
        let db = MemoryProvider::new()
            .with_result("q", ResultSet::new(["a"]).row(vec![Value::Null]))
            .with_failure("bad", "deadlock");

        let mut conn = db.connection().unwrap();
        assert!(!conn.is_open());
        assert!(Connection::execute(&mut conn, Command::new()).is_err());

        Connection::open(&mut conn).unwrap();
        let command = Command {
            text: "q".into(),
            parameters: params! { "x" => 1 },
            ..Command::default()
        };
        let mut cursor = Connection::execute(&mut conn, command.clone()).unwrap();
        while cursor.advance().unwrap() {}

        let err = Connection::execute(
            &mut conn,
            Command {
                text: "bad".into(),
                ..Command::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Execution error: deadlock");

        Connection::close(&mut conn).unwrap();
        assert_eq!(db.open_count(), 1);
        assert_eq!(db.close_count(), 1);
        assert_eq!(db.rows_fetched(), 1);
        assert_eq!(db.executed().len(), 2);
        assert_eq!(db.executed()[0], command);
    }

    #[test]
    fn test_async_cursor_yields_rows() {
        let mut cursor = MemoryCursor::new(ResultSet::new(["a"]).row(vec![Value::Bool(true)]));
        assert!(tokio_test::block_on(cursor.advance_async()).unwrap());
        assert!(!tokio_test::block_on(cursor.advance_async()).unwrap());
        assert_eq!(cursor.advances(), 2);
    }

    #[tokio::test]
    async fn test_preopened_connections() {
        let db = MemoryProvider::new().preopened(true);
        let conn = db.async_connection().unwrap();
        assert!(conn.is_open());
    }
}
