//! Connection traits implemented by drivers.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::Result;
use crate::row::{AsyncRowCursor, RowCursor};

/// A blocking database connection.
pub trait Connection {
    type Cursor: RowCursor;

    fn is_open(&self) -> bool;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Execute a command and return a cursor positioned before the first row.
    fn execute(&mut self, command: Command) -> Result<Self::Cursor>;
}

/// A non-blocking database connection.
#[async_trait]
pub trait AsyncConnection: Send {
    type Cursor: AsyncRowCursor;

    fn is_open(&self) -> bool;

    async fn open_async(&mut self) -> Result<()>;

    async fn close_async(&mut self) -> Result<()>;

    async fn execute_async(&mut self, command: Command) -> Result<Self::Cursor>;
}

/// Source of blocking connections.
pub trait ConnectionProvider {
    type Connection: Connection;

    fn connection(&self) -> Result<Self::Connection>;
}

/// Source of non-blocking connections.
pub trait AsyncConnectionProvider: Send + Sync {
    type Connection: AsyncConnection;

    fn async_connection(&self) -> Result<Self::Connection>;
}
