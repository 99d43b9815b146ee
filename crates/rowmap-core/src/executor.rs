//! Connection lifecycle around a single command execution.

use std::future::Future;
use tracing::{debug, instrument, warn};

use crate::command::{Command, CommandInit, Parameter};
use crate::connection::{AsyncConnection, AsyncConnectionProvider, Connection, ConnectionProvider};
use crate::error::Result;

/// Runs one command per call against a connection taken from `provider`.
///
/// The connection is opened if needed and closed on every exit path, whatever
/// the action returns.
pub struct Executor<'a, P: ?Sized> {
    provider: &'a P,
    parameters: &'a [Parameter],
}

impl<'a, P: ?Sized> Executor<'a, P> {
    pub fn new(provider: &'a P, parameters: &'a [Parameter]) -> Self {
        Self { provider, parameters }
    }

    /// A fresh command carrying a copy of every stored parameter.
    fn command<I: CommandInit + ?Sized>(&self, init: &I) -> Command {
        let mut command = Command::new();
        init.init_command(&mut command);
        command.parameters.extend(self.parameters.iter().cloned());
        command
    }
}

type Cursor<P> = <<P as ConnectionProvider>::Connection as Connection>::Cursor;
type AsyncCursor<P> = <<P as AsyncConnectionProvider>::Connection as AsyncConnection>::Cursor;

impl<P: ConnectionProvider + ?Sized> Executor<'_, P> {
    pub fn execute<I, U, F>(&self, init: &I, action: F) -> Result<U>
    where
        I: CommandInit + ?Sized,
        F: FnOnce(&mut Cursor<P>) -> Result<U>,
    {
        self.run(self.command(init), action)
    }

    #[instrument(
        name = "execute",
        skip_all,
        fields(text = %command.text, kind = %command.kind, parameters = command.parameters.len())
    )]
    fn run<U, F>(&self, command: Command, action: F) -> Result<U>
    where
        F: FnOnce(&mut Cursor<P>) -> Result<U>,
    {
        let mut conn = self.provider.connection()?;
        let outcome = (|| {
            if !conn.is_open() {
                debug!("opening connection");
                conn.open()?;
            }
            let mut cursor = conn.execute(command)?;
            action(&mut cursor)
        })();
        debug!("closing connection");
        let close = conn.close();
        finish(outcome, close)
    }
}

impl<P: AsyncConnectionProvider + ?Sized> Executor<'_, P> {
    pub async fn execute_async<I, U, F, Fut>(&self, init: &I, action: F) -> Result<U>
    where
        I: CommandInit + ?Sized,
        F: FnOnce(AsyncCursor<P>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        self.run_async(self.command(init), action).await
    }

    #[instrument(
        name = "execute_async",
        skip_all,
        fields(text = %command.text, kind = %command.kind, parameters = command.parameters.len())
    )]
    async fn run_async<U, F, Fut>(&self, command: Command, action: F) -> Result<U>
    where
        F: FnOnce(AsyncCursor<P>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        let mut conn = self.provider.async_connection()?;
        let outcome = async {
            if !conn.is_open() {
                debug!("opening connection");
                conn.open_async().await?;
            }
            let cursor = conn.execute_async(command).await?;
            action(cursor).await
        }
        .await;
        debug!("closing connection");
        let close = conn.close_async().await;
        finish(outcome, close)
    }
}

/// The action's error wins over a close error.
fn finish<U>(outcome: Result<U>, close: Result<()>) -> Result<U> {
    match (outcome, close) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close connection after an earlier error");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandKind, RawSql, StoredProcedure};
    use crate::cursor;
    use crate::error::RowMapError;
    use crate::memory::{MemoryCursor, MemoryProvider, ResultSet};
    use crate::options::MapOptions;
    use crate::value::Value;
    use mockall::mock;
    use mockall::predicate::always;
    use std::sync::Mutex;

    mock! {
        pub Conn {}

        impl Connection for Conn {
            type Cursor = MemoryCursor;

            fn is_open(&self) -> bool;
            fn open(&mut self) -> Result<()>;
            fn close(&mut self) -> Result<()>;
            fn execute(&mut self, command: Command) -> Result<MemoryCursor>;
        }
    }

    struct OneShot(Mutex<Option<MockConn>>);

    impl ConnectionProvider for OneShot {
        type Connection = MockConn;

        fn connection(&self) -> Result<MockConn> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| RowMapError::execution("connection already taken"))
        }
    }

    fn provider(conn: MockConn) -> OneShot {
        OneShot(Mutex::new(Some(conn)))
    }

    #[test]
    fn test_opens_closed_connection_and_always_closes() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(false);
        conn.expect_open().times(1).returning(|| Ok(()));
        conn.expect_execute()
            .with(always())
            .times(1)
            .returning(|_| Ok(MemoryCursor::new(ResultSet::new(["n"]).row(vec![Value::I32(1)]))));
        conn.expect_close().times(1).returning(|| Ok(()));

        let provider = provider(conn);
        let got: i32 = Executor::new(&provider, &[])
            .execute(&RawSql("SELECT 1".into()), |c| cursor::first(c, &MapOptions::default()))
            .unwrap();
        assert_eq!(got, 1);
    }

    #[test]
    fn test_already_open_connection_is_not_reopened() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(true);
        conn.expect_open().never();
        conn.expect_execute()
            .returning(|_| Ok(MemoryCursor::new(ResultSet::new(["n"]))));
        conn.expect_close().times(1).returning(|| Ok(()));

        let provider = provider(conn);
        let got: Vec<i32> = Executor::new(&provider, &[])
            .execute(&RawSql("SELECT n".into()), |c| cursor::to_list(c, &MapOptions::default()))
            .unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_closes_when_action_fails() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(true);
        conn.expect_execute()
            .returning(|_| Ok(MemoryCursor::new(ResultSet::new(["n"]))));
        conn.expect_close()
            .times(1)
            .returning(|| Err(RowMapError::execution("close failed")));

        let provider = provider(conn);
        let err = Executor::new(&provider, &[])
            .execute(&RawSql("SELECT n".into()), |c| cursor::first::<i32, _>(c, &MapOptions::default()))
            .unwrap_err();
        assert!(matches!(err, RowMapError::NoElements));
    }

    #[test]
    fn test_closes_when_execution_fails() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(true);
        conn.expect_execute()
            .returning(|_| Err(RowMapError::execution("syntax error")));
        conn.expect_close().times(1).returning(|| Ok(()));

        let provider = provider(conn);
        let err = Executor::new(&provider, &[])
            .execute(&RawSql("SELEC".into()), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Execution error: syntax error");
    }

    #[test]
    fn test_close_error_surfaces_after_success() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(true);
        conn.expect_execute()
            .returning(|_| Ok(MemoryCursor::new(ResultSet::new(["n"]))));
        conn.expect_close()
            .returning(|| Err(RowMapError::execution("close failed")));

        let provider = provider(conn);
        let err = Executor::new(&provider, &[])
            .execute(&RawSql("SELECT n".into()), |_| Ok(()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Execution error: close failed");
    }

    #[test]
    fn test_parameters_and_kind_reach_the_command() {
        let mut conn = MockConn::new();
        conn.expect_is_open().return_const(true);
        conn.expect_execute()
            .withf(|command: &Command| {
                command.text == "get_user"
                    && command.kind == CommandKind::StoredProcedure
                    && command.parameters == vec![Parameter::new("id", 5)]
            })
            .times(1)
            .returning(|_| Ok(MemoryCursor::new(ResultSet::new(["n"]))));
        conn.expect_close().returning(|| Ok(()));

        let provider = provider(conn);
        let parameters = vec![Parameter::new("id", 5)];
        Executor::new(&provider, &parameters)
            .execute(&StoredProcedure("get_user".into()), |_| Ok(()))
            .unwrap();
    }

    #[tokio::test]
    async fn test_async_path_does_not_reopen_open_connection() {
        let provider = MemoryProvider::new()
            .preopened(true)
            .with_result("SELECT n", ResultSet::new(["n"]).row(vec![Value::I32(3)]));

        let got = Executor::new(&provider, &[])
            .execute_async(&RawSql("SELECT n".into()), |mut c| async move {
                cursor::first_async::<i32, _>(&mut c, &MapOptions::default()).await
            })
            .await
            .unwrap();
        assert_eq!(got, 3);
        assert_eq!(provider.open_count(), 0);
        assert_eq!(provider.close_count(), 1);
    }

    #[tokio::test]
    async fn test_async_path_opens_and_closes() {
        let provider = MemoryProvider::new()
            .with_result("SELECT n", ResultSet::new(["n"]).row(vec![Value::I64(4)]));

        let got = Executor::new(&provider, &[])
            .execute_async(&RawSql("SELECT n".into()), |mut c| async move {
                cursor::single_async::<i64, _>(&mut c, &MapOptions::default()).await
            })
            .await
            .unwrap();
        assert_eq!(got, 4);
        assert_eq!(provider.open_count(), 1);
        assert_eq!(provider.close_count(), 1);

        let err = Executor::new(&provider, &[])
            .execute_async(&RawSql("SELECT missing".into()), |_c| async move { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, RowMapError::Execution(_)));
        assert_eq!(provider.close_count(), 2);
    }
}
