//! MySQL connections and the provider that hands them out

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rowmap_core::{
    format_time_span, AsyncConnection, AsyncConnectionProvider, ColumnDescriptor, Command, CommandKind,
    DatabaseExt, Result, RowMapError, Value,
};
use rowmap_shared::{DatabaseConfig, QueryMetrics};
use sqlx::mysql::{MySql, MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection as _, Executor as _, TypeInfo};
use tracing::{debug, info, instrument};

use crate::cursor::MySqlCursor;

/// Opens one [`MySqlConnection`] per query execution.
#[derive(Clone, Debug)]
pub struct MySqlProvider {
    options: MySqlConnectOptions,
    connect_timeout: Duration,
    log_statements: bool,
}

impl MySqlProvider {
    pub fn new(options: MySqlConnectOptions) -> Self {
        Self {
            options,
            connect_timeout: Duration::from_secs(30),
            log_statements: false,
        }
    }

    /// Parse a `mysql://` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(url)
            .map_err(|e| RowMapError::execution(format!("Invalid connection options: {}", e)))?;
        Ok(Self::new(options))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::from_url(&config.url)?
            .connect_timeout(config.connect_timeout())
            .log_statements(config.log_statements))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = self.options.clone();
        if self.log_statements {
            options
        } else {
            options.disable_statement_logging()
        }
    }
}

impl AsyncConnectionProvider for MySqlProvider {
    type Connection = MySqlConnection;

    fn async_connection(&self) -> Result<MySqlConnection> {
        Ok(MySqlConnection::new(self.clone()))
    }
}

impl DatabaseExt for MySqlProvider {}

/// A single MySQL session, connected lazily by the executor.
pub struct MySqlConnection {
    provider: MySqlProvider,
    conn: Option<sqlx::MySqlConnection>,
}

impl MySqlConnection {
    pub fn new(provider: MySqlProvider) -> Self {
        Self { provider, conn: None }
    }

    async fn fetch(&mut self, command: &Command) -> Result<MySqlCursor> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| RowMapError::execution("connection is not open"))?;

        let sql = statement_text(command);
        if self.provider.log_statements {
            debug!(%sql, parameters = command.parameters.len(), "Executing statement");
        }

        let query = command
            .parameters
            .iter()
            .fold(sqlx::query(&sql), |query, p| bind_value(query, &p.value));
        let rows: Vec<MySqlRow> = query.fetch_all(&mut *conn).await.map_err(RowMapError::execution)?;

        // An empty result still carries its column list; ask the server for it.
        let columns = match rows.first() {
            Some(row) => describe_columns(sqlx::Row::columns(row)),
            None => match (&mut *conn).describe(&sql).await {
                Ok(described) => describe_columns(described.columns()),
                Err(e) => {
                    debug!(error = %e, "No column metadata for empty result");
                    Vec::new()
                }
            },
        };

        Ok(MySqlCursor::new(columns, rows))
    }
}

#[async_trait]
impl AsyncConnection for MySqlConnection {
    type Cursor = MySqlCursor;

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    #[instrument(skip(self))]
    async fn open_async(&mut self) -> Result<()> {
        let timeout = self.provider.connect_timeout;
        let conn = tokio::time::timeout(timeout, self.provider.connect_options().connect())
            .await
            .map_err(|_| RowMapError::execution(format!("Connection timed out after {:?}", timeout)))?
            .map_err(RowMapError::execution)?;

        self.conn = Some(conn);
        info!("MySQL connection opened");
        Ok(())
    }

    async fn close_async(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(RowMapError::execution)?;
            debug!("MySQL connection closed");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(kind = %command.kind))]
    async fn execute_async(&mut self, command: Command) -> Result<MySqlCursor> {
        let kind = command.kind.to_string();
        let timer = QueryMetrics::command_timer(&kind);
        let result = self.fetch(&command).await;
        timer.finish();

        match &result {
            Ok(cursor) => {
                QueryMetrics::command_executed(&kind);
                QueryMetrics::rows_fetched(cursor.row_count() as u64);
            }
            Err(e) => QueryMetrics::command_failed(&kind, &e.class().to_string()),
        }
        result
    }
}

/// The statement sent to the server: text commands verbatim, stored
/// procedures as a `CALL` with one placeholder per parameter.
pub fn statement_text(command: &Command) -> String {
    match command.kind {
        CommandKind::Text => command.text.clone(),
        CommandKind::StoredProcedure => {
            let placeholders = vec!["?"; command.parameters.len()].join(", ");
            format!("CALL {}({})", command.text, placeholders)
        }
    }
}

fn describe_columns(columns: &[MySqlColumn]) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .map(|c| ColumnDescriptor::new(c.name(), c.ordinal()).with_type(c.type_info().name()))
        .collect()
}

fn bind_value<'q>(query: Query<'q, MySql, MySqlArguments>, value: &Value) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::I8(v) => query.bind(*v),
        Value::I16(v) => query.bind(*v),
        Value::I32(v) => query.bind(*v),
        Value::I64(v) => query.bind(*v),
        Value::U8(v) => query.bind(*v),
        Value::U16(v) => query.bind(*v),
        Value::U32(v) => query.bind(*v),
        Value::U64(v) => query.bind(*v),
        Value::F32(v) => query.bind(*v),
        Value::F64(v) => query.bind(*v),
        Value::Char(c) => query.bind(c.to_string()),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.to_vec()),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeOffset(dt) => query.bind(dt.with_timezone(&Utc)),
        Value::TimeSpan(span) => query.bind(format_time_span(*span)),
        Value::Uuid(id) => query.bind(id.hyphenated().to_string()),
    }
}
