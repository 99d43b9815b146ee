use async_trait::async_trait;
use rowmap_core::{AsyncRowCursor, ColumnDescriptor, Result, Row, RowMapError, Value};
use sqlx::mysql::MySqlRow;
use sqlx::Row as _;

use crate::decode::decode_value;

/// Cursor over a fully fetched MySQL result set.
///
/// Values are decoded lazily, one cell per `value_at` call. The whole result
/// is fetched when the command executes, so `first` still reads every row
/// from the server and `advance_async` completes without suspending.
pub struct MySqlCursor {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<MySqlRow>,
    /// Index of the current row plus one; zero before the first advance.
    position: usize,
}

impl MySqlCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<MySqlRow>) -> Self {
        Self {
            columns,
            rows,
            position: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn current(&self) -> Option<&MySqlRow> {
        self.position.checked_sub(1).and_then(|i| self.rows.get(i))
    }
}

impl Row for MySqlCursor {
    fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn value_at(&self, ordinal: usize) -> Result<Value> {
        let field_count = self.field_count();
        if ordinal >= field_count {
            return Err(RowMapError::ColumnOutOfRange { ordinal, field_count });
        }
        let row = self
            .current()
            .ok_or_else(|| RowMapError::execution("cursor is not positioned on a row"))?;
        let raw = row.try_get_raw(ordinal).map_err(RowMapError::execution)?;
        Ok(decode_value(raw)?)
    }

    fn name_at(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal).map(|c| c.name.as_str())
    }

    fn type_at(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal)?.type_name.as_deref()
    }

    fn column_schema(&self) -> Vec<ColumnDescriptor> {
        self.columns.clone()
    }
}

#[async_trait]
impl AsyncRowCursor for MySqlCursor {
    async fn advance_async(&mut self) -> Result<bool> {
        if self.position < self.rows.len() {
            self.position += 1;
            Ok(true)
        } else {
            self.position = self.rows.len() + 1;
            Ok(false)
        }
    }
}
