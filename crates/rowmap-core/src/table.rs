//! Untyped tabular snapshot of a result set.

use smol_str::SmolStr;
use tracing::trace;

use crate::error::{Result, RowMapError};
use crate::options::MapOptions;
use crate::row::{AsyncRowCursor, Row, RowCursor};
use crate::shape::FromValue;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataColumn {
    pub name: SmolStr,
    pub type_name: Option<SmolStr>,
}

/// Column names, type names and raw values of every row, copied positionally.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<DataColumn>,
    rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<DataColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn columns_of<R: Row + ?Sized>(row: &R) -> Vec<DataColumn> {
        (0..row.field_count())
            .map(|i| DataColumn {
                name: SmolStr::new(row.name_at(i).unwrap_or_default()),
                type_name: row.type_at(i).map(SmolStr::new),
            })
            .collect()
    }

    fn copy_row<R: Row + ?Sized>(&mut self, row: &R) -> Result<()> {
        let values = (0..self.columns.len())
            .map(|i| row.value_at(i))
            .collect::<Result<Vec<_>>>()?;
        self.rows.push(values);
        trace!(row = self.rows.len(), "copied row into table");
        Ok(())
    }

    pub fn from_cursor<C: RowCursor + ?Sized>(cursor: &mut C) -> Result<Self> {
        let mut table = Self::new(Self::columns_of(&*cursor));
        if !cursor.has_rows() {
            return Ok(table);
        }
        while cursor.advance()? {
            table.copy_row(&*cursor)?;
        }
        Ok(table)
    }

    pub async fn from_cursor_async<C: AsyncRowCursor + ?Sized>(cursor: &mut C) -> Result<Self> {
        let mut table = Self::new(Self::columns_of(&*cursor));
        if !cursor.has_rows() {
            return Ok(table);
        }
        while cursor.advance_async().await? {
            table.copy_row(&*cursor)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    /// Position of a column, ignoring case.
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn push_row(&mut self, values: Vec<Value>) {
        self.rows.push(values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Typed access to one cell, through general conversion.
    ///
    /// Returns `Ok(None)` when the row or column does not exist.
    pub fn get<T: FromValue>(&self, row: usize, column: &str, options: &MapOptions) -> Result<Option<T>> {
        let (Some(values), Some(ordinal)) = (self.rows.get(row), self.ordinal_of(column)) else {
            return Ok(None);
        };
        let value = values.get(ordinal).cloned().ok_or(RowMapError::ColumnOutOfRange {
            ordinal,
            field_count: values.len(),
        })?;
        let out = if value.is_null() {
            T::zero()
        } else {
            T::convert(value, options).map_err(|e| e.with_column(column))?
        };
        Ok(Some(out))
    }
}
