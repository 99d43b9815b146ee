//! Forward-only row cursor abstraction implemented by drivers.

use async_trait::async_trait;
use smol_str::SmolStr;

use crate::error::Result;
use crate::value::Value;

/// One entry of a cursor's column schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: SmolStr,
    /// Position in the row. Synthetic columns may not carry one.
    pub ordinal: Option<usize>,
    /// Driver-specific type name, e.g. `BIGINT`.
    pub type_name: Option<SmolStr>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<SmolStr>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            ordinal: Some(ordinal),
            type_name: None,
        }
    }

    /// A column without a position.
    pub fn unordered(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ordinal: None,
            type_name: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<SmolStr>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Read access to the current row of a cursor.
pub trait Row {
    /// Whether the result set has at least one row.
    fn has_rows(&self) -> bool;

    fn field_count(&self) -> usize;

    /// Value of the column at `ordinal` in the current row, or `Value::Null`.
    fn value_at(&self, ordinal: usize) -> Result<Value>;

    fn name_at(&self, ordinal: usize) -> Option<&str>;

    fn type_at(&self, ordinal: usize) -> Option<&str> {
        let _ = ordinal;
        None
    }

    fn column_schema(&self) -> Vec<ColumnDescriptor> {
        (0..self.field_count())
            .filter_map(|i| {
                let name = self.name_at(i)?;
                let column = ColumnDescriptor::new(name, i);
                Some(match self.type_at(i) {
                    Some(t) => column.with_type(t),
                    None => column,
                })
            })
            .collect()
    }
}

/// Blocking cursor.
pub trait RowCursor: Row {
    /// Move to the next row. Returns `false` once the result set is exhausted.
    fn advance(&mut self) -> Result<bool>;
}

/// Non-blocking cursor.
#[async_trait]
pub trait AsyncRowCursor: Row + Send {
    async fn advance_async(&mut self) -> Result<bool>;
}
