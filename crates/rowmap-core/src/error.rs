//! Error types for rowmap core

use std::fmt;
use thiserror::Error;

use crate::shape::TargetKind;
use crate::value::ValueKind;

/// Coarse grouping of [`RowMapError`] variants.
///
/// Cardinality errors describe an unexpected number of rows and are usually
/// recoverable by the caller; data errors mean a row could not be mapped onto
/// the target type; execution errors come from the connection or driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Cardinality,
    Data,
    Execution,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::Cardinality => "cardinality",
            ErrorClass::Data => "data",
            ErrorClass::Execution => "execution",
        })
    }
}

#[derive(Error, Debug)]
pub enum RowMapError {
    #[error("Type mismatch{}: expected {expected}, found {found}", column_suffix(.column))]
    TypeMismatch {
        column: Option<String>,
        expected: TargetKind,
        found: ValueKind,
    },

    #[error("Cannot parse {input:?} as a unique identifier{}", column_suffix(.column))]
    IdentifierParse {
        column: Option<String>,
        input: String,
        #[source]
        source: uuid::Error,
    },

    #[error("Unexpected NULL{} for non-nullable {expected}", column_suffix(.column))]
    UnexpectedNull {
        column: Option<String>,
        expected: TargetKind,
    },

    #[error("Value {value} is not a variant of {target}{}", column_suffix(.column))]
    InvalidEnumValue {
        column: Option<String>,
        target: &'static str,
        value: i64,
    },

    #[error("Cannot convert {value} to {expected}{}", column_suffix(.column))]
    Conversion {
        column: Option<String>,
        expected: TargetKind,
        value: String,
    },

    #[error("Column `{column}` has no ordinal")]
    MissingOrdinal { column: String },

    #[error("Column ordinal {ordinal} is out of range for a row of {field_count} columns")]
    ColumnOutOfRange { ordinal: usize, field_count: usize },

    #[error("Field `{field}` has no matching column")]
    UnmappedField { field: String },

    #[error("Sequence contains no elements")]
    NoElements,

    #[error("Sequence contains more than one element")]
    MultipleElements,

    #[error("Execution error: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type Result<T> = std::result::Result<T, RowMapError>;

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(c) => format!(" in column `{c}`"),
        None => String::new(),
    }
}

impl RowMapError {
    /// Wrap a driver or connection failure without translating it.
    pub fn execution<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        RowMapError::Execution(err.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            RowMapError::NoElements | RowMapError::MultipleElements => ErrorClass::Cardinality,
            RowMapError::Execution(_) => ErrorClass::Execution,
            _ => ErrorClass::Data,
        }
    }

    pub fn is_cardinality(&self) -> bool {
        self.class() == ErrorClass::Cardinality
    }

    /// Attach the column name to a data error raised by a value conversion.
    ///
    /// Errors that already name a column, and non-data errors, are returned unchanged.
    pub fn with_column(mut self, name: &str) -> Self {
        match &mut self {
            RowMapError::TypeMismatch { column, .. }
            | RowMapError::IdentifierParse { column, .. }
            | RowMapError::UnexpectedNull { column, .. }
            | RowMapError::InvalidEnumValue { column, .. }
            | RowMapError::Conversion { column, .. } => {
                if column.is_none() {
                    *column = Some(name.to_string());
                }
            }
            _ => {}
        }
        self
    }
}

impl From<anyhow::Error> for RowMapError {
    fn from(err: anyhow::Error) -> Self {
        RowMapError::Execution(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(RowMapError::NoElements.class(), ErrorClass::Cardinality);
        assert_eq!(RowMapError::MultipleElements.class(), ErrorClass::Cardinality);
        assert_eq!(
            RowMapError::execution(std::io::Error::other("boom")).class(),
            ErrorClass::Execution
        );
        assert_eq!(
            RowMapError::MissingOrdinal { column: "id".into() }.class(),
            ErrorClass::Data
        );
    }

    #[test]
    fn test_with_column_only_fills_empty_slot() {
        let err = RowMapError::TypeMismatch {
            column: None,
            expected: TargetKind::I32,
            found: ValueKind::Text,
        }
        .with_column("age")
        .with_column("other");

        match &err {
            RowMapError::TypeMismatch { column, .. } => assert_eq!(column.as_deref(), Some("age")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Type mismatch in column `age`: expected i32, found text"
        );
    }

    #[test]
    fn test_anyhow_maps_to_execution() {
        let err: RowMapError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, RowMapError::Execution(_)));
        assert_eq!(err.to_string(), "Execution error: connection refused");
    }
}
