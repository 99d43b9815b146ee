//! Per-row object construction.
//!
//! [`FromRow`] is implemented for every scalar type, `Option` of each, tuples
//! up to arity 12, and by `#[derive(FromRow)]` for structs. The helpers in this
//! module hold the shape-specific logic that those impls delegate to.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use uuid::Uuid;

use crate::error::{Result, RowMapError};
use crate::model::RowModel;
use crate::options::MapOptions;
use crate::row::Row;
use crate::schema::SchemaMapping;
use crate::shape::{FromValue, Shape};
use crate::value::Value;

/// A type that can be built from the current row of a cursor.
pub trait FromRow: Sized + 'static {
    const SHAPE: Shape;

    /// Field descriptors of a composite type.
    fn model() -> Option<&'static RowModel<Self>> {
        None
    }

    fn from_row<R: Row + ?Sized>(row: &R, mapping: &SchemaMapping, options: &MapOptions) -> Result<Self>;
}

/// Read column 0 with direct assignment.
pub fn simple<T: FromValue, R: Row + ?Sized>(row: &R, options: &MapOptions) -> Result<T> {
    let value = row.value_at(0)?;
    T::from_value(value, options).map_err(|e| match row.name_at(0) {
        Some(name) => e.with_column(name),
        None => e,
    })
}

/// Read column `ordinal` with general conversion, substituting zero on null.
pub fn tuple_field<T: FromValue, R: Row + ?Sized>(row: &R, ordinal: usize, options: &MapOptions) -> Result<T> {
    let value = row.value_at(ordinal)?;
    let out = if value.is_null() {
        Ok(T::zero())
    } else {
        T::convert(value, options)
    };
    out.map_err(|e| match row.name_at(ordinal) {
        Some(name) => e.with_column(name),
        None => e,
    })
}

/// Build a composite from `T::default()` and its field model.
///
/// Fields whose column is absent from `mapping` receive their zero value.
pub fn composite<T, R>(row: &R, mapping: &SchemaMapping, options: &MapOptions) -> Result<T>
where
    T: FromRow + Default + 'static,
    R: Row + ?Sized,
{
    let mut out = T::default();
    let Some(model) = T::model() else {
        return Ok(out);
    };

    for field in &model.fields {
        let value = match mapping.get(&field.column) {
            Some(column) => {
                let ordinal = column.ordinal.ok_or_else(|| RowMapError::MissingOrdinal {
                    column: column.name.to_string(),
                })?;
                row.value_at(ordinal)?
            }
            None => Value::Null,
        };
        field
            .assign(&mut out, value, options)
            .map_err(|e| e.with_column(&field.column))?;
    }
    Ok(out)
}

macro_rules! impl_simple_row {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromRow for $t {
                const SHAPE: Shape = Shape::Simple;

                fn from_row<R: Row + ?Sized>(row: &R, _mapping: &SchemaMapping, options: &MapOptions) -> Result<Self> {
                    simple(row, options)
                }
            }
        )*
    };
}

impl_simple_row! {
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char,
    String, Vec<char>, Vec<u8>, Bytes,
    NaiveDateTime, DateTime<FixedOffset>, chrono::Duration, Uuid,
}

impl<T: FromValue + 'static> FromRow for Option<T> {
    const SHAPE: Shape = Shape::Simple;

    fn from_row<R: Row + ?Sized>(row: &R, _mapping: &SchemaMapping, options: &MapOptions) -> Result<Self> {
        simple(row, options)
    }
}

macro_rules! impl_tuple_row {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: FromValue + 'static),+> FromRow for ($($name,)+) {
            const SHAPE: Shape = Shape::Tuple;

            fn from_row<R: Row + ?Sized>(row: &R, _mapping: &SchemaMapping, options: &MapOptions) -> Result<Self> {
                Ok(($(tuple_field::<$name, R>(row, $idx, options)?,)+))
            }
        }
    };
}

impl_tuple_row!(T0: 0);
impl_tuple_row!(T0: 0, T1: 1);
impl_tuple_row!(T0: 0, T1: 1, T2: 2);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10);
impl_tuple_row!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5, T6: 6, T7: 7, T8: 8, T9: 9, T10: 10, T11: 11);
