//! Cardinality operators over a row cursor.
//!
//! Each operator resolves the schema once and then materializes rows in cursor
//! order. None of them drains more of the cursor than it needs.

use tracing::trace;

use crate::error::{Result, RowMapError};
use crate::materialize::FromRow;
use crate::options::MapOptions;
use crate::row::{AsyncRowCursor, RowCursor};
use crate::schema::SchemaMapping;
use crate::table::DataTable;

/// Materialize every remaining row.
pub fn to_list<T: FromRow, C: RowCursor + ?Sized>(cursor: &mut C, options: &MapOptions) -> Result<Vec<T>> {
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    let mut out = Vec::new();
    if !cursor.has_rows() {
        return Ok(out);
    }
    while cursor.advance()? {
        out.push(T::from_row(&*cursor, &mapping, options)?);
        trace!(row = out.len(), "materialized row");
    }
    Ok(out)
}

/// The first row, or `None` for an empty result.
pub fn first_or_default<T: FromRow, C: RowCursor + ?Sized>(cursor: &mut C, options: &MapOptions) -> Result<Option<T>> {
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    if !cursor.advance()? {
        return Ok(None);
    }
    trace!("materialized first row");
    T::from_row(&*cursor, &mapping, options).map(Some)
}

pub fn first<T: FromRow, C: RowCursor + ?Sized>(cursor: &mut C, options: &MapOptions) -> Result<T> {
    first_or_default(cursor, options)?.ok_or(RowMapError::NoElements)
}

/// The only row, `None` for an empty result, `MultipleElements` on a second row.
pub fn single_or_default<T: FromRow, C: RowCursor + ?Sized>(cursor: &mut C, options: &MapOptions) -> Result<Option<T>> {
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    if !cursor.advance()? {
        return Ok(None);
    }
    let value = T::from_row(&*cursor, &mapping, options)?;
    if cursor.advance()? {
        return Err(RowMapError::MultipleElements);
    }
    Ok(Some(value))
}

pub fn single<T: FromRow, C: RowCursor + ?Sized>(cursor: &mut C, options: &MapOptions) -> Result<T> {
    single_or_default(cursor, options)?.ok_or(RowMapError::NoElements)
}

pub fn to_table<C: RowCursor + ?Sized>(cursor: &mut C) -> Result<DataTable> {
    DataTable::from_cursor(cursor)
}

pub async fn to_list_async<T, C>(cursor: &mut C, options: &MapOptions) -> Result<Vec<T>>
where
    T: FromRow,
    C: AsyncRowCursor + ?Sized,
{
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    let mut out = Vec::new();
    if !cursor.has_rows() {
        return Ok(out);
    }
    while cursor.advance_async().await? {
        out.push(T::from_row(&*cursor, &mapping, options)?);
        trace!(row = out.len(), "materialized row");
    }
    Ok(out)
}

pub async fn first_or_default_async<T, C>(cursor: &mut C, options: &MapOptions) -> Result<Option<T>>
where
    T: FromRow,
    C: AsyncRowCursor + ?Sized,
{
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    if !cursor.advance_async().await? {
        return Ok(None);
    }
    trace!("materialized first row");
    T::from_row(&*cursor, &mapping, options).map(Some)
}

pub async fn first_async<T, C>(cursor: &mut C, options: &MapOptions) -> Result<T>
where
    T: FromRow,
    C: AsyncRowCursor + ?Sized,
{
    first_or_default_async(cursor, options)
        .await?
        .ok_or(RowMapError::NoElements)
}

pub async fn single_or_default_async<T, C>(cursor: &mut C, options: &MapOptions) -> Result<Option<T>>
where
    T: FromRow,
    C: AsyncRowCursor + ?Sized,
{
    let mapping = SchemaMapping::resolve::<T>(&cursor.column_schema(), options)?;
    if !cursor.advance_async().await? {
        return Ok(None);
    }
    let value = T::from_row(&*cursor, &mapping, options)?;
    if cursor.advance_async().await? {
        return Err(RowMapError::MultipleElements);
    }
    Ok(Some(value))
}

pub async fn single_async<T, C>(cursor: &mut C, options: &MapOptions) -> Result<T>
where
    T: FromRow,
    C: AsyncRowCursor + ?Sized,
{
    single_or_default_async(cursor, options)
        .await?
        .ok_or(RowMapError::NoElements)
}

pub async fn to_table_async<C: AsyncRowCursor + ?Sized>(cursor: &mut C) -> Result<DataTable> {
    DataTable::from_cursor_async(cursor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::composite;
    use crate::memory::{MemoryCursor, ResultSet};
    use crate::model::{FieldModel, RowModel};
    use crate::row::Row;
    use crate::shape::Shape;
    use crate::value::Value;
    use std::sync::OnceLock;

    #[derive(Default, Debug)]
    struct Pair {
        id: i64,
        name: String,
    }

    impl FromRow for Pair {
        const SHAPE: Shape = Shape::Composite;

        fn model() -> Option<&'static RowModel<Self>> {
            static MODEL: OnceLock<RowModel<Pair>> = OnceLock::new();
            Some(MODEL.get_or_init(|| {
                RowModel::new(
                    "Pair",
                    vec![
                        FieldModel::new("id", "id", |p: &mut Pair, v: i64| p.id = v),
                        FieldModel::new("name", "name", |p: &mut Pair, v: String| p.name = v),
                    ],
                )
            }))
        }

        fn from_row<R: Row + ?Sized>(row: &R, mapping: &SchemaMapping, options: &MapOptions) -> Result<Self> {
            composite(row, mapping, options)
        }
    }

    fn numbers(n: i32) -> MemoryCursor {
        let mut set = ResultSet::new(["n"]);
        for i in 1..=n {
            set = set.row(vec![Value::I32(i)]);
        }
        MemoryCursor::new(set)
    }

    #[test]
    fn test_to_list_reads_every_row() {
        let mut cursor = numbers(3);
        let got: Vec<i32> = to_list(&mut cursor, &MapOptions::default()).unwrap();
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(cursor.advances(), 4);
    }

    #[test]
    fn test_to_list_on_empty_does_not_advance() {
        let mut cursor = numbers(0);
        let got: Vec<i32> = to_list(&mut cursor, &MapOptions::default()).unwrap();
        assert!(got.is_empty());
        assert_eq!(cursor.advances(), 0);
    }

    #[test]
    fn test_strict_mode_checks_empty_results_too() {
        let strict = MapOptions::new().strict(true);
        let mut cursor = MemoryCursor::new(ResultSet::new(["id"]));
        let mut async_cursor = MemoryCursor::new(ResultSet::new(["id"]));

        assert!(matches!(
            to_list::<Pair, _>(&mut cursor, &strict),
            Err(RowMapError::UnmappedField { ref field }) if field == "name"
        ));
        assert!(matches!(
            tokio_test::block_on(to_list_async::<Pair, _>(&mut async_cursor, &strict)),
            Err(RowMapError::UnmappedField { .. })
        ));
        assert_eq!(cursor.advances(), 0);
    }

    #[test]
    fn test_first_does_not_drain() {
        let mut cursor = numbers(5);
        assert_eq!(first::<i32, _>(&mut cursor, &MapOptions::default()).unwrap(), 1);
        assert_eq!(cursor.advances(), 1);

        let mut empty = numbers(0);
        assert!(matches!(
            first::<i32, _>(&mut empty, &MapOptions::default()),
            Err(RowMapError::NoElements)
        ));
        let mut empty = numbers(0);
        assert_eq!(first_or_default::<i32, _>(&mut empty, &MapOptions::default()).unwrap(), None);
    }

    #[test]
    fn test_single_cardinality() {
        let options = MapOptions::default();
        assert_eq!(single_or_default::<i32, _>(&mut numbers(0), &options).unwrap(), None);
        assert_eq!(single_or_default::<i32, _>(&mut numbers(1), &options).unwrap(), Some(1));
        assert_eq!(single::<i32, _>(&mut numbers(1), &options).unwrap(), 1);

        let mut three = numbers(3);
        let err = single_or_default::<i32, _>(&mut three, &options).unwrap_err();
        assert!(matches!(err, RowMapError::MultipleElements));
        assert!(err.is_cardinality());
        assert_eq!(three.advances(), 2);

        assert!(matches!(
            single::<i32, _>(&mut numbers(0), &options),
            Err(RowMapError::NoElements)
        ));
    }

    #[tokio::test]
    async fn test_async_operators_match_sync() {
        let options = MapOptions::default();
        let got: Vec<i64> = to_list_async(&mut numbers(3), &options).await.unwrap();
        assert_eq!(got, vec![1, 2, 3]);

        let mut many = numbers(4);
        assert_eq!(first_async::<i32, _>(&mut many, &options).await.unwrap(), 1);
        assert_eq!(many.advances(), 1);

        assert!(matches!(
            single_async::<i32, _>(&mut numbers(2), &options).await,
            Err(RowMapError::MultipleElements)
        ));
        assert_eq!(
            single_or_default_async::<i32, _>(&mut numbers(0), &options).await.unwrap(),
            None
        );
        assert!(matches!(
            first_async::<i32, _>(&mut numbers(0), &options).await,
            Err(RowMapError::NoElements)
        ));

        let table = to_table_async(&mut numbers(2)).await.unwrap();
        assert_eq!(table.len(), 2);
    }
}
