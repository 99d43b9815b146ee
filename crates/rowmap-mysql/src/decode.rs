//! MySQL column values to rowmap [`Value`]s, dispatched on the column type name.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rowmap_core::Value;
use sqlx::{
    decode::Decode,
    mysql::{MySql, MySqlValueRef},
    TypeInfo, Value as _, ValueRef,
};

use crate::helper::mysql_time_bin_to_duration;

/// Decode one raw column value.
pub fn decode_value(vr: MySqlValueRef<'_>) -> Result<Value> {
    if vr.is_null() {
        return Ok(Value::Null);
    }

    let owned = ValueRef::to_owned(&vr);
    let tn = owned.type_info().name().to_string();

    macro_rules! dec {
        ($t:ty) => {{
            <$t as Decode<'_, MySql>>::decode(owned.as_ref()).map_err(|e| {
                anyhow!(
                    "decode {} as {} failed: {}",
                    tn,
                    std::any::type_name::<$t>(),
                    e
                )
            })
        }};
    }

    match tn.as_str() {
        // numerics + bool
        "BOOLEAN" => Ok(Value::Bool(dec!(bool)?)),
        "TINYINT" => Ok(Value::I8(dec!(i8)?)),
        "SMALLINT" => Ok(Value::I16(dec!(i16)?)),
        "INT" | "MEDIUMINT" => Ok(Value::I32(dec!(i32)?)),
        "BIGINT" => Ok(Value::I64(dec!(i64)?)),
        "TINYINT UNSIGNED" => Ok(Value::U8(dec!(u8)?)),
        "SMALLINT UNSIGNED" => Ok(Value::U16(dec!(u16)?)),
        "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => Ok(Value::U32(dec!(u32)?)),
        "BIGINT UNSIGNED" | "BIT" => Ok(Value::U64(dec!(u64)?)),
        "FLOAT" => Ok(Value::F32(dec!(f32)?)),
        "DOUBLE" => Ok(Value::F64(dec!(f64)?)),

        // bytes & text
        "BLOB" | "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" | "BINARY" | "VARBINARY" => {
            Ok(Value::from(dec!(Vec<u8>)?))
        }
        "VARCHAR" | "TEXT" | "LONGTEXT" | "MEDIUMTEXT" | "TINYTEXT" | "CHAR" | "JSON" => {
            Ok(Value::Text(dec!(String)?))
        }

        // Enum and Set are represented as strings
        "ENUM" | "SET" => Ok(Value::Text(dec!(String)?)),

        // temporal
        "DATE" => {
            let d: NaiveDate = dec!(NaiveDate)?;
            d.and_hms_opt(0, 0, 0)
                .map(Value::DateTime)
                .ok_or_else(|| anyhow!("DATE {d} has no midnight"))
        }
        "DATETIME" => Ok(Value::DateTime(dec!(NaiveDateTime)?)),
        "TIMESTAMP" => {
            let ts: DateTime<Utc> = dec!(DateTime<Utc>)?;
            Ok(Value::DateTimeOffset(ts.fixed_offset()))
        }
        "TIME" => {
            // decode MySQL TIME binary payload
            let raw: Vec<u8> = dec!(Vec<u8>)?;
            Ok(Value::TimeSpan(mysql_time_bin_to_duration(&raw)?))
        }
        "YEAR" => Ok(Value::U16(dec!(u16)?)),

        // exact numerics stay textual to avoid losing precision
        s if s.starts_with("DECIMAL") || s.starts_with("NUMERIC") => Ok(Value::Text(dec!(String)?)),

        "NULL" => Ok(Value::Null),

        other => bail!("Unsupported MySQL type: {other}"),
    }
}
