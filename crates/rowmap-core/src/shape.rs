//! Target type classification and scalar coercion.
//!
//! Every mappable type has a [`Shape`]. Scalars additionally implement
//! [`FromValue`], which defines two conversions from a raw [`Value`]:
//!
//! * `from_value` is the direct assignment used for simple targets and
//!   composite fields. It accepts the exact representation, lossless widening
//!   within a numeric family, and the text-to-uuid coercion when enabled.
//! * `convert` is the general conversion used for tuple fields. It also
//!   narrows numbers with range checks, parses text and formats scalars as text.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, RowMapError};
use crate::options::MapOptions;
use crate::value::Value;

/// How a target type consumes a row.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Shape {
    /// Read directly from column 0.
    Simple,
    /// Positional: field `i` reads column `i`.
    Tuple,
    /// Named fields matched against column names.
    Composite,
}

/// Declared kind of a scalar target.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
    Chars,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Uuid,
    Enum(&'static str),
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Bool => "bool",
            TargetKind::I8 => "i8",
            TargetKind::I16 => "i16",
            TargetKind::I32 => "i32",
            TargetKind::I64 => "i64",
            TargetKind::U8 => "u8",
            TargetKind::U16 => "u16",
            TargetKind::U32 => "u32",
            TargetKind::U64 => "u64",
            TargetKind::F32 => "f32",
            TargetKind::F64 => "f64",
            TargetKind::Char => "char",
            TargetKind::String => "string",
            TargetKind::Bytes => "bytes",
            TargetKind::Chars => "char sequence",
            TargetKind::DateTime => "datetime",
            TargetKind::DateTimeOffset => "datetime with offset",
            TargetKind::TimeSpan => "time span",
            TargetKind::Uuid => "uuid",
            TargetKind::Enum(name) => *name,
        })
    }
}

/// A scalar that can be assigned from a single column value.
pub trait FromValue: Sized {
    const KIND: TargetKind;
    const NULLABLE: bool = false;

    /// Direct assignment. `Value::Null` is only accepted by nullable targets.
    fn from_value(value: Value, options: &MapOptions) -> Result<Self>;

    /// General-purpose conversion.
    fn convert(value: Value, options: &MapOptions) -> Result<Self> {
        Self::from_value(value, options)
    }

    /// Value substituted for a null marker or a missing column.
    fn zero() -> Self;
}

pub(crate) fn mismatch<T: FromValue>(value: &Value) -> RowMapError {
    RowMapError::TypeMismatch {
        column: None,
        expected: T::KIND,
        found: value.kind(),
    }
}

pub(crate) fn unexpected_null<T: FromValue>() -> RowMapError {
    RowMapError::UnexpectedNull {
        column: None,
        expected: T::KIND,
    }
}

fn conversion<T: FromValue>(value: &Value) -> RowMapError {
    RowMapError::Conversion {
        column: None,
        expected: T::KIND,
        value: value.to_string(),
    }
}

macro_rules! impl_integer {
    ($($t:ty => $variant:ident [$($widen:ident),*]),* $(,)?) => {
        $(
            impl FromValue for $t {
                const KIND: TargetKind = TargetKind::$variant;

                fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
                    match value {
                        Value::$variant(n) => Ok(n),
                        $(Value::$widen(n) => Ok(<$t>::from(n)),)*
                        Value::Null => Err(unexpected_null::<Self>()),
                        other => Err(mismatch::<Self>(&other)),
                    }
                }

                fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
                    match &value {
                        Value::Null => Err(unexpected_null::<Self>()),
                        Value::Bool(b) => Ok(<$t>::from(*b)),
                        Value::F32(_) | Value::F64(_) => {
                            let f = value.as_f64().unwrap_or(f64::NAN).round();
                            if f.is_finite() && f >= <$t>::MIN as f64 && f < <$t>::MAX as f64 + 1.0 {
                                Ok(f as $t)
                            } else {
                                Err(conversion::<Self>(&value))
                            }
                        }
                        Value::Text(s) => s.trim().parse::<$t>().map_err(|_| conversion::<Self>(&value)),
                        Value::Char(c) => <$t>::try_from(u32::from(*c)).map_err(|_| conversion::<Self>(&value)),
                        _ => match value.as_i128() {
                            Some(n) => <$t>::try_from(n).map_err(|_| conversion::<Self>(&value)),
                            None => Err(mismatch::<Self>(&value)),
                        },
                    }
                }

                fn zero() -> Self {
                    0
                }
            }
        )*
    };
}

impl_integer! {
    i8 => I8 [],
    i16 => I16 [I8, U8],
    i32 => I32 [I8, I16, U8, U16],
    i64 => I64 [I8, I16, I32, U8, U16, U32],
    u8 => U8 [],
    u16 => U16 [U8],
    u32 => U32 [U8, U16],
    u64 => U64 [U8, U16, U32],
}

macro_rules! impl_float {
    ($($t:ty => $variant:ident [$($widen:ident),*]),* $(,)?) => {
        $(
            impl FromValue for $t {
                const KIND: TargetKind = TargetKind::$variant;

                fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
                    match value {
                        Value::$variant(n) => Ok(n),
                        $(Value::$widen(n) => Ok(<$t>::from(n)),)*
                        Value::Null => Err(unexpected_null::<Self>()),
                        other => Err(mismatch::<Self>(&other)),
                    }
                }

                fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
                    match &value {
                        Value::Null => Err(unexpected_null::<Self>()),
                        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                        Value::Text(s) => s.trim().parse::<$t>().map_err(|_| conversion::<Self>(&value)),
                        _ => match value.as_f64() {
                            Some(f) => Ok(f as $t),
                            None => Err(mismatch::<Self>(&value)),
                        },
                    }
                }

                fn zero() -> Self {
                    0.0
                }
            }
        )*
    };
}

impl_float! {
    f32 => F32 [],
    f64 => F64 [F32],
}

impl FromValue for bool {
    const KIND: TargetKind = TargetKind::Bool;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match &value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(conversion::<Self>(&value)),
            },
            _ => match value.as_f64() {
                Some(f) => Ok(f != 0.0),
                None => Err(mismatch::<Self>(&value)),
            },
        }
    }

    fn zero() -> Self {
        false
    }
}

impl FromValue for char {
    const KIND: TargetKind = TargetKind::Char;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Char(c) => Ok(c),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match &value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::Char(c) => Ok(*c),
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(conversion::<Self>(&value)),
                }
            }
            _ => value
                .as_i128()
                .and_then(|n| u32::try_from(n).ok())
                .and_then(char::from_u32)
                .ok_or_else(|| conversion::<Self>(&value)),
        }
    }

    fn zero() -> Self {
        '\0'
    }
}

impl FromValue for String {
    const KIND: TargetKind = TargetKind::String;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => {
                String::from_utf8(b.to_vec()).map_err(|_| conversion::<Self>(&Value::Bytes(b.clone())))
            }
            other => Ok(other.to_string()),
        }
    }

    fn zero() -> Self {
        String::new()
    }
}

impl FromValue for Vec<char> {
    const KIND: TargetKind = TargetKind::Chars;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.chars().collect()),
            Value::Char(c) => Ok(vec![c]),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, options: &MapOptions) -> Result<Self> {
        String::convert(value, options).map(|s| s.chars().collect())
    }

    fn zero() -> Self {
        Vec::new()
    }
}

impl FromValue for Bytes {
    const KIND: TargetKind = TargetKind::Bytes;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(Bytes::from(s)),
            Value::Uuid(u) => Ok(Bytes::copy_from_slice(u.as_bytes())),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn zero() -> Self {
        Bytes::new()
    }
}

impl FromValue for Vec<u8> {
    const KIND: TargetKind = TargetKind::Bytes;

    fn from_value(value: Value, options: &MapOptions) -> Result<Self> {
        Bytes::from_value(value, options).map(Vec::from)
    }

    fn convert(value: Value, options: &MapOptions) -> Result<Self> {
        Bytes::convert(value, options).map(Vec::from)
    }

    fn zero() -> Self {
        Vec::new()
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl FromValue for NaiveDateTime {
    const KIND: TargetKind = TargetKind::DateTime;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match &value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::DateTime(dt) => Ok(*dt),
            Value::DateTimeOffset(dt) => Ok(dt.naive_local()),
            Value::Text(s) => parse_naive_datetime(s).ok_or_else(|| conversion::<Self>(&value)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }

    fn zero() -> Self {
        NaiveDateTime::default()
    }
}

impl FromValue for DateTime<FixedOffset> {
    const KIND: TargetKind = TargetKind::DateTimeOffset;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::DateTimeOffset(dt) => Ok(dt),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match &value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::DateTimeOffset(dt) => Ok(*dt),
            Value::DateTime(dt) => Ok(dt.and_utc().fixed_offset()),
            Value::Text(s) => {
                DateTime::parse_from_rfc3339(s.trim()).map_err(|_| conversion::<Self>(&value))
            }
            _ => Err(mismatch::<Self>(&value)),
        }
    }

    fn zero() -> Self {
        NaiveDateTime::default().and_utc().fixed_offset()
    }
}

/// Parse `[-]HH:MM:SS[.fraction]` into a time span.
pub fn parse_time_span(s: &str) -> Option<chrono::Duration> {
    let s = s.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let mut parts = body.splitn(3, ':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    let (whole, frac) = match seconds.split_once('.') {
        Some((w, f)) => (w, f),
        None => (seconds, ""),
    };
    let whole: i64 = whole.parse().ok()?;
    if minutes >= 60 || whole >= 60 || frac.len() > 9 {
        return None;
    }
    let nanos: i64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().ok()?
    };

    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60)?
        .checked_add(whole)?;
    let span = chrono::Duration::try_seconds(total)?.checked_add(&chrono::Duration::nanoseconds(nanos))?;
    Some(if negative { -span } else { span })
}

impl FromValue for chrono::Duration {
    const KIND: TargetKind = TargetKind::TimeSpan;

    fn from_value(value: Value, _options: &MapOptions) -> Result<Self> {
        match value {
            Value::TimeSpan(span) => Ok(span),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, _options: &MapOptions) -> Result<Self> {
        match &value {
            Value::Null => Err(unexpected_null::<Self>()),
            Value::TimeSpan(span) => Ok(*span),
            Value::Text(s) => parse_time_span(s).ok_or_else(|| conversion::<Self>(&value)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }

    fn zero() -> Self {
        chrono::Duration::zero()
    }
}

fn parse_uuid_text(input: String) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).map_err(|source| RowMapError::IdentifierParse {
        column: None,
        input,
        source,
    })
}

impl FromValue for Uuid {
    const KIND: TargetKind = TargetKind::Uuid;

    fn from_value(value: Value, options: &MapOptions) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) if options.parse_text_identifiers => parse_uuid_text(s),
            Value::Null => Err(unexpected_null::<Self>()),
            other => Err(mismatch::<Self>(&other)),
        }
    }

    fn convert(value: Value, options: &MapOptions) -> Result<Self> {
        match value {
            Value::Bytes(b) if b.len() == 16 => {
                Uuid::from_slice(&b).map_err(|_| conversion::<Self>(&Value::Bytes(b)))
            }
            other => Self::from_value(other, options),
        }
    }

    fn zero() -> Self {
        Uuid::nil()
    }
}

/// Integer discriminant carried by `value`, for enums mapped by `#[derive(SqlEnum)]`.
pub fn enum_discriminant<T: FromValue>(value: &Value) -> Result<i64> {
    match value {
        Value::Null => Err(unexpected_null::<T>()),
        other => match other.as_i128() {
            Some(n) => i64::try_from(n).map_err(|_| conversion::<T>(other)),
            None => Err(mismatch::<T>(other)),
        },
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: TargetKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_value(value: Value, options: &MapOptions) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, options).map(Some),
        }
    }

    fn convert(value: Value, options: &MapOptions) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::convert(other, options).map(Some),
        }
    }

    fn zero() -> Self {
        None
    }
}
