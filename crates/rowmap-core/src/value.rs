//! Driver-agnostic cell value representation.
//!
//! A [`Value`] is what a row cursor hands out for one column of the current row.
//! `Value::Null` is the cursor's null marker: the column exists but holds no value.
//! Drivers pick the variant that matches the column's storage representation as
//! closely as possible, since direct assignment in the materializer is strict
//! about representation.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::fmt;
use uuid::Uuid;

/// Coarse classification of values, mirroring the variants of [`Value`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ValueKind {
    Null,
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
    Text,
    Bytes,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Uuid,
}

impl ValueKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueKind::I8
                | ValueKind::I16
                | ValueKind::I32
                | ValueKind::I64
                | ValueKind::U8
                | ValueKind::U16
                | ValueKind::U32
                | ValueKind::U64
        )
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || matches!(self, ValueKind::F32 | ValueKind::F64)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Char => "char",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::DateTime => "datetime",
            ValueKind::DateTimeOffset => "datetime with offset",
            ValueKind::TimeSpan => "time span",
            ValueKind::Uuid => "uuid",
        })
    }
}

/// One column value of the current row.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Text(String),
    Bytes(Bytes),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    TimeSpan(chrono::Duration),
    Uuid(Uuid),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Char(_) => ValueKind::Char,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::DateTimeOffset(_) => ValueKind::DateTimeOffset,
            Value::TimeSpan(_) => ValueKind::TimeSpan,
            Value::Uuid(_) => ValueKind::Uuid,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant widened to `i128`, which holds every integer variant losslessly.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I8(n) => Some(n.into()),
            Value::I16(n) => Some(n.into()),
            Value::I32(n) => Some(n.into()),
            Value::I64(n) => Some(n.into()),
            Value::U8(n) => Some(n.into()),
            Value::U16(n) => Some(n.into()),
            Value::U32(n) => Some(n.into()),
            Value::U64(n) => Some(n.into()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(f) => Some(f.into()),
            Value::F64(f) => Some(f),
            _ => self.as_i128().map(|n| n as f64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => v.fmt(f),
            Value::I8(v) => v.fmt(f),
            Value::I16(v) => v.fmt(f),
            Value::I32(v) => v.fmt(f),
            Value::I64(v) => v.fmt(f),
            Value::U8(v) => v.fmt(f),
            Value::U16(v) => v.fmt(f),
            Value::U32(v) => v.fmt(f),
            Value::U64(v) => v.fmt(f),
            Value::F32(v) => v.fmt(f),
            Value::F64(v) => v.fmt(f),
            Value::Char(v) => v.fmt(f),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::DateTime(v) => v.fmt(f),
            Value::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Value::TimeSpan(v) => f.write_str(&format_time_span(*v)),
            Value::Uuid(v) => v.fmt(f),
        }
    }
}

/// Render a time span as `[-]HH:MM:SS[.ffffff]`, the form SQL TIME literals use.
pub fn format_time_span(span: chrono::Duration) -> String {
    let negative = span < chrono::Duration::zero();
    let abs = if negative { -span } else { span };
    let total_secs = abs.num_seconds();
    let micros = (abs - chrono::Duration::seconds(total_secs))
        .num_microseconds()
        .unwrap_or(0);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    ));
    if micros > 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => Text,
    Bytes => Bytes,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    chrono::Duration => TimeSpan,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<char>> for Value {
    fn from(chars: Vec<char>) -> Self {
        Value::Text(chars.into_iter().collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
