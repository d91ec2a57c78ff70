//! Field value conversion
//!
//! Turns one rendered log field into a value the destination will accept:
//! parse, then truncate strings, then drop temporal and decimal values the
//! column cannot represent. None of these steps can fail; the worst outcome
//! for a field is [`TypedValue::Null`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::parse_value;
use crate::models::{LoggingColumn, NativeType, SqlType};
use crate::sink::event::LogRecord;

/// Earliest value a `DATETIME` column accepts (inclusive)
pub static MIN_SQL_DATETIME: Lazy<NaiveDateTime> = Lazy::new(|| midnight(1753, 1, 1));

/// Earliest value a `SMALLDATETIME` column accepts (inclusive)
pub static MIN_SQL_SMALLDATETIME: Lazy<NaiveDateTime> = Lazy::new(|| midnight(1900, 1, 1));

/// Latest value a `SMALLDATETIME` column accepts (inclusive)
pub static MAX_SQL_SMALLDATETIME: Lazy<NaiveDateTime> = Lazy::new(|| midnight(2079, 6, 6));

/// Years SQL Server date types can hold at all
const SQL_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// A converted field value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    String(String),
    Decimal(Decimal),
    Int(i32),
    BigInt(i64),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Runtime type of the value (`None` for NULL).
    pub fn native_type(&self) -> Option<NativeType> {
        match self {
            TypedValue::Null => None,
            TypedValue::String(_) => Some(NativeType::Text),
            TypedValue::Decimal(_) => Some(NativeType::Decimal),
            TypedValue::Int(_) => Some(NativeType::Int),
            TypedValue::BigInt(_) => Some(NativeType::BigInt),
            TypedValue::Uuid(_) => Some(NativeType::Uuid),
            TypedValue::DateTime(_) => Some(NativeType::DateTime),
            TypedValue::DateTimeOffset(_) => Some(NativeType::DateTimeOffset),
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Null => write!(f, "NULL"),
            TypedValue::String(s) => write!(f, "{}", s),
            TypedValue::Decimal(d) => write!(f, "{}", d),
            TypedValue::Int(i) => write!(f, "{}", i),
            TypedValue::BigInt(i) => write!(f, "{}", i),
            TypedValue::Uuid(u) => write!(f, "{}", u),
            TypedValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            TypedValue::DateTimeOffset(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// Render `column` against `event` and convert the result.
pub fn convert<E: LogRecord + ?Sized>(column: &LoggingColumn, event: &E) -> TypedValue {
    let raw = event.render(&column.layout);
    convert_raw(column, &raw)
}

/// Convert an already rendered field for `column`.
///
/// # Example
///
/// ```rust
/// use sql_bulk_sink::convert::{TypedValue, convert_raw};
/// use sql_bulk_sink::models::{LoggingColumn, SqlType};
///
/// let column = LoggingColumn::new("Code", SqlType::Varchar, "${message}").with_length(5);
/// assert_eq!(
///     convert_raw(&column, "abcdefgh"),
///     TypedValue::String("abcde".to_string())
/// );
/// ```
pub fn convert_raw(column: &LoggingColumn, raw: &str) -> TypedValue {
    match parse_value(raw, column.native_type(), column.format.as_deref()) {
        TypedValue::String(s) => TypedValue::String(truncate(s, column.length)),
        TypedValue::DateTime(value) => clamp_datetime(value, column.sql_type),
        TypedValue::DateTimeOffset(value) if !SQL_YEAR_RANGE.contains(&value.year()) => {
            TypedValue::Null
        }
        TypedValue::Decimal(value) => fit_decimal(value, column.precision, column.scale),
        other => other,
    }
}

/// Cut `value` to at most `length` UTF-16 code units (0 = unbounded).
///
/// The cut lands on a character boundary, so a surrogate pair that would
/// straddle the limit is dropped whole.
fn truncate(value: String, length: usize) -> String {
    if length == 0 {
        return value;
    }
    let mut units = 0;
    for (byte_index, ch) in value.char_indices() {
        units += ch.len_utf16();
        if units > length {
            return value[..byte_index].to_string();
        }
    }
    value
}

/// Drop date-times the destination column cannot store.
fn clamp_datetime(value: NaiveDateTime, sql_type: SqlType) -> TypedValue {
    let out_of_range = match sql_type {
        SqlType::DateTime => {
            value < *MIN_SQL_DATETIME || !SQL_YEAR_RANGE.contains(&value.year())
        }
        SqlType::SmallDateTime => {
            value < *MIN_SQL_SMALLDATETIME || value > *MAX_SQL_SMALLDATETIME
        }
        _ => !SQL_YEAR_RANGE.contains(&value.year()),
    };

    if out_of_range {
        TypedValue::Null
    } else {
        TypedValue::DateTime(value)
    }
}

/// Round to the column scale; NULL when the integer part does not fit.
fn fit_decimal(value: Decimal, precision: u8, scale: u8) -> TypedValue {
    let rounded = value.round_dp(u32::from(scale));
    let integer_digits = u32::from(precision.saturating_sub(scale));
    // beyond 28 digits the limit exceeds what Decimal itself can hold
    if let Some(limit) = 10i128
        .checked_pow(integer_digits)
        .and_then(|limit| Decimal::try_from_i128_with_scale(limit, 0).ok())
        && rounded.abs() >= limit
    {
        return TypedValue::Null;
    }
    TypedValue::Decimal(rounded)
}
