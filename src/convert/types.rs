//! Type mapping between destination column types and runtime values
//!
//! Parsing is deliberately forgiving in one direction only: anything that does
//! not parse becomes [`TypedValue::Null`]. A single malformed field must never
//! abort a bulk-load batch.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use super::value::TypedValue;
use crate::models::{NativeType, SqlType};

/// Date-time layouts tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts, read as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Date-time layouts carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Map a destination column type to the runtime type its values parse into.
///
/// Total over [`SqlType`]; unknown type names are rejected earlier, when text
/// is parsed into a `SqlType` (see [`crate::models::UnsupportedTypeError`]).
pub fn native_type(sql_type: SqlType) -> NativeType {
    match sql_type {
        SqlType::Varchar | SqlType::NVarchar => NativeType::Text,
        SqlType::Decimal | SqlType::Numeric => NativeType::Decimal,
        SqlType::Int => NativeType::Int,
        SqlType::BigInt => NativeType::BigInt,
        SqlType::UniqueIdentifier => NativeType::Uuid,
        SqlType::Date | SqlType::SmallDateTime | SqlType::DateTime | SqlType::DateTime2 => {
            NativeType::DateTime
        }
        SqlType::DateTimeOffset => NativeType::DateTimeOffset,
    }
}

/// Parse a rendered string into `native`.
///
/// `format` is an optional chrono format string tried before the built-in
/// layouts for temporal types; it is ignored for other types.
///
/// # Example
///
/// ```rust
/// use sql_bulk_sink::convert::{TypedValue, parse_value};
/// use sql_bulk_sink::models::NativeType;
///
/// assert_eq!(parse_value(" 42 ", NativeType::Int, None), TypedValue::Int(42));
/// assert_eq!(parse_value("forty-two", NativeType::Int, None), TypedValue::Null);
/// ```
pub fn parse_value(raw: &str, native: NativeType, format: Option<&str>) -> TypedValue {
    if native == NativeType::Text {
        return TypedValue::String(raw.to_string());
    }

    let trimmed = raw.trim();
    let parsed = match native {
        NativeType::Text => None,
        NativeType::Decimal => parse_decimal(trimmed).map(TypedValue::Decimal),
        NativeType::Int => trimmed.parse::<i32>().ok().map(TypedValue::Int),
        NativeType::BigInt => trimmed.parse::<i64>().ok().map(TypedValue::BigInt),
        NativeType::Uuid => Uuid::parse_str(trimmed).ok().map(TypedValue::Uuid),
        NativeType::DateTime => parse_datetime(trimmed, format).map(TypedValue::DateTime),
        NativeType::DateTimeOffset => {
            parse_datetime_offset(trimmed, format).map(TypedValue::DateTimeOffset)
        }
    };

    parsed.unwrap_or(TypedValue::Null)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    // rust_decimal allows `_` digit separators; invariant numbers do not
    if raw.contains('_') {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Parse a date-time without offset.
///
/// Inputs carrying an offset are converted to UTC.
pub fn parse_datetime(raw: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }

    if let Some(format) = format {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
        if let Ok(value) = NaiveDate::parse_from_str(raw, format) {
            return Some(value.and_time(NaiveTime::MIN));
        }
        if let Ok(value) = DateTime::parse_from_str(raw, format) {
            return Some(value.naive_utc());
        }
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(raw, format) {
            return Some(value.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Parse a date-time with offset.
///
/// Inputs without an offset are taken as UTC.
pub fn parse_datetime_offset(raw: &str, format: Option<&str>) -> Option<DateTime<FixedOffset>> {
    if raw.is_empty() {
        return None;
    }

    if let Some(format) = format
        && let Ok(value) = DateTime::parse_from_str(raw, format)
    {
        return Some(value);
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value);
    }

    for format in OFFSET_FORMATS {
        if let Ok(value) = DateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }

    parse_datetime(raw, format).map(|naive| naive.and_utc().fixed_offset())
}

/// Current UTC time as stored by `DEFAULT GETUTCDATE()` columns.
pub(crate) fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_native_type_is_total() {
        for sql_type in SqlType::ALL {
            let native = native_type(sql_type);
            match sql_type {
                SqlType::Varchar | SqlType::NVarchar => assert_eq!(native, NativeType::Text),
                SqlType::Decimal | SqlType::Numeric => assert_eq!(native, NativeType::Decimal),
                SqlType::Int => assert_eq!(native, NativeType::Int),
                SqlType::BigInt => assert_eq!(native, NativeType::BigInt),
                SqlType::UniqueIdentifier => assert_eq!(native, NativeType::Uuid),
                SqlType::DateTimeOffset => assert_eq!(native, NativeType::DateTimeOffset),
                _ => assert_eq!(native, NativeType::DateTime),
            }
        }
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_value("-17", NativeType::Int, None), TypedValue::Int(-17));
        assert_eq!(parse_value("+5", NativeType::Int, None), TypedValue::Int(5));
        assert_eq!(
            parse_value("9000000000", NativeType::Int, None),
            TypedValue::Null,
            "overflows INT"
        );
        assert_eq!(
            parse_value("9000000000", NativeType::BigInt, None),
            TypedValue::BigInt(9_000_000_000)
        );
        assert_eq!(
            parse_value("12.50", NativeType::Decimal, None),
            TypedValue::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(
            parse_value("1.5e3", NativeType::Decimal, None),
            TypedValue::Decimal(Decimal::new(1500, 0))
        );
        assert_eq!(parse_value("", NativeType::Decimal, None), TypedValue::Null);
        assert_eq!(
            parse_value("1_000", NativeType::Decimal, None),
            TypedValue::Null
        );
        assert_eq!(
            parse_value("1_0e2", NativeType::Decimal, None),
            TypedValue::Null
        );
    }

    #[test]
    fn test_parse_uuid() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(
            parse_value(id, NativeType::Uuid, None),
            TypedValue::Uuid(Uuid::parse_str(id).unwrap())
        );
        assert_eq!(
            parse_value("{550e8400-e29b-41d4-a716-446655440000}", NativeType::Uuid, None),
            TypedValue::Uuid(Uuid::parse_str(id).unwrap())
        );
        assert_eq!(parse_value("not-a-uuid", NativeType::Uuid, None), TypedValue::Null);
    }

    #[test]
    fn test_parse_text_is_verbatim() {
        assert_eq!(
            parse_value("  padded  ", NativeType::Text, None),
            TypedValue::String("  padded  ".to_string())
        );
        assert_eq!(
            parse_value("", NativeType::Text, None),
            TypedValue::String(String::new())
        );
    }

    #[test]
    fn test_parse_datetime_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 6)
            .unwrap();
        for raw in [
            "2024-03-09T14:05:06",
            "2024-03-09 14:05:06",
            "2024-03-09T14:05:06Z",
            "2024-03-09T16:05:06+02:00",
            "03/09/2024 14:05:06",
            "03/09/2024 02:05:06 PM",
        ] {
            assert_eq!(parse_datetime(raw, None), Some(expected), "{raw}");
        }

        let fractional = parse_datetime("2024-03-09 14:05:06.250", None).unwrap();
        assert_eq!(fractional.nanosecond(), 250_000_000);

        let date_only = parse_datetime("2024-03-09", None).unwrap();
        assert_eq!((date_only.day(), date_only.hour()), (9, 0));

        assert_eq!(parse_datetime("yesterday", None), None);
    }

    #[test]
    fn test_parse_datetime_custom_format() {
        let value = parse_datetime("09.03.2024 14:05", Some("%d.%m.%Y %H:%M")).unwrap();
        assert_eq!((value.year(), value.month(), value.day()), (2024, 3, 9));

        let date = parse_datetime("09.03.2024", Some("%d.%m.%Y")).unwrap();
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_parse_datetime_offset() {
        let value = parse_datetime_offset("2024-03-09T14:05:06+02:00", None).unwrap();
        assert_eq!(value.offset().local_minus_utc(), 7200);

        let value = parse_datetime_offset("2024-03-09 14:05:06 +01:00", None).unwrap();
        assert_eq!(value.offset().local_minus_utc(), 3600);

        let naive = parse_datetime_offset("2024-03-09 14:05:06", None).unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);
        assert_eq!(naive.hour(), 14);

        assert!(matches!(
            parse_value("garbage", NativeType::DateTimeOffset, None),
            TypedValue::Null
        ));
    }
}
