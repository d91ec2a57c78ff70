//! Value conversion module
//!
//! Maps column types to runtime types and converts rendered log fields into
//! typed, store-safe values.

pub mod types;
pub mod value;

pub use types::{native_type, parse_datetime, parse_datetime_offset, parse_value};
pub use value::{
    MAX_SQL_SMALLDATETIME, MIN_SQL_DATETIME, MIN_SQL_SMALLDATETIME, TypedValue, convert,
    convert_raw,
};
