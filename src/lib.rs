//! SQL Bulk Sink - bulk-loads structured log events into SQL Server
//!
//! Provides:
//! - Column model: SQL types, generated columns, logging columns
//! - Idempotent table creation statements
//! - Value conversion (parsing, truncation, temporal range checks)
//! - Batched bulk writes with per-event completion handles
//! - TOML configuration (`config` feature)
//!
//! # Example
//!
//! ```rust
//! use sql_bulk_sink::{
//!     BulkSink, GeneratedColumn, LogEventInfo, LogLevel, LoggingColumn, MemoryStore,
//!     SinkSettings, SqlType, TableSpec,
//! };
//!
//! let spec = TableSpec::new(
//!     "dbo",
//!     "Log",
//!     vec![GeneratedColumn::new("Id", SqlType::BigInt).unwrap()],
//!     vec![
//!         LoggingColumn::new("Level", SqlType::Varchar, "${level}").with_length(10),
//!         LoggingColumn::new("Message", SqlType::NVarchar, "${message}"),
//!     ],
//! )
//! .unwrap();
//!
//! let store = MemoryStore::new();
//! let mut sink = BulkSink::new(spec, SinkSettings::new("Server=localhost"), &store).unwrap();
//! sink.write_one(&LogEventInfo::new(LogLevel::Info, "app", "started"))
//!     .unwrap();
//! assert_eq!(store.rows("dbo", "Log").len(), 1);
//! ```

pub mod convert;
pub mod database;
pub mod models;
pub mod sink;
pub mod validation;

// Re-export commonly used types
pub use convert::{TypedValue, convert, convert_raw, native_type, parse_value};
#[cfg(feature = "config")]
pub use database::SinkConfig;
pub use database::{
    BulkLoadRequest, BulkStore, ConnectionTarget, MemoryStore, SchemaStatement, StoreError,
    StoreResult, build_create_table,
};
pub use sink::{
    AsyncLogEvent, BulkSink, LogEventInfo, LogLevel, LogRecord, RowSet, SchemaState, SinkError,
    SinkResult, SinkSettings, SinkStats, TypedRow,
};
pub use validation::{ValidationError, ValidationResult};

// Re-export models
pub use models::enums::*;
pub use models::{GeneratedColumn, LoggingColumn, ModelError, TableSpec};
