//! Log sink
//!
//! Turns log events into typed rows and bulk-loads them into the destination
//! table, creating the table on first use.

pub mod batch;
pub mod event;
pub mod writer;

pub use batch::{ColumnHeader, RowSet, TypedRow, chunks};
pub use event::{AsyncLogEvent, Continuation, LogEventInfo, LogLevel, LogRecord};
pub use writer::BulkSink;

use crate::database::{ConnectionTarget, StoreError};
use crate::models::{ModelError, UnsupportedTypeError};

/// Default number of rows per bulk-load call
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Error type for sink operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedTypeError),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    /// The schema statement was rejected; retried on the next write
    #[error("Schema creation failed: {0}")]
    SchemaCreation(StoreError),

    /// The store rejected a bulk load
    #[error("Bulk load failed: {0}")]
    BulkLoad(StoreError),
}

impl From<ModelError> for SinkError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidColumn(msg) => SinkError::InvalidColumn(msg),
            ModelError::InvalidIdentifier(e) if e.field() == "column name" => {
                SinkError::InvalidColumn(e.to_string())
            }
            ModelError::InvalidIdentifier(e) => SinkError::InvalidTable(e.to_string()),
            ModelError::InvalidTable(msg) => SinkError::InvalidTable(msg),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::IoError(err.to_string())
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Runtime settings of a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    /// Target for bulk loads
    pub connection: ConnectionTarget,
    /// Target for schema statements; falls back to `connection`
    pub ddl_connection: Option<ConnectionTarget>,
    /// Rows per bulk-load call
    pub batch_size: usize,
    pub create_table_if_not_exists: bool,
    /// Write each chunk as a single row of newline-joined renderings
    pub allow_multiple_log_entries_per_row: bool,
}

impl SinkSettings {
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: ConnectionTarget::new(connection),
            ddl_connection: None,
            batch_size: DEFAULT_BATCH_SIZE,
            create_table_if_not_exists: true,
            allow_multiple_log_entries_per_row: false,
        }
    }

    pub fn with_ddl_connection(mut self, connection: impl Into<String>) -> Self {
        self.ddl_connection = Some(ConnectionTarget::new(connection));
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_create_table(mut self, create: bool) -> Self {
        self.create_table_if_not_exists = create;
        self
    }

    pub fn with_multiple_entries_per_row(mut self, allow: bool) -> Self {
        self.allow_multiple_log_entries_per_row = allow;
        self
    }

    /// Target used for schema statements.
    pub fn ddl_target(&self) -> &ConnectionTarget {
        match &self.ddl_connection {
            Some(target) if !target.is_empty() => target,
            _ => &self.connection,
        }
    }

    /// Check the settings before a sink is built from them.
    pub fn validate(&self) -> SinkResult<()> {
        if self.connection.is_empty() {
            return Err(SinkError::ConfigError(
                "connection string is required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SinkError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether the destination table is known to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Uninitialized,
    Ready,
}

/// Counters of a sink's activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Schema statements that failed
    pub schema_creation_failures: usize,
    /// Bulk-load calls that succeeded
    pub batches_written: usize,
    /// Bulk-load calls the store rejected
    pub batches_failed: usize,
    /// Rows committed
    pub rows_written: usize,
    /// Rows in rejected bulk loads
    pub rows_failed: usize,
}

impl SinkStats {
    /// Check if every bulk load so far succeeded
    pub fn is_success(&self) -> bool {
        self.batches_failed == 0
    }
}
