//! Store abstraction for the destination database
//!
//! This module provides:
//! - the [`BulkStore`] trait the sink writes through (DDL + bulk load)
//! - the idempotent schema statement builder ([`schema`])
//! - an in-memory store that interprets schema statements ([`memory`])
//! - TOML configuration for the sink ([`config`], `config` feature)

#[cfg(feature = "config")]
pub mod config;
pub mod memory;
pub mod schema;

#[cfg(feature = "config")]
pub use config::SinkConfig;
pub use memory::MemoryStore;
pub use schema::{
    ColumnDefinition, CreateTableBuilder, DdlStep, SchemaStatement, build_create_table,
};

use crate::sink::batch::RowSet;

/// Error type for store operations
///
/// `Clone` so that one rejected bulk load can be reported to every event in
/// the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Failed to reach the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The database refused the command (constraint, permission, syntax)
    #[error("Command rejected: {0}")]
    Rejected(String),

    /// Referenced table or column does not exist
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Connection string for a destination database
///
/// `Display` masks the password so targets can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget(String);

impl ConnectionTarget {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self(connection_string.into())
    }

    /// The raw connection string, for the driver only.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Connection string with passwords replaced by `****`
    ///
    /// Handles both ADO-style `Password=...;` pairs and URL-style
    /// `user:password@host` credentials.
    pub fn masked(&self) -> String {
        let masked_pairs: Vec<String> = self
            .0
            .split(';')
            .map(|pair| match pair.split_once('=') {
                Some((key, _))
                    if matches!(
                        key.trim().to_lowercase().as_str(),
                        "password" | "pwd"
                    ) =>
                {
                    format!("{}=****", key)
                }
                _ => pair.to_string(),
            })
            .collect();
        let masked = masked_pairs.join(";");

        if let Some(at_pos) = masked.find('@')
            && let Some(colon_pos) = masked[..at_pos].rfind(':')
            && !masked[..colon_pos].ends_with('/')
            && masked[..colon_pos].contains("//")
        {
            let prefix = &masked[..colon_pos + 1];
            let suffix = &masked[at_pos..];
            return format!("{}****{}", prefix, suffix);
        }
        masked
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectionTarget").field(&self.masked()).finish()
    }
}

/// One bulk-load call: a batch of rows for a single table
#[derive(Debug, Clone, Copy)]
pub struct BulkLoadRequest<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    /// Rows per round trip the driver should use
    pub max_batch_size: usize,
    pub rows: &'a RowSet,
}

/// Destination database as seen by the sink
///
/// Calls are blocking. Implementations own connection handling: each call
/// obtains a connection for `target` and uses it exclusively until it returns.
pub trait BulkStore {
    /// Execute a schema statement.
    fn execute_ddl(&self, target: &ConnectionTarget, statement: &SchemaStatement)
    -> StoreResult<()>;

    /// Insert all rows of the request as one unit; either every row is
    /// committed or the call fails.
    fn execute_bulk_load(
        &self,
        target: &ConnectionTarget,
        request: BulkLoadRequest<'_>,
    ) -> StoreResult<()>;

    /// Store type name, for logging
    fn store_type(&self) -> &'static str;
}

impl<S: BulkStore + ?Sized> BulkStore for &S {
    fn execute_ddl(
        &self,
        target: &ConnectionTarget,
        statement: &SchemaStatement,
    ) -> StoreResult<()> {
        (**self).execute_ddl(target, statement)
    }

    fn execute_bulk_load(
        &self,
        target: &ConnectionTarget,
        request: BulkLoadRequest<'_>,
    ) -> StoreResult<()> {
        (**self).execute_bulk_load(target, request)
    }

    fn store_type(&self) -> &'static str {
        (**self).store_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_ado_connection_string() {
        let target = ConnectionTarget::new("Server=db;User Id=app;Password=s3cret;Encrypt=true");
        assert_eq!(
            target.masked(),
            "Server=db;User Id=app;Password=****;Encrypt=true"
        );
        assert!(!format!("{:?}", target).contains("s3cret"));
    }

    #[test]
    fn test_masked_url_connection_string() {
        let target = ConnectionTarget::new("mssql://app:s3cret@db:1433/logs");
        assert_eq!(target.to_string(), "mssql://app:****@db:1433/logs");
    }

    #[test]
    fn test_masked_without_credentials() {
        let target = ConnectionTarget::new("Server=db;Integrated Security=true");
        assert_eq!(target.masked(), "Server=db;Integrated Security=true");
        assert!(ConnectionTarget::new("  ").is_empty());
    }
}
