//! Destination table model

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::column::{GeneratedColumn, LoggingColumn};
use crate::validation::ValidationError;

/// Default schema when none is configured
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Error type for column and table definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Name failed identifier validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    /// Column definition is inconsistent
    #[error("Invalid column definition: {0}")]
    InvalidColumn(String),

    /// Table definition is inconsistent
    #[error("Invalid table definition: {0}")]
    InvalidTable(String),
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Destination table: where events go and which columns they fill
///
/// Immutable once built; all invariants are checked by [`TableSpec::new`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableSpec {
    schema_name: String,
    table_name: String,
    generated_columns: Vec<GeneratedColumn>,
    logging_columns: Vec<LoggingColumn>,
}

impl TableSpec {
    /// Build a table spec.
    ///
    /// # Errors
    ///
    /// - any identifier is invalid
    /// - a generated column's strategy does not fit its type
    /// - two columns share a name (compared case-insensitively)
    /// - there are no logging columns
    ///
    /// # Example
    ///
    /// ```rust
    /// use sql_bulk_sink::models::{GeneratedColumn, LoggingColumn, SqlType, TableSpec};
    ///
    /// let spec = TableSpec::new(
    ///     "dbo",
    ///     "Log",
    ///     vec![GeneratedColumn::new("Id", SqlType::BigInt).unwrap()],
    ///     vec![LoggingColumn::new("Message", SqlType::NVarchar, "${message}")],
    /// )
    /// .unwrap();
    /// assert_eq!(spec.column_names(), vec!["Id", "Message"]);
    /// ```
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        generated_columns: Vec<GeneratedColumn>,
        logging_columns: Vec<LoggingColumn>,
    ) -> ModelResult<Self> {
        let spec = Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            generated_columns,
            logging_columns,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> ModelResult<()> {
        crate::validation::validate_identifier("schema name", &self.schema_name)?;
        crate::validation::validate_identifier("table name", &self.table_name)?;

        if self.logging_columns.is_empty() {
            return Err(ModelError::InvalidTable(format!(
                "{}.{} needs at least one logging column",
                self.schema_name, self.table_name
            )));
        }

        for column in &self.generated_columns {
            column.validate()?;
        }
        for column in &self.logging_columns {
            column.validate()?;
        }

        let mut seen = HashSet::new();
        for name in self.column_names() {
            if !seen.insert(name.to_lowercase()) {
                return Err(ModelError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn generated_columns(&self) -> &[GeneratedColumn] {
        &self.generated_columns
    }

    pub fn logging_columns(&self) -> &[LoggingColumn] {
        &self.logging_columns
    }

    /// All column names, generated columns first.
    pub fn column_names(&self) -> Vec<&str> {
        self.generated_columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.logging_columns.iter().map(|c| c.name.as_str()))
            .collect()
    }
}
