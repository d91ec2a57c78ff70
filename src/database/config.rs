//! Sink configuration file support
//!
//! Handles parsing of `.sql-bulk-sink.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::column::{DEFAULT_PRECISION, DEFAULT_SCALE};
use crate::models::{
    DEFAULT_SCHEMA, GeneratedColumn, GenerationStrategy, LoggingColumn, SqlType, TableSpec,
};
use crate::sink::{DEFAULT_BATCH_SIZE, SinkError, SinkResult, SinkSettings};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".sql-bulk-sink.toml";

/// Environment variable for the bulk-load connection string
pub const ENV_CONNECTION_STRING: &str = "SQL_BULK_SINK_CONNECTION_STRING";

/// Environment variable for the DDL connection string
pub const ENV_DDL_CONNECTION_STRING: &str = "SQL_BULK_SINK_DDL_CONNECTION_STRING";

/// Environment variable for the batch size
pub const ENV_BATCH_SIZE: &str = "SQL_BULK_SINK_BATCH_SIZE";

/// Destination configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSection {
    /// Connection string for bulk loads
    #[serde(default)]
    pub connection_string: String,

    /// Connection string for schema statements (defaults to `connection_string`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl_connection_string: Option<String>,

    /// Destination schema
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Destination table
    pub table: String,

    /// Rows per bulk-load call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Create the table on first write
    #[serde(default = "default_true")]
    pub create_table_if_not_exists: bool,

    /// Write each batch as one row of newline-joined renderings
    #[serde(default)]
    pub allow_multiple_log_entries_per_row: bool,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

/// `[[generated_column]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedColumnEntry {
    pub name: String,
    pub sql_type: String,
    /// Derived from `sql_type` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<GenerationStrategy>,
}

impl GeneratedColumnEntry {
    fn to_column(&self) -> SinkResult<GeneratedColumn> {
        let sql_type: SqlType = self.sql_type.parse()?;
        let column = match self.strategy {
            Some(strategy) => GeneratedColumn::with_strategy(&self.name, sql_type, strategy)?,
            None => GeneratedColumn::new(&self.name, sql_type)?,
        };
        Ok(column)
    }
}

/// `[[column]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    pub sql_type: String,
    #[serde(default)]
    pub length: usize,
    pub layout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default = "default_true")]
    pub allow_null: bool,
}

impl ColumnEntry {
    fn to_column(&self) -> SinkResult<LoggingColumn> {
        let sql_type: SqlType = self.sql_type.parse()?;
        let mut column = LoggingColumn::new(&self.name, sql_type, &self.layout)
            .with_length(self.length)
            .with_precision(
                self.precision.unwrap_or(DEFAULT_PRECISION),
                self.scale.unwrap_or(DEFAULT_SCALE),
            );
        if let Some(format) = &self.format {
            column = column.with_format(format);
        }
        if !self.allow_null {
            column = column.not_null();
        }
        Ok(column)
    }
}

/// Main configuration structure
///
/// Represents the `.sql-bulk-sink.toml` configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub target: TargetSection,

    #[serde(default, rename = "generated_column")]
    pub generated_columns: Vec<GeneratedColumnEntry>,

    #[serde(default, rename = "column")]
    pub columns: Vec<ColumnEntry>,
}

impl SinkConfig {
    /// Load configuration from a directory
    ///
    /// Reads `.sql-bulk-sink.toml` from `dir` and applies environment
    /// variable overrides.
    pub fn load(dir: &Path) -> SinkResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Err(SinkError::ConfigError(format!(
                "{} not found",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| SinkError::IoError(format!("Failed to read config: {}", e)))?;
        let mut config = Self::parse(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> SinkResult<Self> {
        toml::from_str(content)
            .map_err(|e| SinkError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> SinkResult<()> {
        let config_path = dir.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| SinkError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> SinkResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SinkError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(connection_string) = std::env::var(ENV_CONNECTION_STRING) {
            self.target.connection_string = connection_string;
        }

        if let Ok(connection_string) = std::env::var(ENV_DDL_CONNECTION_STRING) {
            self.target.ddl_connection_string = Some(connection_string);
        }

        if let Ok(size) = std::env::var(ENV_BATCH_SIZE)
            && let Ok(size) = size.parse()
        {
            self.target.batch_size = size;
        }
    }

    /// Build the destination table description.
    ///
    /// Reports unknown type names as [`SinkError::UnsupportedType`] and
    /// inconsistent definitions as [`SinkError::InvalidColumn`] or
    /// [`SinkError::InvalidTable`].
    pub fn table_spec(&self) -> SinkResult<TableSpec> {
        let generated = self
            .generated_columns
            .iter()
            .map(GeneratedColumnEntry::to_column)
            .collect::<SinkResult<Vec<_>>>()?;
        let logging = self
            .columns
            .iter()
            .map(ColumnEntry::to_column)
            .collect::<SinkResult<Vec<_>>>()?;

        Ok(TableSpec::new(
            &self.target.schema,
            &self.target.table,
            generated,
            logging,
        )?)
    }

    /// Build the runtime settings.
    pub fn settings(&self) -> SinkResult<SinkSettings> {
        let mut settings = SinkSettings::new(&self.target.connection_string)
            .with_batch_size(self.target.batch_size)
            .with_create_table(self.target.create_table_if_not_exists)
            .with_multiple_entries_per_row(self.target.allow_multiple_log_entries_per_row);
        if let Some(ddl) = &self.target.ddl_connection_string {
            settings = settings.with_ddl_connection(ddl);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Check if configuration exists in a directory
    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# SQL Bulk Sink Configuration
# Describes the destination table and how log events fill it.

[target]
# Connection used for bulk loads
connection_string = "Server=localhost;Database=Logs;User Id=logger;Password=change-me"

# Connection used to create the table (defaults to connection_string)
# ddl_connection_string = "Server=localhost;Database=Logs;User Id=admin;Password=change-me"

schema = "dbo"
table = "Log"

# Rows per bulk-load call
batch_size = 5000

# Create the table (and any missing columns) on first write
create_table_if_not_exists = true

# Write each batch as a single row of newline-joined entries
allow_multiple_log_entries_per_row = false

# Columns filled by SQL Server itself
[[generated_column]]
name = "Id"
sql_type = "BIGINT"

[[generated_column]]
name = "InsertedAt"
sql_type = "DATETIME2"

# Columns rendered from each log event
[[column]]
name = "Logged"
sql_type = "DATETIME"
layout = "${longdate}"
allow_null = false

[[column]]
name = "Level"
sql_type = "VARCHAR"
length = 10
layout = "${level}"

[[column]]
name = "Logger"
sql_type = "NVARCHAR"
length = 250
layout = "${logger}"

[[column]]
name = "Message"
sql_type = "NVARCHAR"
layout = "${message}"

[[column]]
name = "Exception"
sql_type = "NVARCHAR"
layout = "${exception}"
"#
}
