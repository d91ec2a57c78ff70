//! Column models for the destination table

use serde::{Deserialize, Serialize};

use super::enums::{GenerationStrategy, NativeType, SqlType};
use super::table::{ModelError, ModelResult};

/// Default precision for DECIMAL/NUMERIC columns
pub const DEFAULT_PRECISION: u8 = 18;

/// Default scale for DECIMAL/NUMERIC columns
pub const DEFAULT_SCALE: u8 = 6;

/// SQL Server's maximum DECIMAL precision
pub const MAX_PRECISION: u8 = 38;

/// A column whose value is rendered from each log event
///
/// # Example
///
/// ```rust
/// use sql_bulk_sink::models::{LoggingColumn, SqlType};
///
/// let column = LoggingColumn::new("Message", SqlType::NVarchar, "${message}").with_length(4000);
/// assert_eq!(column.length, 4000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingColumn {
    /// Column name
    pub name: String,
    /// Destination type
    pub sql_type: SqlType,
    /// Maximum length for string types (0 = unbounded / not applicable)
    #[serde(default)]
    pub length: usize,
    /// Field expression rendered against each event
    pub layout: String,
    /// Precision for DECIMAL/NUMERIC
    #[serde(default = "default_precision")]
    pub precision: u8,
    /// Scale for DECIMAL/NUMERIC
    #[serde(default = "default_scale")]
    pub scale: u8,
    /// Optional chrono format string used before the built-in date formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Whether the column allows NULL values (default: true)
    #[serde(default = "default_true")]
    pub allow_null: bool,
}

fn default_precision() -> u8 {
    DEFAULT_PRECISION
}

fn default_scale() -> u8 {
    DEFAULT_SCALE
}

fn default_true() -> bool {
    true
}

impl LoggingColumn {
    /// Create a nullable, unbounded column rendered from `layout`.
    pub fn new(name: impl Into<String>, sql_type: SqlType, layout: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type,
            length: 0,
            layout: layout.into(),
            precision: DEFAULT_PRECISION,
            scale: DEFAULT_SCALE,
            format: None,
            allow_null: true,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// The runtime type values of this column are parsed into.
    pub fn native_type(&self) -> NativeType {
        crate::convert::types::native_type(self.sql_type)
    }

    /// Check the column's own invariants (name, precision/scale).
    pub fn validate(&self) -> ModelResult<()> {
        crate::validation::validate_identifier("column name", &self.name)?;
        if self.sql_type.is_fixed_point()
            && (self.precision == 0 || self.precision > MAX_PRECISION || self.scale > self.precision)
        {
            return Err(ModelError::InvalidColumn(format!(
                "'{}' has invalid precision/scale ({}, {})",
                self.name, self.precision, self.scale
            )));
        }
        Ok(())
    }
}

/// A column whose value is produced by the store itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedColumn {
    /// Column name
    pub name: String,
    /// Destination type
    pub sql_type: SqlType,
    /// How the store fills the column
    pub strategy: GenerationStrategy,
}

impl GeneratedColumn {
    /// Create a generated column, deriving the strategy from the type.
    ///
    /// INT/BIGINT become identity columns, UNIQUEIDENTIFIER defaults to a new
    /// UUID and date/time types default to the current UTC time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sql_bulk_sink::models::{GeneratedColumn, GenerationStrategy, SqlType};
    ///
    /// let id = GeneratedColumn::new("Id", SqlType::BigInt).unwrap();
    /// assert_eq!(id.strategy, GenerationStrategy::Identity);
    /// assert!(GeneratedColumn::new("Text", SqlType::NVarchar).is_err());
    /// ```
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> ModelResult<Self> {
        let name = name.into();
        let strategy = GenerationStrategy::for_type(sql_type).ok_or_else(|| {
            ModelError::InvalidColumn(format!(
                "'{}': {} cannot be an auto-generated column",
                name, sql_type
            ))
        })?;
        Ok(Self {
            name,
            sql_type,
            strategy,
        })
    }

    /// Create a generated column with an explicit strategy.
    pub fn with_strategy(
        name: impl Into<String>,
        sql_type: SqlType,
        strategy: GenerationStrategy,
    ) -> ModelResult<Self> {
        let column = Self {
            name: name.into(),
            sql_type,
            strategy,
        };
        column.check_strategy()?;
        Ok(column)
    }

    /// Check the column's own invariants (name, strategy/type compatibility).
    pub fn validate(&self) -> ModelResult<()> {
        crate::validation::validate_identifier("column name", &self.name)?;
        self.check_strategy()
    }

    fn check_strategy(&self) -> ModelResult<()> {
        if !self.strategy.supports(self.sql_type) {
            return Err(ModelError::InvalidColumn(format!(
                "'{}': {} generation is not valid for {}",
                self.name, self.strategy, self.sql_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_column_defaults() {
        let column = LoggingColumn::new("Level", SqlType::Varchar, "${level}");
        assert_eq!(column.length, 0);
        assert!(column.allow_null);
        assert_eq!(column.precision, DEFAULT_PRECISION);
        assert_eq!(column.native_type(), NativeType::Text);
    }

    #[test]
    fn test_logging_column_precision_validation() {
        let ok = LoggingColumn::new("Amount", SqlType::Decimal, "${amount}").with_precision(10, 2);
        assert!(ok.validate().is_ok());

        let bad = LoggingColumn::new("Amount", SqlType::Decimal, "${amount}").with_precision(4, 6);
        assert!(matches!(bad.validate(), Err(ModelError::InvalidColumn(_))));

        // precision is ignored for non fixed-point types
        let text = LoggingColumn::new("Text", SqlType::NVarchar, "x").with_precision(0, 0);
        assert!(text.validate().is_ok());
    }

    #[test]
    fn test_generated_column_strategies() {
        let uuid = GeneratedColumn::new("RowGuid", SqlType::UniqueIdentifier).unwrap();
        assert_eq!(uuid.strategy, GenerationStrategy::RandomUuid);

        let ts = GeneratedColumn::new("InsertedAt", SqlType::DateTime2).unwrap();
        assert_eq!(ts.strategy, GenerationStrategy::CurrentUtcTimestamp);

        assert!(GeneratedColumn::new("Amount", SqlType::Decimal).is_err());
    }

    #[test]
    fn test_generated_column_incompatible_strategy() {
        let result =
            GeneratedColumn::with_strategy("Id", SqlType::UniqueIdentifier, GenerationStrategy::Identity);
        assert!(matches!(result, Err(ModelError::InvalidColumn(_))));

        let result = GeneratedColumn::with_strategy("Id", SqlType::Int, GenerationStrategy::Identity);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_column_name() {
        let result = GeneratedColumn::new("bad name", SqlType::Int);
        assert!(result.is_ok(), "name is only checked by validate()");
        assert!(matches!(
            result.unwrap().validate(),
            Err(ModelError::InvalidIdentifier(_))
        ));
    }
}
