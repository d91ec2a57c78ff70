//! Enums for the column model
//!
//! # Serde Casing Conventions
//!
//! - `UPPERCASE`: SQL Server keywords (SqlType)
//! - `SCREAMING_SNAKE_CASE`: database constants (GenerationStrategy)
//! - `PascalCase`: runtime value kinds (NativeType)
//!
//! `SqlType` also parses from free text (configuration files), accepting the
//! SQL Server keyword plus a handful of portable aliases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a type name does not belong to the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported SQL datatype '{0}'")]
pub struct UnsupportedTypeError(pub String);

/// Destination column type, named after the SQL Server keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Varchar,
    NVarchar,
    Decimal,
    Numeric,
    Int,
    BigInt,
    UniqueIdentifier,
    Date,
    SmallDateTime,
    DateTime,
    DateTime2,
    DateTimeOffset,
}

impl SqlType {
    /// All supported types, in declaration order.
    pub const ALL: [SqlType; 12] = [
        SqlType::Varchar,
        SqlType::NVarchar,
        SqlType::Decimal,
        SqlType::Numeric,
        SqlType::Int,
        SqlType::BigInt,
        SqlType::UniqueIdentifier,
        SqlType::Date,
        SqlType::SmallDateTime,
        SqlType::DateTime,
        SqlType::DateTime2,
        SqlType::DateTimeOffset,
    ];

    /// SQL Server keyword for this type, without any length or precision.
    pub fn keyword(&self) -> &'static str {
        match self {
            SqlType::Varchar => "VARCHAR",
            SqlType::NVarchar => "NVARCHAR",
            SqlType::Decimal => "DECIMAL",
            SqlType::Numeric => "NUMERIC",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::UniqueIdentifier => "UNIQUEIDENTIFIER",
            SqlType::Date => "DATE",
            SqlType::SmallDateTime => "SMALLDATETIME",
            SqlType::DateTime => "DATETIME",
            SqlType::DateTime2 => "DATETIME2",
            SqlType::DateTimeOffset => "DATETIMEOFFSET",
        }
    }

    /// Whether values of this type are character data sized by a length.
    pub fn is_string(&self) -> bool {
        matches!(self, SqlType::Varchar | SqlType::NVarchar)
    }

    /// Whether this type is sized by precision and scale.
    pub fn is_fixed_point(&self) -> bool {
        matches!(self, SqlType::Decimal | SqlType::Numeric)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::BigInt)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SqlType::Date
                | SqlType::SmallDateTime
                | SqlType::DateTime
                | SqlType::DateTime2
                | SqlType::DateTimeOffset
        )
    }

    /// Longest declarable length before the column has to become `(MAX)`.
    pub fn max_declared_length(&self) -> Option<usize> {
        match self {
            SqlType::Varchar => Some(8000),
            SqlType::NVarchar => Some(4000),
            _ => None,
        }
    }
}

impl std::str::FromStr for SqlType {
    type Err = UnsupportedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VARCHAR" | "STRING" => Ok(SqlType::Varchar),
            "NVARCHAR" => Ok(SqlType::NVarchar),
            "DECIMAL" => Ok(SqlType::Decimal),
            "NUMERIC" => Ok(SqlType::Numeric),
            "INT" | "INTEGER" => Ok(SqlType::Int),
            "BIGINT" => Ok(SqlType::BigInt),
            "UNIQUEIDENTIFIER" | "UUID" => Ok(SqlType::UniqueIdentifier),
            "DATE" => Ok(SqlType::Date),
            "SMALLDATETIME" | "SMALL_DATETIME" => Ok(SqlType::SmallDateTime),
            "DATETIME" => Ok(SqlType::DateTime),
            "DATETIME2" => Ok(SqlType::DateTime2),
            "DATETIMEOFFSET" | "DATETIME_OFFSET" => Ok(SqlType::DateTimeOffset),
            _ => Err(UnsupportedTypeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How the store produces the value of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStrategy {
    /// Auto-incrementing `IDENTITY(1,1)`
    Identity,
    /// `DEFAULT NEWID()`
    RandomUuid,
    /// `DEFAULT GETUTCDATE()`
    CurrentUtcTimestamp,
}

impl GenerationStrategy {
    /// The strategy implied by a column type, if the type supports one.
    pub fn for_type(sql_type: SqlType) -> Option<Self> {
        if sql_type.is_integer() {
            Some(GenerationStrategy::Identity)
        } else if sql_type == SqlType::UniqueIdentifier {
            Some(GenerationStrategy::RandomUuid)
        } else if sql_type.is_temporal() {
            Some(GenerationStrategy::CurrentUtcTimestamp)
        } else {
            None
        }
    }

    /// Whether the store can apply this strategy to a column of `sql_type`.
    pub fn supports(&self, sql_type: SqlType) -> bool {
        Self::for_type(sql_type) == Some(*self)
    }
}

impl std::fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStrategy::Identity => write!(f, "identity"),
            GenerationStrategy::RandomUuid => write!(f, "random uuid"),
            GenerationStrategy::CurrentUtcTimestamp => write!(f, "current utc timestamp"),
        }
    }
}

/// Runtime representation a column's values are parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NativeType {
    Text,
    Decimal,
    Int,
    BigInt,
    Uuid,
    DateTime,
    DateTimeOffset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sql_type_from_str() {
        assert_eq!(SqlType::from_str("nvarchar").unwrap(), SqlType::NVarchar);
        assert_eq!(SqlType::from_str("UUID").unwrap(), SqlType::UniqueIdentifier);
        assert_eq!(
            SqlType::from_str(" datetime_offset ").unwrap(),
            SqlType::DateTimeOffset
        );
        assert_eq!(
            SqlType::from_str("XML"),
            Err(UnsupportedTypeError("XML".to_string()))
        );
    }

    #[test]
    fn test_keyword_round_trips_through_from_str() {
        for sql_type in SqlType::ALL {
            assert_eq!(SqlType::from_str(sql_type.keyword()).unwrap(), sql_type);
        }
    }

    #[test]
    fn test_generation_strategy_for_type() {
        assert_eq!(
            GenerationStrategy::for_type(SqlType::BigInt),
            Some(GenerationStrategy::Identity)
        );
        assert_eq!(
            GenerationStrategy::for_type(SqlType::UniqueIdentifier),
            Some(GenerationStrategy::RandomUuid)
        );
        assert_eq!(
            GenerationStrategy::for_type(SqlType::SmallDateTime),
            Some(GenerationStrategy::CurrentUtcTimestamp)
        );
        assert_eq!(GenerationStrategy::for_type(SqlType::NVarchar), None);
        assert!(!GenerationStrategy::Identity.supports(SqlType::UniqueIdentifier));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SqlType::DateTimeOffset).unwrap();
        assert_eq!(json, "\"DATETIMEOFFSET\"");
        let strategy: GenerationStrategy = serde_json::from_str("\"RANDOM_UUID\"").unwrap();
        assert_eq!(strategy, GenerationStrategy::RandomUuid);
    }
}
