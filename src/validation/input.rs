//! Input validation and quoting utilities.
//!
//! Identifiers coming from configuration end up inside generated DDL, so they
//! are checked here and always emitted bracket-quoted.
//!
//! # Security
//!
//! Input validation prevents:
//! - SQL injection via malicious schema/table/column names
//! - Identifiers longer than SQL Server's `sysname` (128 characters)

use thiserror::Error;

/// Maximum length of a SQL Server identifier (`sysname`)
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Empty(field)
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidCharacters { field, .. }
            | ValidationError::InvalidFormat(field, _) => field,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an identifier (schema, table or column name).
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 128 characters
/// - Must start with a letter or underscore
/// - May contain letters, digits, underscores, `$` and `#`
///
/// Reserved words are allowed because identifiers are always quoted.
///
/// # Examples
///
/// ```
/// use sql_bulk_sink::validation::input::validate_identifier;
///
/// assert!(validate_identifier("column name", "Message").is_ok());
/// assert!(validate_identifier("column name", "Date").is_ok());
/// assert!(validate_identifier("column name", "").is_err());
/// assert!(validate_identifier("table name", "1Log").is_err());
/// assert!(validate_identifier("table name", "Log]; DROP TABLE x").is_err());
/// ```
pub fn validate_identifier(field: &'static str, name: &str) -> ValidationResult<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(ValidationError::Empty(field));
    };

    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_IDENTIFIER_LENGTH,
            actual: length,
        });
    }

    if !first_char.is_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidFormat(
            field,
            "must start with a letter or underscore".to_string(),
        ));
    }

    for c in name.chars() {
        if !c.is_alphanumeric() && c != '_' && c != '$' && c != '#' {
            return Err(ValidationError::InvalidCharacters {
                field,
                reason: format!("invalid character: '{}'", c),
            });
        }
    }

    Ok(())
}

/// Quote an identifier with SQL Server brackets.
///
/// Closing brackets inside the name are doubled, so the result is safe to
/// splice into a statement even for names that skipped validation.
///
/// # Examples
///
/// ```
/// use sql_bulk_sink::validation::input::quote_identifier;
///
/// assert_eq!(quote_identifier("Log"), "[Log]");
/// assert_eq!(quote_identifier("a]b"), "[a]]b]");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote a value as a Unicode string literal (`N'...'`).
///
/// # Examples
///
/// ```
/// use sql_bulk_sink::validation::input::quote_literal;
///
/// assert_eq!(quote_literal("dbo"), "N'dbo'");
/// assert_eq!(quote_literal("it's"), "N'it''s'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Schema-qualified, quoted object name (`[schema].[table]`).
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_accepts_common_names() {
        for name in ["Id", "_ts", "Log2024", "user$name", "temp#1", "Zeitstempel_ä"] {
            assert!(validate_identifier("column name", name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_validate_identifier_rejects_bad_names() {
        assert_eq!(
            validate_identifier("column name", ""),
            Err(ValidationError::Empty("column name"))
        );
        assert!(matches!(
            validate_identifier("column name", "9lives"),
            Err(ValidationError::InvalidFormat(..))
        ));
        assert!(matches!(
            validate_identifier("column name", "my column"),
            Err(ValidationError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_identifier("column name", "x'--"),
            Err(ValidationError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_validate_identifier_length() {
        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(matches!(
            validate_identifier("table name", &long),
            Err(ValidationError::TooLong { max: 128, actual: 129, .. })
        ));
        assert!(validate_identifier("table name", &long[1..]).is_ok());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("dbo", "Log"), "[dbo].[Log]");
    }
}
