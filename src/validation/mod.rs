//! Validation module
//!
//! Checks identifiers before they reach generated DDL.

pub mod input;

pub use input::{
    ValidationError, ValidationResult, qualified_name, quote_identifier, quote_literal,
    validate_identifier,
};
