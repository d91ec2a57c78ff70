//! Models module
//!
//! Declarative description of the destination table: column types, generated
//! columns, logging columns and the table that holds them.

pub mod column;
pub mod enums;
pub mod table;

pub use column::{GeneratedColumn, LoggingColumn};
pub use enums::*;
pub use table::{DEFAULT_SCHEMA, ModelError, ModelResult, TableSpec};
