//! Destination table DDL
//!
//! Builds the statement that creates the log table. The statement is kept
//! structured ([`DdlStep`]) so stores can interpret it directly, and renders
//! to T-SQL via [`SchemaStatement::to_sql`]. Every step is guarded by an
//! existence check, so running it against a table created by an earlier
//! process is a no-op apart from adding missing columns.

use crate::models::{GeneratedColumn, GenerationStrategy, LoggingColumn, SqlType, TableSpec};
use crate::validation::{qualified_name, quote_identifier, quote_literal};

/// A single column definition as it appears in DDL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// Semantic type
    pub sql_type: SqlType,
    /// Storage type as written in DDL, e.g. `NVARCHAR(50)`
    pub storage_type: String,
    /// Maximum length for string columns (0 = MAX / not applicable)
    pub max_length: usize,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Store-side generation, for generated columns
    pub generation: Option<GenerationStrategy>,
}

impl ColumnDefinition {
    /// Definition for a column the store fills itself.
    pub fn generated(column: &GeneratedColumn) -> Self {
        Self {
            name: column.name.clone(),
            sql_type: column.sql_type,
            storage_type: column.sql_type.keyword().to_string(),
            max_length: 0,
            nullable: false,
            generation: Some(column.strategy),
        }
    }

    /// Definition for a column rendered from log events.
    pub fn logging(column: &LoggingColumn) -> Self {
        let (storage_type, max_length) = storage_type(column);
        Self {
            name: column.name.clone(),
            sql_type: column.sql_type,
            storage_type,
            max_length,
            nullable: column.allow_null,
            generation: None,
        }
    }

    /// Column definition as T-SQL, e.g. `[Id] BIGINT IDENTITY(1,1) NOT NULL`.
    pub fn to_sql(&self) -> String {
        let name = quote_identifier(&self.name);
        match self.generation {
            Some(GenerationStrategy::Identity) => {
                format!("{} {} IDENTITY(1,1) NOT NULL", name, self.storage_type)
            }
            Some(GenerationStrategy::RandomUuid) => {
                format!("{} {} NOT NULL DEFAULT NEWID()", name, self.storage_type)
            }
            Some(GenerationStrategy::CurrentUtcTimestamp) => {
                format!("{} {} NOT NULL DEFAULT GETUTCDATE()", name, self.storage_type)
            }
            None => {
                let null = if self.nullable { "NULL" } else { "NOT NULL" };
                format!("{} {} {}", name, self.storage_type, null)
            }
        }
    }
}

/// Storage type for a logging column and the length the store will enforce.
fn storage_type(column: &LoggingColumn) -> (String, usize) {
    match column.sql_type.max_declared_length() {
        Some(limit) if column.length == 0 || column.length > limit => {
            (format!("{}(MAX)", column.sql_type.keyword()), 0)
        }
        Some(_) => (
            format!("{}({})", column.sql_type.keyword(), column.length),
            column.length,
        ),
        None if column.sql_type.is_fixed_point() => (
            format!(
                "{}({}, {})",
                column.sql_type.keyword(),
                column.precision,
                column.scale
            ),
            0,
        ),
        None => (column.sql_type.keyword().to_string(), 0),
    }
}

/// One guarded step of a schema statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStep {
    /// Create the schema unless it exists
    EnsureSchema,
    /// Create the table with these columns unless it exists
    CreateTable(Vec<ColumnDefinition>),
    /// Add the column unless the table already has it
    AddColumn(ColumnDefinition),
}

/// Idempotent statement creating (or completing) the destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatement {
    pub schema: String,
    pub table: String,
    pub steps: Vec<DdlStep>,
}

impl SchemaStatement {
    /// All column definitions, in table order.
    pub fn columns(&self) -> Vec<&ColumnDefinition> {
        self.steps
            .iter()
            .find_map(|step| match step {
                DdlStep::CreateTable(columns) => Some(columns.iter().collect()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Render the statement as a T-SQL batch.
    pub fn to_sql(&self) -> String {
        let table = qualified_name(&self.schema, &self.table);
        let table_literal = quote_literal(&table);

        let mut sql = String::new();
        for step in &self.steps {
            match step {
                DdlStep::EnsureSchema => {
                    let create = format!("CREATE SCHEMA {}", quote_identifier(&self.schema));
                    sql.push_str(&format!(
                        "IF SCHEMA_ID({}) IS NULL\n    EXEC({});\n",
                        quote_literal(&self.schema),
                        quote_literal(&create)
                    ));
                }
                DdlStep::CreateTable(columns) => {
                    let definitions: Vec<String> = columns
                        .iter()
                        .map(|c| format!("    {}", c.to_sql()))
                        .collect();
                    sql.push_str(&format!(
                        "IF OBJECT_ID({}, N'U') IS NULL\nCREATE TABLE {} (\n{}\n);\n",
                        table_literal,
                        table,
                        definitions.join(",\n")
                    ));
                }
                DdlStep::AddColumn(column) => {
                    sql.push_str(&format!(
                        "IF COL_LENGTH({}, {}) IS NULL\n    ALTER TABLE {} ADD {};\n",
                        table_literal,
                        quote_literal(&column.name),
                        table,
                        column.to_sql()
                    ));
                }
            }
        }
        sql
    }
}

impl std::fmt::Display for SchemaStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Incremental builder for [`SchemaStatement`]
///
/// Columns are emitted in the order they are added; [`build_create_table`]
/// adds generated columns before logging columns.
#[derive(Debug, Clone)]
pub struct CreateTableBuilder {
    schema: String,
    table: String,
    columns: Vec<ColumnDefinition>,
}

impl CreateTableBuilder {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn add_generated_column(mut self, column: &GeneratedColumn) -> Self {
        self.columns.push(ColumnDefinition::generated(column));
        self
    }

    pub fn add_logging_column(mut self, column: &LoggingColumn) -> Self {
        self.columns.push(ColumnDefinition::logging(column));
        self
    }

    pub fn build(self) -> SchemaStatement {
        let mut steps = Vec::with_capacity(self.columns.len() + 2);
        steps.push(DdlStep::EnsureSchema);
        steps.push(DdlStep::CreateTable(self.columns.clone()));
        steps.extend(self.columns.into_iter().map(DdlStep::AddColumn));

        SchemaStatement {
            schema: self.schema,
            table: self.table,
            steps,
        }
    }
}

/// Build the idempotent creation statement for `spec`.
pub fn build_create_table(spec: &TableSpec) -> SchemaStatement {
    let builder = spec
        .generated_columns()
        .iter()
        .fold(
            CreateTableBuilder::new(spec.schema_name(), spec.table_name()),
            |builder, column| builder.add_generated_column(column),
        );

    spec.logging_columns()
        .iter()
        .fold(builder, |builder, column| builder.add_logging_column(column))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TableSpec {
        TableSpec::new(
            "dbo",
            "Log",
            vec![
                GeneratedColumn::new("Id", SqlType::BigInt).unwrap(),
                GeneratedColumn::new("RowGuid", SqlType::UniqueIdentifier).unwrap(),
                GeneratedColumn::new("InsertedAt", SqlType::DateTime2).unwrap(),
            ],
            vec![
                LoggingColumn::new("Level", SqlType::Varchar, "${level}").with_length(10),
                LoggingColumn::new("Message", SqlType::NVarchar, "${message}"),
                LoggingColumn::new("Amount", SqlType::Decimal, "${amount}").with_precision(10, 2),
                LoggingColumn::new("Logged", SqlType::DateTime, "${longdate}").not_null(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_generated_column_sql() {
        let statement = build_create_table(&spec());
        let columns = statement.columns();
        assert_eq!(columns[0].to_sql(), "[Id] BIGINT IDENTITY(1,1) NOT NULL");
        assert_eq!(
            columns[1].to_sql(),
            "[RowGuid] UNIQUEIDENTIFIER NOT NULL DEFAULT NEWID()"
        );
        assert_eq!(
            columns[2].to_sql(),
            "[InsertedAt] DATETIME2 NOT NULL DEFAULT GETUTCDATE()"
        );
    }

    #[test]
    fn test_logging_column_sql() {
        let statement = build_create_table(&spec());
        let columns = statement.columns();
        assert_eq!(columns[3].to_sql(), "[Level] VARCHAR(10) NULL");
        assert_eq!(columns[3].max_length, 10);
        assert_eq!(columns[4].to_sql(), "[Message] NVARCHAR(MAX) NULL");
        assert_eq!(columns[5].to_sql(), "[Amount] DECIMAL(10, 2) NULL");
        assert_eq!(columns[6].to_sql(), "[Logged] DATETIME NOT NULL");
    }

    #[test]
    fn test_oversized_length_becomes_max() {
        let column = LoggingColumn::new("Body", SqlType::NVarchar, "x").with_length(4001);
        let definition = ColumnDefinition::logging(&column);
        assert_eq!(definition.storage_type, "NVARCHAR(MAX)");
        assert_eq!(definition.max_length, 0);

        let column = LoggingColumn::new("Body", SqlType::Varchar, "x").with_length(8000);
        assert_eq!(ColumnDefinition::logging(&column).storage_type, "VARCHAR(8000)");
    }

    #[test]
    fn test_column_order_generated_first() {
        let statement = build_create_table(&spec());
        let names: Vec<&str> = statement.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Id", "RowGuid", "InsertedAt", "Level", "Message", "Amount", "Logged"]
        );

        let added: Vec<&str> = statement
            .steps
            .iter()
            .filter_map(|step| match step {
                DdlStep::AddColumn(c) => Some(c.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(added, names);
    }

    #[test]
    fn test_sql_is_guarded() {
        let sql = build_create_table(&spec()).to_sql();
        assert!(sql.starts_with("IF SCHEMA_ID(N'dbo') IS NULL\n    EXEC(N'CREATE SCHEMA [dbo]');"));
        assert!(sql.contains("IF OBJECT_ID(N'[dbo].[Log]', N'U') IS NULL\nCREATE TABLE [dbo].[Log] (\n    [Id] BIGINT"));
        assert!(sql.contains(
            "IF COL_LENGTH(N'[dbo].[Log]', N'Message') IS NULL\n    ALTER TABLE [dbo].[Log] ADD [Message] NVARCHAR(MAX) NULL;"
        ));
        assert_eq!(sql.matches("CREATE TABLE").count(), 1);
        assert_eq!(sql.matches("ALTER TABLE").count(), 7);
    }

    #[test]
    fn test_builder_matches_build_create_table() {
        let spec = spec();
        let mut builder = CreateTableBuilder::new("dbo", "Log");
        for column in spec.generated_columns() {
            builder = builder.add_generated_column(column);
        }
        for column in spec.logging_columns() {
            builder = builder.add_logging_column(column);
        }
        assert_eq!(builder.build(), build_create_table(&spec));
    }
}
