//! In-memory store implementation
//!
//! Interprets [`SchemaStatement`] steps and enforces the same constraints a
//! SQL Server table would (NOT NULL, declared string length, column types),
//! rejecting a bulk load as a whole when any row violates them. Useful for
//! tests and dry runs where no database is available.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::schema::{ColumnDefinition, DdlStep, SchemaStatement};
use super::{BulkLoadRequest, BulkStore, ConnectionTarget, StoreError, StoreResult};
use crate::convert::TypedValue;
use crate::convert::types::{native_type, utc_now};
use crate::models::{GenerationStrategy, SqlType};
use crate::validation::qualified_name;

/// A committed row, keyed by column name
pub type StoredRow = BTreeMap<String, TypedValue>;

/// Record of one bulk-load call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLoadRecord {
    /// Connection target (masked)
    pub target: String,
    /// `[schema].[table]`
    pub table: String,
    pub max_batch_size: usize,
    pub row_count: usize,
    /// Whether the rows were committed
    pub accepted: bool,
}

#[derive(Debug)]
struct MemoryTable {
    columns: Vec<ColumnDefinition>,
    rows: Vec<StoredRow>,
    next_identity: i64,
}

impl MemoryTable {
    fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_identity: 1,
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
struct MemoryState {
    online: bool,
    ddl_allowed: bool,
    schemas: HashSet<String>,
    tables: HashMap<String, MemoryTable>,
    ddl_statements: Vec<String>,
    bulk_loads: Vec<BulkLoadRecord>,
}

/// In-memory destination database
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn table_key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema.to_lowercase(), table.to_lowercase())
}

impl MemoryStore {
    /// Create an empty, reachable store
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                online: true,
                ddl_allowed: true,
                schemas: HashSet::new(),
                tables: HashMap::new(),
                ddl_statements: Vec::new(),
                bulk_loads: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Simulate the database becoming (un)reachable.
    pub fn set_online(&self, online: bool) {
        self.state().online = online;
    }

    /// Simulate a login without DDL permission.
    pub fn set_ddl_allowed(&self, allowed: bool) {
        self.state().ddl_allowed = allowed;
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.state().tables.contains_key(&table_key(schema, table))
    }

    /// Column definitions of a table, in table order.
    pub fn table_columns(&self, schema: &str, table: &str) -> Option<Vec<ColumnDefinition>> {
        self.state()
            .tables
            .get(&table_key(schema, table))
            .map(|t| t.columns.clone())
    }

    /// Committed rows of a table, in insertion order.
    pub fn rows(&self, schema: &str, table: &str) -> Vec<StoredRow> {
        self.state()
            .tables
            .get(&table_key(schema, table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Rendered SQL of every DDL statement received, including failed ones.
    pub fn ddl_statements(&self) -> Vec<String> {
        self.state().ddl_statements.clone()
    }

    /// Every bulk-load call received, including rejected ones.
    pub fn bulk_loads(&self) -> Vec<BulkLoadRecord> {
        self.state().bulk_loads.clone()
    }

    fn check_online(state: &MemoryState, target: &ConnectionTarget) -> StoreResult<()> {
        if !state.online {
            return Err(StoreError::ConnectionFailed(format!(
                "cannot reach server for '{}'",
                target
            )));
        }
        Ok(())
    }
}

fn generated_value(column: &ColumnDefinition, next_identity: &mut i64) -> StoreResult<TypedValue> {
    let Some(strategy) = column.generation else {
        return Ok(TypedValue::Null);
    };
    let value = match strategy {
        GenerationStrategy::Identity => {
            let value = *next_identity;
            *next_identity += 1;
            if column.sql_type == SqlType::Int {
                let value = i32::try_from(value).map_err(|_| {
                    StoreError::Rejected(format!(
                        "Arithmetic overflow converting IDENTITY to data type int ('{}')",
                        column.name
                    ))
                })?;
                TypedValue::Int(value)
            } else {
                TypedValue::BigInt(value)
            }
        }
        GenerationStrategy::RandomUuid => TypedValue::Uuid(Uuid::new_v4()),
        GenerationStrategy::CurrentUtcTimestamp if column.sql_type == SqlType::DateTimeOffset => {
            TypedValue::DateTimeOffset(utc_now().and_utc().fixed_offset())
        }
        GenerationStrategy::CurrentUtcTimestamp => TypedValue::DateTime(utc_now()),
    };
    Ok(value)
}

fn check_value(column: &ColumnDefinition, value: &TypedValue) -> StoreResult<()> {
    match value.native_type() {
        None if !column.nullable => Err(StoreError::Rejected(format!(
            "Cannot insert the value NULL into column '{}'",
            column.name
        ))),
        None => Ok(()),
        Some(native) if native != native_type(column.sql_type) => {
            Err(StoreError::Rejected(format!(
                "Operand type clash: {:?} is incompatible with {} in column '{}'",
                native, column.storage_type, column.name
            )))
        }
        Some(_) => match value.as_str() {
            // NVARCHAR lengths are UTF-16 code units
            Some(s) if column.max_length > 0 && s.encode_utf16().count() > column.max_length => {
                Err(StoreError::Rejected(format!(
                    "String or binary data would be truncated in column '{}'",
                    column.name
                )))
            }
            _ => Ok(()),
        },
    }
}

impl MemoryState {
    fn apply(&mut self, statement: &SchemaStatement) -> StoreResult<()> {
        let key = table_key(&statement.schema, &statement.table);
        let qualified = qualified_name(&statement.schema, &statement.table);

        for step in &statement.steps {
            match step {
                DdlStep::EnsureSchema => {
                    self.schemas.insert(statement.schema.to_lowercase());
                }
                DdlStep::CreateTable(columns) => {
                    if !self.schemas.contains(&statement.schema.to_lowercase()) {
                        return Err(StoreError::ObjectNotFound(format!(
                            "schema '{}'",
                            statement.schema
                        )));
                    }
                    self.tables
                        .entry(key.clone())
                        .or_insert_with(|| MemoryTable::new(columns.clone()));
                }
                DdlStep::AddColumn(column) => {
                    let table = self
                        .tables
                        .get_mut(&key)
                        .ok_or_else(|| StoreError::ObjectNotFound(qualified.clone()))?;
                    if table.column_index(&column.name).is_some() {
                        continue;
                    }
                    if !table.rows.is_empty() && !column.nullable && column.generation.is_none()
                    {
                        return Err(StoreError::Rejected(format!(
                            "ALTER TABLE only allows columns to be added that can contain nulls, or have a DEFAULT definition ('{}')",
                            column.name
                        )));
                    }
                    let mut next_identity = table.next_identity;
                    let values = table
                        .rows
                        .iter()
                        .map(|_| generated_value(column, &mut next_identity))
                        .collect::<StoreResult<Vec<_>>>()?;
                    for (row, value) in table.rows.iter_mut().zip(values) {
                        row.insert(column.name.clone(), value);
                    }
                    table.next_identity = next_identity;
                    table.columns.push(column.clone());
                }
            }
        }
        Ok(())
    }
}

impl BulkStore for MemoryStore {
    fn execute_ddl(
        &self,
        target: &ConnectionTarget,
        statement: &SchemaStatement,
    ) -> StoreResult<()> {
        let mut state = self.state();
        state.ddl_statements.push(statement.to_sql());
        Self::check_online(&state, target)?;
        if !state.ddl_allowed {
            return Err(StoreError::Rejected(format!(
                "CREATE TABLE permission denied in database for '{}'",
                target
            )));
        }
        state.apply(statement)
    }

    fn execute_bulk_load(
        &self,
        target: &ConnectionTarget,
        request: BulkLoadRequest<'_>,
    ) -> StoreResult<()> {
        let mut state = self.state();
        let qualified = qualified_name(request.schema, request.table);
        let mut record = BulkLoadRecord {
            target: target.masked(),
            table: qualified.clone(),
            max_batch_size: request.max_batch_size,
            row_count: request.rows.len(),
            accepted: false,
        };

        let result = Self::check_online(&state, target).and_then(|_| {
            let table = state
                .tables
                .get_mut(&table_key(request.schema, request.table))
                .ok_or_else(|| {
                    StoreError::ObjectNotFound(format!("Invalid object name '{}'", qualified))
                })?;
            load_rows(table, request)
        });

        record.accepted = result.is_ok();
        state.bulk_loads.push(record);
        result
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// Validate every row first, then commit them all.
fn load_rows(table: &mut MemoryTable, request: BulkLoadRequest<'_>) -> StoreResult<()> {
    let mut mapping = Vec::with_capacity(request.rows.columns().len());
    for header in request.rows.columns() {
        let index = table.column_index(&header.name).ok_or_else(|| {
            StoreError::Rejected(format!(
                "The given ColumnMapping '{}' does not match any column in the destination",
                header.name
            ))
        })?;
        if table.columns[index].generation.is_some() {
            return Err(StoreError::Rejected(format!(
                "Cannot insert explicit value for generated column '{}'",
                header.name
            )));
        }
        mapping.push(index);
    }

    let mut next_identity = table.next_identity;
    let mut staged = Vec::with_capacity(request.rows.len());
    for row in request.rows.rows() {
        let mut stored = StoredRow::new();
        for (column_index, column) in table.columns.iter().enumerate() {
            let value = match mapping.iter().position(|&i| i == column_index) {
                Some(position) => row.get(position).cloned().unwrap_or(TypedValue::Null),
                None => generated_value(column, &mut next_identity)?,
            };
            check_value(column, &value)?;
            stored.insert(column.name.clone(), value);
        }
        staged.push(stored);
    }

    table.next_identity = next_identity;
    table.rows.extend(staged);
    Ok(())
}
