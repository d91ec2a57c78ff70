//! Bulk writer
//!
//! [`BulkSink`] owns the table spec, the settings and the store. The first
//! write creates the destination table; after that every write goes straight
//! to bulk loading. A failed schema statement is logged and counted, and the
//! write still goes ahead since the table may already exist. Every write
//! takes `&mut self`, so one sink serves one writer at a time.

use tracing::{debug, error, info, warn};

use super::batch::{RowSet, chunks};
use super::event::{AsyncLogEvent, LogRecord};
use super::{SchemaState, SinkError, SinkResult, SinkSettings, SinkStats};
#[cfg(feature = "config")]
use crate::database::SinkConfig;
use crate::database::{BulkLoadRequest, BulkStore, SchemaStatement, build_create_table};
use crate::models::TableSpec;

/// Writes log events into one destination table
#[derive(Debug)]
pub struct BulkSink<S: BulkStore> {
    spec: TableSpec,
    settings: SinkSettings,
    store: S,
    schema: SchemaStatement,
    state: SchemaState,
    stats: SinkStats,
}

impl<S: BulkStore> BulkSink<S> {
    /// Create a sink. Nothing is sent to the store until the first write.
    pub fn new(spec: TableSpec, settings: SinkSettings, store: S) -> SinkResult<Self> {
        settings.validate()?;
        let schema = build_create_table(&spec);
        Ok(Self {
            spec,
            settings,
            store,
            schema,
            state: SchemaState::Uninitialized,
            stats: SinkStats::default(),
        })
    }

    /// Create a sink from a loaded configuration.
    #[cfg(feature = "config")]
    pub fn from_config(config: &SinkConfig, store: S) -> SinkResult<Self> {
        Self::new(config.table_spec()?, config.settings()?, store)
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn settings(&self) -> &SinkSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The statement used to create the destination table
    pub fn schema_statement(&self) -> &SchemaStatement {
        &self.schema
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Run the schema statement now.
    ///
    /// On success the sink is [`SchemaState::Ready`] for the rest of its life.
    /// On failure the error is logged, counted and returned, and the state
    /// is left unchanged so the next write tries again.
    pub fn create_table(&mut self) -> SinkResult<()> {
        let target = self.settings.ddl_target();
        if self.settings.ddl_connection.is_none() {
            debug!("No DDL connection configured, using primary connection");
        }

        match self.store.execute_ddl(target, &self.schema) {
            Ok(()) => {
                info!(
                    "Destination table {}.{} ready ({} store)",
                    self.spec.schema_name(),
                    self.spec.table_name(),
                    self.store.store_type()
                );
                self.state = SchemaState::Ready;
                Ok(())
            }
            Err(e) => {
                self.stats.schema_creation_failures += 1;
                error!(
                    "Failed to create table {}.{} on {}: {}",
                    self.spec.schema_name(),
                    self.spec.table_name(),
                    target,
                    e
                );
                Err(SinkError::SchemaCreation(e))
            }
        }
    }

    fn ensure_schema(&mut self) {
        if self.state == SchemaState::Ready {
            return;
        }
        if !self.settings.create_table_if_not_exists {
            self.state = SchemaState::Ready;
            return;
        }
        // failure is already logged and counted; the write goes ahead
        let _ = self.create_table();
    }

    /// Write a single event.
    ///
    /// Store failures are returned as [`SinkError::BulkLoad`]; there is no
    /// retry.
    pub fn write_one<E: LogRecord + ?Sized>(&mut self, event: &E) -> SinkResult<()> {
        self.ensure_schema();
        let rows = RowSet::from_events(self.spec.logging_columns(), std::iter::once(event));
        self.bulk_load(&rows)
    }

    /// Write events in chunks of the configured batch size.
    ///
    /// Each chunk is one bulk-load call. When the store rejects a chunk,
    /// every event in it gets the same error; chunks already written stay
    /// committed and later chunks are still attempted. Every event's
    /// completion handle is called exactly once, right after its chunk.
    pub fn write_many<E: LogRecord>(&mut self, events: Vec<AsyncLogEvent<E>>) {
        if events.is_empty() {
            return;
        }
        self.ensure_schema();

        let total = events.len();
        for (index, chunk) in chunks(events, self.settings.batch_size)
            .into_iter()
            .enumerate()
        {
            let columns = self.spec.logging_columns();
            let chunk_events = chunk.iter().map(|queued| &queued.event);
            let rows = if self.settings.allow_multiple_log_entries_per_row {
                RowSet::from_joined_events(columns, chunk_events)
            } else {
                RowSet::from_events(columns, chunk_events)
            };

            debug!(
                "Writing chunk {} ({} events, {} rows) of {} events",
                index + 1,
                chunk.len(),
                rows.len(),
                total
            );
            let result = self.bulk_load(&rows);
            for queued in chunk {
                queued.complete(result.clone());
            }
        }
    }

    fn bulk_load(&mut self, rows: &RowSet) -> SinkResult<()> {
        let request = BulkLoadRequest {
            schema: self.spec.schema_name(),
            table: self.spec.table_name(),
            max_batch_size: self.settings.batch_size,
            rows,
        };

        match self
            .store
            .execute_bulk_load(&self.settings.connection, request)
        {
            Ok(()) => {
                self.stats.batches_written += 1;
                self.stats.rows_written += rows.len();
                Ok(())
            }
            Err(e) => {
                self.stats.batches_failed += 1;
                self.stats.rows_failed += rows.len();
                warn!(
                    "Bulk load of {} rows into {}.{} failed: {}",
                    rows.len(),
                    self.spec.schema_name(),
                    self.spec.table_name(),
                    e
                );
                Err(SinkError::BulkLoad(e))
            }
        }
    }
}
