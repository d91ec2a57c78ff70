//! Row assembly
//!
//! Rows are immutable values built straight from the events of one chunk;
//! nothing is shared between rows or kept after the chunk is written.

use super::event::LogRecord;
use crate::convert::{TypedValue, convert, convert_raw};
use crate::models::{LoggingColumn, SqlType};

/// Separator between renderings when several events share one row
pub const ENTRY_SEPARATOR: &str = "\n";

/// Name and type of one column in a [`RowSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub name: String,
    pub sql_type: SqlType,
}

impl From<&LoggingColumn> for ColumnHeader {
    fn from(column: &LoggingColumn) -> Self {
        Self {
            name: column.name.clone(),
            sql_type: column.sql_type,
        }
    }
}

/// One row: a value per logging column, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow(Vec<TypedValue>);

impl TypedRow {
    pub fn values(&self) -> &[TypedValue] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&TypedValue> {
        self.0.get(index)
    }
}

/// The rows of one bulk load, with their column header
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    columns: Vec<ColumnHeader>,
    rows: Vec<TypedRow>,
}

impl RowSet {
    /// One row per event.
    pub fn from_events<'a, E, I>(columns: &[LoggingColumn], events: I) -> Self
    where
        E: LogRecord + ?Sized + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        let rows = events
            .into_iter()
            .map(|event| TypedRow(columns.iter().map(|c| convert(c, event)).collect()))
            .collect();
        Self {
            columns: headers(columns),
            rows,
        }
    }

    /// A single row holding every event.
    ///
    /// Each column's renderings are joined with [`ENTRY_SEPARATOR`] and the
    /// result converted once, so string truncation applies to the joined
    /// text. No events means no rows.
    pub fn from_joined_events<'a, E, I>(columns: &[LoggingColumn], events: I) -> Self
    where
        E: LogRecord + ?Sized + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        let events: Vec<&E> = events.into_iter().collect();
        let rows = if events.is_empty() {
            Vec::new()
        } else {
            let values = columns
                .iter()
                .map(|column| {
                    let joined = events
                        .iter()
                        .map(|event| event.render(&column.layout))
                        .collect::<Vec<_>>()
                        .join(ENTRY_SEPARATOR);
                    convert_raw(column, &joined)
                })
                .collect();
            vec![TypedRow(values)]
        };
        Self {
            columns: headers(columns),
            rows,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_values(columns: &[LoggingColumn], rows: Vec<Vec<TypedValue>>) -> Self {
        Self {
            columns: headers(columns),
            rows: rows.into_iter().map(TypedRow).collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnHeader] {
        &self.columns
    }

    pub fn rows(&self) -> &[TypedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` (case-insensitive) in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&TypedValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(index)
    }
}

fn headers(columns: &[LoggingColumn]) -> Vec<ColumnHeader> {
    columns.iter().map(ColumnHeader::from).collect()
}

/// Split `items` into chunks of `batch_size`, keeping order.
///
/// Yields `ceil(N / batch_size)` chunks; only the last may be smaller. A
/// batch size of 0 is treated as 1.
pub fn chunks<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let size = batch_size.max(1);
    let mut result = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        result.push(items.by_ref().take(size).collect());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn columns() -> Vec<LoggingColumn> {
        vec![
            LoggingColumn::new("Level", SqlType::Varchar, "${level}").with_length(10),
            LoggingColumn::new("Count", SqlType::Int, "${count}"),
        ]
    }

    fn event(level: &str, count: &str) -> HashMap<&'static str, String> {
        HashMap::from([
            ("${level}", level.to_string()),
            ("${count}", count.to_string()),
        ])
    }

    struct MapEvent(HashMap<&'static str, String>);

    impl LogRecord for MapEvent {
        fn render(&self, layout: &str) -> String {
            self.0.get(layout).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_chunks_partition() {
        for (n, b) in [(0usize, 3usize), (1, 3), (3, 3), (7, 3), (10, 1), (5, 100)] {
            let parts = chunks((0..n).collect::<Vec<_>>(), b);
            assert_eq!(parts.len(), n.div_ceil(b), "n={n} b={b}");
            if let Some(last) = parts.last() {
                let expected = if n % b == 0 { b } else { n % b };
                assert_eq!(last.len(), expected.min(n));
            }
            let flattened: Vec<_> = parts.into_iter().flatten().collect();
            assert_eq!(flattened, (0..n).collect::<Vec<_>>());
        }
        assert_eq!(chunks(vec![1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_from_events_one_row_per_event() {
        let events = [
            MapEvent(event("INFO", "1")),
            MapEvent(event("WARN", "not-a-number")),
        ];
        let rows = RowSet::from_events(&columns(), events.iter());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.columns()[1].name, "Count");
        assert_eq!(rows.get(0, "count"), Some(&TypedValue::Int(1)));
        assert_eq!(rows.get(1, "Count"), Some(&TypedValue::Null));
        assert_eq!(
            rows.get(1, "Level"),
            Some(&TypedValue::String("WARN".into()))
        );
        assert_eq!(rows.get(2, "Level"), None);
        assert_eq!(rows.get(0, "Missing"), None);
    }

    #[test]
    fn test_from_joined_events() {
        let events = [
            MapEvent(event("INFO", "1")),
            MapEvent(event("WARN", "2")),
        ];
        let rows = RowSet::from_joined_events(&columns(), events.iter());

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows.get(0, "Level"),
            Some(&TypedValue::String("INFO\nWARN".into()))
        );
        // "1\n2" is not an integer
        assert_eq!(rows.get(0, "Count"), Some(&TypedValue::Null));

        let none: [MapEvent; 0] = [];
        assert!(RowSet::from_joined_events(&columns(), none.iter()).is_empty());
    }

    #[test]
    fn test_joined_rendering_is_truncated() {
        let events: Vec<MapEvent> = (0..5).map(|_| MapEvent(event("ERROR", "1"))).collect();
        let rows = RowSet::from_joined_events(&columns(), events.iter());
        assert_eq!(
            rows.get(0, "Level"),
            Some(&TypedValue::String("ERROR\nERRO".into()))
        );
    }
}
