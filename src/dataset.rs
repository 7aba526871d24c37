// In-memory tabular data: the loaded dataset and derived tables

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One row, cells aligned with the owning table's columns.
pub type Row = Vec<Value>;

/// Columns plus rows. Produced by ingestion, filtering and aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table, padding short rows with `Missing` and dropping extra cells.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by column name. Unknown columns read as `Missing`.
    pub fn cell<'a>(&self, row: &'a Row, column: &str) -> &'a Value {
        cell_at(row, self.column_index(column))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

static MISSING: Value = Value::Missing;

pub(crate) fn cell_at(row: &Row, index: Option<usize>) -> &Value {
    index.and_then(|i| row.get(i)).unwrap_or(&MISSING)
}

/// The dataset loaded from a source file.
///
/// Immutable once built and cheap to clone. A new load replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    table: Arc<Table>,
}

impl Dataset {
    /// Columns are kept only when there is at least one row.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        if rows.is_empty() {
            return Dataset::empty();
        }
        Dataset {
            table: Arc::new(Table::new(columns, rows)),
        }
    }

    pub fn empty() -> Self {
        Dataset::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.table.rows
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.table.column_index(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Find a column by name ignoring ASCII case, returning its actual name.
    pub fn resolve_column(&self, name: &str) -> Option<&str> {
        self.column_index(name)
            .or_else(|| {
                self.table
                    .columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(name))
            })
            .map(|i| self.table.columns[i].as_str())
    }
}
