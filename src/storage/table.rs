//! Tables and table metadata.
//!
//! A `Table` is an ordered list of named column buffers plus the shared
//! dictionary its string columns are encoded against. `TableMeta` carries
//! names, types, and load-time statistics, decoupled from the data so
//! metadata can outlive or precede it.

use super::column::ColumnBuffer;
use super::dictionary::SharedDictionary;
use super::types::{DataType, Datum};

/// A named column inside a table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Arbitrary name; callers use `table.column` qualification by
    /// embedding a dot. Duplicates are allowed; first match wins.
    pub name: String,
    pub data: ColumnBuffer,
}

/// An in-memory table: columns of identical length plus the dictionary
/// their string columns refer to.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<TableColumn>,
    pub dict: SharedDictionary,
}

impl Table {
    /// Row count, taken from the first column (all columns match).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Load-time statistics for one column. Min/max are tracked for numeric
/// and date columns; the distinct count is measured for every column.
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub min: Option<Datum>,
    pub max: Option<Datum>,
    /// Number of distinct values.
    pub ndv: usize,
}

/// Name, type, and statistics for one column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
    pub stats: ColumnStats,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            stats: ColumnStats::default(),
        }
    }
}

/// Table-level metadata.
#[derive(Debug, Clone)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    pub row_count: usize,
}
