//! Columnar table scan.

use crate::error::Result;
use crate::exec::batch::{ColumnSlice, ExecBatch, BATCH_SIZE};
use crate::storage::{ColumnBuffer, DataType, SharedDictionary, Table};

use super::Operator;

/// Scans a projected subset of a table's columns in batches. Each batch is
/// a zero-copy window into the table's buffers; the shared handles keep
/// the storage alive for as long as the batch circulates.
pub struct ColumnarScan {
    names: Vec<String>,
    types: Vec<DataType>,
    buffers: Vec<ColumnBuffer>,
    dict: SharedDictionary,
    row_count: usize,
    offset: usize,
    batch_size: usize,
}

impl ColumnarScan {
    /// Scan `table`, exposing the columns at `indices` in order. An empty
    /// index list exposes every column.
    pub fn new(table: &Table, indices: Vec<usize>) -> Self {
        let indices = if indices.is_empty() {
            (0..table.columns.len()).collect()
        } else {
            indices
        };
        let mut names = Vec::with_capacity(indices.len());
        let mut types = Vec::with_capacity(indices.len());
        let mut buffers = Vec::with_capacity(indices.len());
        for &i in &indices {
            let column = &table.columns[i];
            names.push(column.name.clone());
            types.push(column.data.data_type());
            buffers.push(column.data.clone());
        }
        Self {
            names,
            types,
            buffers,
            dict: table.dict.clone(),
            row_count: table.row_count(),
            offset: 0,
            batch_size: BATCH_SIZE,
        }
    }

    #[cfg(test)]
    fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Operator for ColumnarScan {
    fn open(&mut self) -> Result<()> {
        self.offset = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        if self.offset >= self.row_count || self.buffers.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.row_count - self.offset);
        let columns = self
            .buffers
            .iter()
            .map(|buffer| ColumnSlice::from_buffer(buffer, self.offset, take))
            .collect();
        self.offset += take;
        Ok(Some(ExecBatch::new(columns, take)))
    }

    fn close(&mut self) {}

    fn output_names(&self) -> &[String] {
        &self.names
    }

    fn output_types(&self) -> &[DataType] {
        &self.types
    }

    fn dictionary(&self) -> Option<SharedDictionary> {
        Some(self.dict.clone())
    }
}
