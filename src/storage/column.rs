//! Columnar buffer storage.
//!
//! A `ColumnBuffer` is an immutable, homogeneous array of one primitive
//! type, reference-counted so that scan batches can expose zero-copy
//! windows into it while the owning table stays alive.

use std::sync::Arc;

use super::types::{DataType, Datum};

/// One typed column: a contiguous array behind a shared handle.
#[derive(Debug, Clone)]
pub enum ColumnBuffer {
    Int64(Arc<Vec<i64>>),
    Double(Arc<Vec<f64>>),
    Str(Arc<Vec<u32>>),
    Date32(Arc<Vec<i32>>),
}

impl ColumnBuffer {
    /// The element type stored in this buffer.
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnBuffer::Int64(_) => DataType::Int64,
            ColumnBuffer::Double(_) => DataType::Double,
            ColumnBuffer::Str(_) => DataType::Str,
            ColumnBuffer::Date32(_) => DataType::Date32,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            ColumnBuffer::Int64(v) => v.len(),
            ColumnBuffer::Double(v) => v.len(),
            ColumnBuffer::Str(v) => v.len(),
            ColumnBuffer::Date32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `row` as a datum.
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    pub fn value(&self, row: usize) -> Datum {
        match self {
            ColumnBuffer::Int64(v) => Datum::Int64(v[row]),
            ColumnBuffer::Double(v) => Datum::Double(v[row]),
            ColumnBuffer::Str(v) => Datum::Str(v[row]),
            ColumnBuffer::Date32(v) => Datum::Date32(v[row]),
        }
    }
}

impl From<Vec<i64>> for ColumnBuffer {
    fn from(v: Vec<i64>) -> Self {
        ColumnBuffer::Int64(Arc::new(v))
    }
}

impl From<Vec<f64>> for ColumnBuffer {
    fn from(v: Vec<f64>) -> Self {
        ColumnBuffer::Double(Arc::new(v))
    }
}

impl From<Vec<u32>> for ColumnBuffer {
    fn from(v: Vec<u32>) -> Self {
        ColumnBuffer::Str(Arc::new(v))
    }
}

impl From<Vec<i32>> for ColumnBuffer {
    fn from(v: Vec<i32>) -> Self {
        ColumnBuffer::Date32(Arc::new(v))
    }
}
