//! Columnar execution batches.
//!
//! An `ExecBatch` is a slab of rows flowing between operators: a length
//! plus one `ColumnSlice` per output column. A slice is a typed window
//! into a reference-counted buffer, so scan passthrough shares storage
//! with the source table while operator-produced columns own fresh
//! buffers. All slices in a batch have the same length.

use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::storage::{ColumnBuffer, DataType, Datum};

/// Target number of rows per batch. Operators may emit smaller final
/// batches.
pub const BATCH_SIZE: usize = 4096;

/// A typed window into a shared buffer.
#[derive(Debug, Clone)]
pub struct TypedSlice<T> {
    buf: Arc<Vec<T>>,
    offset: usize,
    len: usize,
}

impl<T> TypedSlice<T> {
    /// # Panics
    /// Panics if the window exceeds the buffer.
    pub fn new(buf: Arc<Vec<T>>, offset: usize, len: usize) -> Self {
        assert!(offset + len <= buf.len(), "slice window out of bounds");
        Self { buf, offset, len }
    }

    pub fn values(&self) -> &[T] {
        &self.buf[self.offset..self.offset + self.len]
    }

    fn narrowed(&self, offset: usize, len: usize) -> Self {
        Self::new(Arc::clone(&self.buf), self.offset + offset, len)
    }
}

/// A type-erased column slice: one typed window per primitive type.
#[derive(Debug, Clone)]
pub enum ColumnSlice {
    Int64(TypedSlice<i64>),
    Double(TypedSlice<f64>),
    Str(TypedSlice<u32>),
    Date32(TypedSlice<i32>),
}

impl ColumnSlice {
    /// A zero-copy window of `len` rows into a table buffer starting at
    /// `offset`.
    pub fn from_buffer(buffer: &ColumnBuffer, offset: usize, len: usize) -> Self {
        match buffer {
            ColumnBuffer::Int64(b) => ColumnSlice::Int64(TypedSlice::new(Arc::clone(b), offset, len)),
            ColumnBuffer::Double(b) => {
                ColumnSlice::Double(TypedSlice::new(Arc::clone(b), offset, len))
            }
            ColumnBuffer::Str(b) => ColumnSlice::Str(TypedSlice::new(Arc::clone(b), offset, len)),
            ColumnBuffer::Date32(b) => {
                ColumnSlice::Date32(TypedSlice::new(Arc::clone(b), offset, len))
            }
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnSlice::Int64(_) => DataType::Int64,
            ColumnSlice::Double(_) => DataType::Double,
            ColumnSlice::Str(_) => DataType::Str,
            ColumnSlice::Date32(_) => DataType::Date32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnSlice::Int64(s) => s.len,
            ColumnSlice::Double(s) => s.len,
            ColumnSlice::Str(s) => s.len,
            ColumnSlice::Date32(s) => s.len,
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
            ColumnSlice::Int64(s) => Datum::Int64(s.values()[row]),
            ColumnSlice::Double(s) => Datum::Double(s.values()[row]),
            ColumnSlice::Str(s) => Datum::Str(s.values()[row]),
            ColumnSlice::Date32(s) => Datum::Date32(s.values()[row]),
        }
    }

    /// A sub-window of this slice, sharing the same buffer.
    ///
    /// # Panics
    /// Panics if the window exceeds this slice.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        match self {
            ColumnSlice::Int64(s) => ColumnSlice::Int64(s.narrowed(offset, len)),
            ColumnSlice::Double(s) => ColumnSlice::Double(s.narrowed(offset, len)),
            ColumnSlice::Str(s) => ColumnSlice::Str(s.narrowed(offset, len)),
            ColumnSlice::Date32(s) => ColumnSlice::Date32(s.narrowed(offset, len)),
        }
    }
}

/// A batch of rows: column slices of identical length.
#[derive(Debug, Clone, Default)]
pub struct ExecBatch {
    pub columns: Vec<ColumnSlice>,
    pub len: usize,
}

impl ExecBatch {
    pub fn new(columns: Vec<ColumnSlice>, len: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == len));
        Self { columns, len }
    }

    /// All column values of one row, materialised as datums.
    pub fn row(&self, row: usize) -> Vec<Datum> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }
}

/// An append-only typed column under construction. Numeric datums are
/// coerced to the builder's type; a string datum into a non-string builder
/// (or vice versa) is a type error.
#[derive(Debug)]
pub enum ColumnBuilder {
    Int64(Vec<i64>),
    Double(Vec<f64>),
    Str(Vec<u32>),
    Date32(Vec<i32>),
}

impl ColumnBuilder {
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::Int64 => ColumnBuilder::Int64(Vec::new()),
            DataType::Double => ColumnBuilder::Double(Vec::new()),
            DataType::Str => ColumnBuilder::Str(Vec::new()),
            DataType::Date32 => ColumnBuilder::Date32(Vec::new()),
        }
    }

    pub fn with_capacity(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Int64 => ColumnBuilder::Int64(Vec::with_capacity(capacity)),
            DataType::Double => ColumnBuilder::Double(Vec::with_capacity(capacity)),
            DataType::Str => ColumnBuilder::Str(Vec::with_capacity(capacity)),
            DataType::Date32 => ColumnBuilder::Date32(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnBuilder::Int64(v) => v.len(),
            ColumnBuilder::Double(v) => v.len(),
            ColumnBuilder::Str(v) => v.len(),
            ColumnBuilder::Date32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a datum, widening or narrowing between the numeric types as
    /// needed.
    pub fn push(&mut self, value: Datum) -> Result<()> {
        match self {
            ColumnBuilder::Int64(v) => match value {
                Datum::Int64(x) => v.push(x),
                Datum::Double(x) => v.push(x as i64),
                Datum::Date32(x) => v.push(x as i64),
                Datum::Str(_) => return Err(type_mismatch(DataType::Int64, value)),
            },
            ColumnBuilder::Double(v) => match value {
                Datum::Double(x) => v.push(x),
                Datum::Int64(x) => v.push(x as f64),
                Datum::Date32(x) => v.push(x as f64),
                Datum::Str(_) => return Err(type_mismatch(DataType::Double, value)),
            },
            ColumnBuilder::Str(v) => match value {
                Datum::Str(code) => v.push(code),
                _ => return Err(type_mismatch(DataType::Str, value)),
            },
            ColumnBuilder::Date32(v) => match value {
                Datum::Date32(x) => v.push(x),
                Datum::Int64(x) => v.push(x as i32),
                _ => return Err(type_mismatch(DataType::Date32, value)),
            },
        }
        Ok(())
    }

    /// Append the value at `row` of a same-typed slice.
    pub fn push_from(&mut self, slice: &ColumnSlice, row: usize) -> Result<()> {
        self.push(slice.value(row))
    }

    /// Freeze into a slice over a freshly allocated buffer.
    pub fn finish(self) -> ColumnSlice {
        match self {
            ColumnBuilder::Int64(v) => {
                let len = v.len();
                ColumnSlice::Int64(TypedSlice::new(Arc::new(v), 0, len))
            }
            ColumnBuilder::Double(v) => {
                let len = v.len();
                ColumnSlice::Double(TypedSlice::new(Arc::new(v), 0, len))
            }
            ColumnBuilder::Str(v) => {
                let len = v.len();
                ColumnSlice::Str(TypedSlice::new(Arc::new(v), 0, len))
            }
            ColumnBuilder::Date32(v) => {
                let len = v.len();
                ColumnSlice::Date32(TypedSlice::new(Arc::new(v), 0, len))
            }
        }
    }
}

fn type_mismatch(expected: DataType, value: Datum) -> EngineError {
    EngineError::Type(format!(
        "cannot store {} value in {} column",
        value.data_type(),
        expected
    ))
}
