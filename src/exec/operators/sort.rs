//! Full-input sort.

use std::cmp::Ordering;

use crate::error::Result;
use crate::exec::batch::{ColumnBuilder, ExecBatch, BATCH_SIZE};
use crate::exec::expression::{evaluate, Bindings};
use crate::sql::logical_plan::SortKey;
use crate::storage::{DataType, Datum, SharedDictionary};

use super::{BoxedOperator, Operator};

/// Buffers the entire input along with materialised sort-key datums, sorts
/// once on `open`, then re-emits rows in order in batches of up to 4096.
/// The sort is stable: rows with equal keys keep their input order.
/// STRING keys order by dictionary code.
pub struct OrderBy {
    child: BoxedOperator,
    keys: Vec<SortKey>,
    bindings: Bindings,
    /// (sort-key datums, full row datums) per buffered row.
    rows: Vec<(Vec<Datum>, Vec<Datum>)>,
    emit_offset: usize,
}

impl OrderBy {
    pub fn new(child: BoxedOperator, keys: Vec<SortKey>) -> Self {
        let bindings = Bindings::new(
            child.output_names().to_vec(),
            child.output_types().to_vec(),
            child.dictionary(),
        );
        Self {
            child,
            keys,
            bindings,
            rows: Vec::new(),
            emit_offset: 0,
        }
    }
}

/// Typed comparison for one sort-key pair. Key expressions have a fixed
/// type, so both sides always carry the same tag; the INT64/DOUBLE arm
/// covers widened literals.
fn compare_key(a: &Datum, b: &Datum) -> Ordering {
    match (a, b) {
        (Datum::Int64(l), Datum::Int64(r)) => l.cmp(r),
        (Datum::Double(l), Datum::Double(r)) => l.total_cmp(r),
        (Datum::Int64(l), Datum::Double(r)) => (*l as f64).total_cmp(r),
        (Datum::Double(l), Datum::Int64(r)) => l.total_cmp(&(*r as f64)),
        (Datum::Str(l), Datum::Str(r)) => l.cmp(r),
        (Datum::Date32(l), Datum::Date32(r)) => l.cmp(r),
        _ => Ordering::Equal,
    }
}

impl Operator for OrderBy {
    fn open(&mut self) -> Result<()> {
        self.rows.clear();
        self.emit_offset = 0;
        self.child.open()?;
        while let Some(batch) = self.child.next()? {
            for row in 0..batch.len {
                let mut key = Vec::with_capacity(self.keys.len());
                for sort_key in &self.keys {
                    key.push(evaluate(&sort_key.expr, &batch, row, &self.bindings)?);
                }
                self.rows.push((key, batch.row(row)));
            }
        }

        let keys = self.keys.clone();
        self.rows.sort_by(|(ka, _), (kb, _)| {
            for (i, sort_key) in keys.iter().enumerate() {
                let ord = compare_key(&ka[i], &kb[i]);
                let ord = if sort_key.asc { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(())
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        if self.emit_offset >= self.rows.len() {
            return Ok(None);
        }
        let take = BATCH_SIZE.min(self.rows.len() - self.emit_offset);
        let types = self.bindings.types().to_vec();
        let mut builders: Vec<ColumnBuilder> = types
            .iter()
            .map(|t| ColumnBuilder::with_capacity(*t, take))
            .collect();
        for (_, row) in &self.rows[self.emit_offset..self.emit_offset + take] {
            for (builder, value) in builders.iter_mut().zip(row.iter()) {
                builder.push(*value)?;
            }
        }
        self.emit_offset += take;
        let columns = builders.into_iter().map(ColumnBuilder::finish).collect();
        Ok(Some(ExecBatch::new(columns, take)))
    }

    fn close(&mut self) {
        self.child.close();
        self.rows.clear();
        self.emit_offset = 0;
    }

    fn output_names(&self) -> &[String] {
        self.bindings.names()
    }

    fn output_types(&self) -> &[DataType] {
        self.bindings.types()
    }

    fn dictionary(&self) -> Option<SharedDictionary> {
        self.bindings.dictionary()
    }
}
