//! Row selection by predicate.

use crate::error::Result;
use crate::exec::batch::{ColumnBuilder, ExecBatch};
use crate::exec::expression::{evaluate_predicate, Bindings};
use crate::sql::ast::Expr;
use crate::storage::{DataType, SharedDictionary};

use super::{BoxedOperator, Operator};

/// Filters a child's batches by a predicate, gathering passing rows into
/// freshly allocated buffers. Schema and dictionary pass through
/// unchanged. Input batches with no passing rows are skipped entirely, so
/// `next` never yields an empty batch.
pub struct Selection {
    child: BoxedOperator,
    predicate: Expr,
    bindings: Bindings,
}

impl Selection {
    pub fn new(child: BoxedOperator, predicate: Expr) -> Self {
        let bindings = Bindings::new(
            child.output_names().to_vec(),
            child.output_types().to_vec(),
            child.dictionary(),
        );
        Self {
            child,
            predicate,
            bindings,
        }
    }
}

impl Operator for Selection {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        while let Some(batch) = self.child.next()? {
            let mut selected = Vec::new();
            for row in 0..batch.len {
                if evaluate_predicate(&self.predicate, &batch, row, &self.bindings)? {
                    selected.push(row);
                }
            }
            if selected.is_empty() {
                continue;
            }
            let mut columns = Vec::with_capacity(batch.columns.len());
            for column in &batch.columns {
                let mut builder =
                    ColumnBuilder::with_capacity(column.data_type(), selected.len());
                for &row in &selected {
                    builder.push_from(column, row)?;
                }
                columns.push(builder.finish());
            }
            return Ok(Some(ExecBatch::new(columns, selected.len())));
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.child.close();
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
