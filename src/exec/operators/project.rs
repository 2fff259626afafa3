//! Expression projection.

use crate::error::Result;
use crate::exec::batch::{ColumnBuilder, ExecBatch};
use crate::exec::expression::{evaluate, infer_type, Bindings};
use crate::sql::ast::Expr;
use crate::storage::{DataType, SharedDictionary};

use super::{BoxedOperator, Operator};

/// Computes one output column per expression. A pure column reference is a
/// zero-copy passthrough of the input slice; anything else allocates a
/// typed buffer and fills it row by row through the evaluator.
///
/// Output column names are the alias when given, the referenced column
/// name for plain references, and `expr` otherwise.
pub struct Project {
    child: BoxedOperator,
    items: Vec<(Expr, Option<String>)>,
    bindings: Bindings,
    names: Vec<String>,
    types: Vec<DataType>,
}

impl Project {
    /// # Errors
    /// `Plan` or `NameResolution` if an expression's type cannot be
    /// inferred over the child's schema.
    pub fn new(child: BoxedOperator, items: Vec<(Expr, Option<String>)>) -> Result<Self> {
        let bindings = Bindings::new(
            child.output_names().to_vec(),
            child.output_types().to_vec(),
            child.dictionary(),
        );
        let mut names = Vec::with_capacity(items.len());
        let mut types = Vec::with_capacity(items.len());
        for (expr, alias) in &items {
            types.push(infer_type(expr, &bindings)?);
            let name = match alias {
                Some(alias) if !alias.is_empty() => alias.clone(),
                _ => match expr.column_name() {
                    Some(column) => column.to_string(),
                    None => "expr".to_string(),
                },
            };
            names.push(name);
        }
        Ok(Self {
            child,
            items,
            bindings,
            names,
            types,
        })
    }
}

impl Operator for Project {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        let batch = match self.child.next()? {
            Some(batch) => batch,
            None => return Ok(None),
        };
        let mut columns = Vec::with_capacity(self.items.len());
        for ((expr, _), out_type) in self.items.iter().zip(&self.types) {
            if let Some(name) = expr.column_name() {
                // Passthrough shares the input buffer.
                let index = self.bindings.index_of(name).ok_or_else(|| {
                    crate::error::EngineError::NameResolution(format!(
                        "unknown column: {}",
                        name
                    ))
                })?;
                columns.push(batch.columns[index].clone());
                continue;
            }
            let mut builder = ColumnBuilder::with_capacity(*out_type, batch.len);
            for row in 0..batch.len {
                let value = evaluate(expr, &batch, row, &self.bindings)?;
                builder.push(value)?;
            }
            columns.push(builder.finish());
        }
        Ok(Some(ExecBatch::new(columns, batch.len)))
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn output_names(&self) -> &[String] {
        &self.names
    }

    fn output_types(&self) -> &[DataType] {
        &self.types
    }

    fn dictionary(&self) -> Option<SharedDictionary> {
        self.bindings.dictionary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::operators::ColumnarScan;
    use crate::sql::ast::BinOp;
    use crate::storage::{Datum, Dictionary, Table, TableColumn};

    fn scan_orders() -> BoxedOperator {
        let table = Table {
            name: "orders".into(),
            columns: vec![
                TableColumn {
                    name: "orders.id".into(),
                    data: vec![1i64, 2, 3].into(),
                },
                TableColumn {
                    name: "orders.qty".into(),
                    data: vec![10i64, 20, 30].into(),
                },
            ],
            dict: Dictionary::shared(),
        };
        Box::new(ColumnarScan::new(&table, vec![]))
    }

    #[test]
    fn test_project_computes_and_names_columns() {
        let items = vec![
            (Expr::Column("orders.id".into()), None),
            (
                Expr::binary(BinOp::Mul, Expr::Column("orders.qty".into()), Expr::Int(2)),
                Some("double_qty".into()),
            ),
        ];
        let mut op = Project::new(scan_orders(), items).unwrap();
        assert_eq!(op.output_names(), ["orders.id", "double_qty"]);
        assert_eq!(op.output_types(), [DataType::Int64, DataType::Int64]);

        op.open().unwrap();
        let batch = op.next().unwrap().unwrap();
        assert_eq!(batch.len, 3);
        assert_eq!(batch.columns[1].value(0), Datum::Int64(20));
        assert_eq!(batch.columns[1].value(2), Datum::Int64(60));
    }

    #[test]
    fn test_computed_column_without_alias_named_expr() {
        let items = vec![(
            Expr::binary(BinOp::Add, Expr::Column("orders.id".into()), Expr::Int(1)),
            None,
        )];
        let op = Project::new(scan_orders(), items).unwrap();
        assert_eq!(op.output_names(), ["expr"]);
    }

    #[test]
    fn test_arity_preserved() {
        let items = vec![(Expr::Column("orders.qty".into()), None)];
        let mut op = Project::new(scan_orders(), items).unwrap();
        op.open().unwrap();
        let batch = op.next().unwrap().unwrap();
        assert_eq!(batch.len, 3);
        assert_eq!(batch.columns.len(), 1);
    }

    #[test]
    fn test_double_type_inference() {
        let items = vec![(
            Expr::binary(BinOp::Div, Expr::Column("orders.qty".into()), Expr::Float(4.0)),
            Some("ratio".into()),
        )];
        let mut op = Project::new(scan_orders(), items).unwrap();
        assert_eq!(op.output_types(), [DataType::Double]);
        op.open().unwrap();
        let batch = op.next().unwrap().unwrap();
        assert_eq!(batch.columns[0].value(0), Datum::Double(2.5));
    }

    #[test]
    fn test_unknown_column_fails_at_construction() {
        let items = vec![(Expr::Column("orders.nope".into()), None)];
        assert!(Project::new(scan_orders(), items).is_err());
    }
}
