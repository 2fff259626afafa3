//! Row-at-a-time expression evaluation.
//!
//! Given an expression, a batch, a row index, and a binding environment
//! (input column names, types, and the query dictionary), produce one
//! `Datum`. Arithmetic widens to DOUBLE when either operand is DOUBLE;
//! comparisons yield INT64 0/1; string literals are interned into the
//! dictionary on first evaluation. AND/OR evaluate both operands — no
//! short-circuiting is guaranteed.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::sql::ast::{BinOp, Expr};
use crate::storage::{DataType, Datum, SharedDictionary};

use super::batch::ExecBatch;

/// The environment an expression is evaluated against: the input schema
/// and the dictionary string literals intern into.
#[derive(Debug, Clone)]
pub struct Bindings {
    names: Vec<String>,
    types: Vec<DataType>,
    index: HashMap<String, usize>,
    dict: Option<SharedDictionary>,
}

impl Bindings {
    pub fn new(
        names: Vec<String>,
        types: Vec<DataType>,
        dict: Option<SharedDictionary>,
    ) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // First match wins for duplicate column names.
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            names,
            types,
            index,
            dict,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    pub fn dictionary(&self) -> Option<SharedDictionary> {
        self.dict.clone()
    }

    /// Index of a column by exact name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Evaluate `expr` at `row` of `batch`.
pub fn evaluate(expr: &Expr, batch: &ExecBatch, row: usize, bindings: &Bindings) -> Result<Datum> {
    match expr {
        Expr::Column(name) => {
            let index = bindings
                .index_of(name)
                .ok_or_else(|| EngineError::NameResolution(format!("unknown column: {}", name)))?;
            Ok(batch.columns[index].value(row))
        }
        Expr::Int(v) => Ok(Datum::Int64(*v)),
        Expr::Float(v) => Ok(Datum::Double(*v)),
        Expr::Str(s) => match &bindings.dict {
            Some(dict) => Ok(Datum::Str(dict.write().get_or_add(s))),
            None => Err(EngineError::Type(
                "string literal without a dictionary binding".into(),
            )),
        },
        Expr::Call { name, .. } => Err(EngineError::Plan(format!(
            "function {} cannot be evaluated per row",
            name
        ))),
        Expr::Binary { op, left, right } => {
            // Both sides always evaluate, even for AND/OR.
            let lhs = evaluate(left, batch, row, bindings)?;
            let rhs = evaluate(right, batch, row, bindings)?;
            match op {
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                    numeric_binary(lhs, rhs, *op)
                }
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    compare(lhs, rhs, *op)
                }
                BinOp::And => Ok(bool_datum(lhs.is_truthy() && rhs.is_truthy())),
                BinOp::Or => Ok(bool_datum(lhs.is_truthy() || rhs.is_truthy())),
            }
        }
    }
}

/// Evaluate a predicate: the truthiness of the resulting datum.
pub fn evaluate_predicate(
    expr: &Expr,
    batch: &ExecBatch,
    row: usize,
    bindings: &Bindings,
) -> Result<bool> {
    Ok(evaluate(expr, batch, row, bindings)?.is_truthy())
}

fn bool_datum(value: bool) -> Datum {
    Datum::Int64(if value { 1 } else { 0 })
}

/// Arithmetic: DOUBLE result when either side is DOUBLE, INT64 otherwise.
/// Dates participate through their YYYYMMDD integer value. Integer
/// division by zero is fatal; float division by zero yields +inf.
fn numeric_binary(lhs: Datum, rhs: Datum, op: BinOp) -> Result<Datum> {
    if matches!(lhs, Datum::Double(_)) || matches!(rhs, Datum::Double(_)) {
        let l = lhs.widen_f64()?;
        let r = rhs.widen_f64()?;
        let value = match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            BinOp::Div => {
                if r == 0.0 {
                    f64::INFINITY
                } else {
                    l / r
                }
            }
            _ => unreachable!("non-arithmetic operator in numeric_binary"),
        };
        return Ok(Datum::Double(value));
    }

    let l = integer_operand(lhs)?;
    let r = integer_operand(rhs)?;
    let value = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => {
            if r == 0 {
                return Err(EngineError::Arithmetic("integer division by zero".into()));
            }
            l / r
        }
        _ => unreachable!("non-arithmetic operator in numeric_binary"),
    };
    Ok(Datum::Int64(value))
}

fn integer_operand(value: Datum) -> Result<i64> {
    match value {
        Datum::Int64(v) => Ok(v),
        Datum::Date32(v) => Ok(v as i64),
        other => Err(EngineError::Type(format!(
            "{} is not valid in integer arithmetic",
            other.data_type()
        ))),
    }
}

/// Comparison: each primitive type compares with itself; INT64 and DOUBLE
/// compare cross-type by widening the integer, and DATE32 compares with
/// INT64 through its YYYYMMDD value. STRING supports only EQ/NE (code
/// equality). The result is INT64 0 or 1.
fn compare(lhs: Datum, rhs: Datum, op: BinOp) -> Result<Datum> {
    let result = match (lhs, rhs) {
        (Datum::Int64(l), Datum::Int64(r)) => compare_ordered(l, r, op),
        (Datum::Double(l), Datum::Double(r)) => compare_ordered_f64(l, r, op),
        (Datum::Int64(l), Datum::Double(r)) => compare_ordered_f64(l as f64, r, op),
        (Datum::Double(l), Datum::Int64(r)) => compare_ordered_f64(l, r as f64, op),
        (Datum::Date32(l), Datum::Date32(r)) => compare_ordered(l, r, op),
        // Dates have no literal syntax; integer literals stand in for
        // their YYYYMMDD value.
        (Datum::Date32(l), Datum::Int64(r)) => compare_ordered(l as i64, r, op),
        (Datum::Int64(l), Datum::Date32(r)) => compare_ordered(l, r as i64, op),
        (Datum::Str(l), Datum::Str(r)) => match op {
            BinOp::Eq => l == r,
            BinOp::Ne => l != r,
            _ => {
                return Err(EngineError::Type(
                    "strings support only = and != comparison".into(),
                ))
            }
        },
        (l, r) => {
            return Err(EngineError::Type(format!(
                "cannot compare {} with {}",
                l.data_type(),
                r.data_type()
            )))
        }
    };
    Ok(bool_datum(result))
}

fn compare_ordered<T: PartialOrd>(l: T, r: T, op: BinOp) -> bool {
    match op {
        BinOp::Eq => l == r,
        BinOp::Ne => l != r,
        BinOp::Lt => l < r,
        BinOp::Le => l <= r,
        BinOp::Gt => l > r,
        BinOp::Ge => l >= r,
        _ => false,
    }
}

fn compare_ordered_f64(l: f64, r: f64, op: BinOp) -> bool {
    compare_ordered(l, r, op)
}

/// Static type of an expression over the given input schema. Arithmetic is
/// DOUBLE if either side is DOUBLE, INT64 otherwise; comparisons and
/// AND/OR are INT64. Function calls have no per-row type.
pub fn infer_type(expr: &Expr, bindings: &Bindings) -> Result<DataType> {
    match expr {
        Expr::Column(name) => {
            let index = bindings
                .index_of(name)
                .ok_or_else(|| EngineError::NameResolution(format!("unknown column: {}", name)))?;
            Ok(bindings.types[index])
        }
        Expr::Int(_) => Ok(DataType::Int64),
        Expr::Float(_) => Ok(DataType::Double),
        Expr::Str(_) => Ok(DataType::Str),
        Expr::Call { name, .. } => Err(EngineError::Plan(format!(
            "function {} is not supported in a projection expression",
            name
        ))),
        Expr::Binary { op, left, right } => match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let l = infer_type(left, bindings)?;
                let r = infer_type(right, bindings)?;
                if l == DataType::Double || r == DataType::Double {
                    Ok(DataType::Double)
                } else {
                    Ok(DataType::Int64)
                }
            }
            _ => Ok(DataType::Int64),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::batch::{ColumnBuilder, ExecBatch};
    use crate::sql::ast::Expr;
    use crate::storage::Dictionary;

    fn test_batch() -> (ExecBatch, Bindings) {
        let mut id = ColumnBuilder::new(DataType::Int64);
        let mut price = ColumnBuilder::new(DataType::Double);
        let mut region = ColumnBuilder::new(DataType::Str);
        let dict = Dictionary::shared();
        for (i, p, r) in [(1i64, 1.5f64, "north"), (2, 2.5, "south"), (3, 0.0, "north")] {
            id.push(Datum::Int64(i)).unwrap();
            price.push(Datum::Double(p)).unwrap();
            region.push(Datum::Str(dict.write().get_or_add(r))).unwrap();
        }
        let batch = ExecBatch::new(vec![id.finish(), price.finish(), region.finish()], 3);
        let bindings = Bindings::new(
            vec!["t.id".into(), "t.price".into(), "t.region".into()],
            vec![DataType::Int64, DataType::Double, DataType::Str],
            Some(dict),
        );
        (batch, bindings)
    }

    fn eval(expr: &Expr, row: usize) -> Result<Datum> {
        let (batch, bindings) = test_batch();
        evaluate(expr, &batch, row, &bindings)
    }

    #[test]
    fn test_column_ref() {
        assert_eq!(
            eval(&Expr::Column("t.id".into()), 1).unwrap(),
            Datum::Int64(2)
        );
    }

    #[test]
    fn test_unknown_column() {
        let err = eval(&Expr::Column("t.missing".into()), 0).unwrap_err();
        assert!(matches!(err, EngineError::NameResolution(_)));
    }

    #[test]
    fn test_integer_arithmetic() {
        let expr = Expr::binary(BinOp::Mul, Expr::Column("t.id".into()), Expr::Int(10));
        assert_eq!(eval(&expr, 2).unwrap(), Datum::Int64(30));
    }

    #[test]
    fn test_mixed_arithmetic_widens_to_double() {
        let expr = Expr::binary(
            BinOp::Add,
            Expr::Column("t.id".into()),
            Expr::Column("t.price".into()),
        );
        assert_eq!(eval(&expr, 0).unwrap(), Datum::Double(2.5));
    }

    #[test]
    fn test_integer_division_by_zero_is_fatal() {
        let expr = Expr::binary(BinOp::Div, Expr::Int(1), Expr::Int(0));
        let err = eval(&expr, 0).unwrap_err();
        assert!(matches!(err, EngineError::Arithmetic(_)));
    }

    #[test]
    fn test_float_division_by_zero_is_infinity() {
        let expr = Expr::binary(BinOp::Div, Expr::Float(1.0), Expr::Int(0));
        assert_eq!(eval(&expr, 0).unwrap(), Datum::Double(f64::INFINITY));
    }

    #[test]
    fn test_comparison_widens_int_to_double() {
        let expr = Expr::binary(BinOp::Lt, Expr::Column("t.id".into()), Expr::Float(1.5));
        assert_eq!(eval(&expr, 0).unwrap(), Datum::Int64(1)); // 1 < 1.5
        assert_eq!(eval(&expr, 1).unwrap(), Datum::Int64(0)); // 2 < 1.5
    }

    #[test]
    fn test_string_literal_interns_and_compares_by_code() {
        let expr = Expr::binary(
            BinOp::Eq,
            Expr::Column("t.region".into()),
            Expr::Str("north".into()),
        );
        assert_eq!(eval(&expr, 0).unwrap(), Datum::Int64(1));
        assert_eq!(eval(&expr, 1).unwrap(), Datum::Int64(0));
    }

    #[test]
    fn test_string_literal_interning_is_idempotent() {
        let (batch, bindings) = test_batch();
        let dict = bindings.dictionary().unwrap();
        let before = dict.read().len();
        let expr = Expr::binary(
            BinOp::Eq,
            Expr::Column("t.region".into()),
            Expr::Str("south".into()),
        );
        evaluate(&expr, &batch, 0, &bindings).unwrap();
        evaluate(&expr, &batch, 1, &bindings).unwrap();
        // "south" was already in the table's dictionary.
        assert_eq!(dict.read().len(), before);

        let expr = Expr::Str("unseen".into());
        evaluate(&expr, &batch, 0, &bindings).unwrap();
        evaluate(&expr, &batch, 0, &bindings).unwrap();
        assert_eq!(dict.read().len(), before + 1);
    }

    #[test]
    fn test_date_compares_with_integer_literal() {
        let mut day = ColumnBuilder::new(DataType::Date32);
        day.push(Datum::Date32(20240102)).unwrap();
        let batch = ExecBatch::new(vec![day.finish()], 1);
        let bindings = Bindings::new(vec!["t.day".into()], vec![DataType::Date32], None);
        let expr = Expr::binary(
            BinOp::Gt,
            Expr::Column("t.day".into()),
            Expr::Int(20240101),
        );
        assert_eq!(
            evaluate(&expr, &batch, 0, &bindings).unwrap(),
            Datum::Int64(1)
        );
    }

    #[test]
    fn test_string_ordering_comparison_is_type_error() {
        let expr = Expr::binary(
            BinOp::Lt,
            Expr::Column("t.region".into()),
            Expr::Str("z".into()),
        );
        assert!(matches!(eval(&expr, 0), Err(EngineError::Type(_))));
    }

    #[test]
    fn test_and_or_truthiness() {
        // price of row 2 is 0.0 (falsy); id is 3 (truthy).
        let and = Expr::binary(
            BinOp::And,
            Expr::Column("t.id".into()),
            Expr::Column("t.price".into()),
        );
        assert_eq!(eval(&and, 2).unwrap(), Datum::Int64(0));

        let or = Expr::binary(
            BinOp::Or,
            Expr::Column("t.id".into()),
            Expr::Column("t.price".into()),
        );
        assert_eq!(eval(&or, 2).unwrap(), Datum::Int64(1));
    }

    #[test]
    fn test_no_short_circuit() {
        // Left side is already false, but the right side still evaluates
        // and its division by zero is fatal.
        let expr = Expr::binary(
            BinOp::And,
            Expr::Int(0),
            Expr::binary(BinOp::Div, Expr::Int(1), Expr::Int(0)),
        );
        assert!(matches!(eval(&expr, 0), Err(EngineError::Arithmetic(_))));
    }

    #[test]
    fn test_predicate_wrapper() {
        let (batch, bindings) = test_batch();
        let expr = Expr::binary(BinOp::Gt, Expr::Column("t.id".into()), Expr::Int(1));
        assert!(!evaluate_predicate(&expr, &batch, 0, &bindings).unwrap());
        assert!(evaluate_predicate(&expr, &batch, 1, &bindings).unwrap());
    }

    #[test]
    fn test_infer_type() {
        let (_, bindings) = test_batch();
        assert_eq!(
            infer_type(&Expr::Column("t.price".into()), &bindings).unwrap(),
            DataType::Double
        );
        let arith = Expr::binary(
            BinOp::Mul,
            Expr::Column("t.id".into()),
            Expr::Column("t.price".into()),
        );
        assert_eq!(infer_type(&arith, &bindings).unwrap(), DataType::Double);
        let cmp = Expr::binary(
            BinOp::Gt,
            Expr::Column("t.price".into()),
            Expr::Float(1.0),
        );
        assert_eq!(infer_type(&cmp, &bindings).unwrap(), DataType::Int64);
    }

    #[test]
    fn test_infer_type_rejects_calls() {
        let (_, bindings) = test_batch();
        let call = Expr::Call {
            name: "SUM".into(),
            args: vec![Expr::Column("t.id".into())],
        };
        assert!(matches!(
            infer_type(&call, &bindings),
            Err(EngineError::Plan(_))
        ));
    }
}
