//! Hash aggregation.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::exec::batch::{ColumnBuilder, ExecBatch, BATCH_SIZE};
use crate::exec::expression::{evaluate, infer_type, Bindings};
use crate::sql::ast::Expr;
use crate::storage::{DataType, Datum, DatumKey, SharedDictionary};

use super::{BoxedOperator, Operator};

/// One aggregate computation: an upper-case function name out of SUM,
/// COUNT, AVG, its argument expression, and an optional output alias.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    pub func: String,
    pub arg: Expr,
    pub alias: Option<String>,
}

/// Running state per (group, aggregate) pair.
#[derive(Debug, Clone, Copy, Default)]
struct AggState {
    sum: f64,
    count: i64,
}

/// Groups the child's rows by the grouping expressions and folds each
/// aggregate's state per group. The child is drained on `open`; groups
/// emit in first-seen order. With no grouping expressions there is a
/// single implicit group, and exactly one row is emitted even on empty
/// input.
pub struct HashAggregate {
    child: BoxedOperator,
    group_exprs: Vec<Expr>,
    specs: Vec<AggregateSpec>,
    bindings: Bindings,
    names: Vec<String>,
    types: Vec<DataType>,
    groups: HashMap<DatumKey, usize>,
    /// Group keys and states, indexed by first-seen order.
    group_keys: Vec<Vec<Datum>>,
    states: Vec<Vec<AggState>>,
    emit_offset: usize,
}

impl HashAggregate {
    /// # Errors
    /// `Plan` for an unknown aggregate function or an uninferrable
    /// grouping expression.
    pub fn new(
        child: BoxedOperator,
        group_exprs: Vec<Expr>,
        specs: Vec<AggregateSpec>,
    ) -> Result<Self> {
        let bindings = Bindings::new(
            child.output_names().to_vec(),
            child.output_types().to_vec(),
            child.dictionary(),
        );

        let mut names = Vec::with_capacity(group_exprs.len() + specs.len());
        let mut types = Vec::with_capacity(group_exprs.len() + specs.len());
        for expr in &group_exprs {
            names.push(match expr.column_name() {
                Some(column) => column.to_string(),
                None => "expr".to_string(),
            });
            types.push(infer_type(expr, &bindings)?);
        }
        for spec in &specs {
            names.push(match &spec.alias {
                Some(alias) if !alias.is_empty() => alias.clone(),
                _ => format!("{}({})", spec.func, spec.arg),
            });
            types.push(output_type(spec, &bindings)?);
        }

        Ok(Self {
            child,
            group_exprs,
            specs,
            bindings,
            names,
            types,
            groups: HashMap::new(),
            group_keys: Vec::new(),
            states: Vec::new(),
            emit_offset: 0,
        })
    }
}

/// COUNT yields INT64 and AVG yields DOUBLE; SUM keeps its argument's
/// numeric type (INT64 for integer and date inputs).
fn output_type(spec: &AggregateSpec, bindings: &Bindings) -> Result<DataType> {
    match spec.func.as_str() {
        "COUNT" => Ok(DataType::Int64),
        "AVG" => Ok(DataType::Double),
        "SUM" => match infer_type(&spec.arg, bindings)? {
            DataType::Double => Ok(DataType::Double),
            _ => Ok(DataType::Int64),
        },
        other => Err(EngineError::Plan(format!(
            "unknown aggregate function: {}",
            other
        ))),
    }
}

impl Operator for HashAggregate {
    fn open(&mut self) -> Result<()> {
        self.groups.clear();
        self.group_keys.clear();
        self.states.clear();
        self.emit_offset = 0;

        self.child.open()?;
        while let Some(batch) = self.child.next()? {
            for row in 0..batch.len {
                let mut key = Vec::with_capacity(self.group_exprs.len());
                for expr in &self.group_exprs {
                    key.push(evaluate(expr, &batch, row, &self.bindings)?);
                }
                let key = DatumKey(key);
                let index = match self.groups.get(&key) {
                    Some(&index) => index,
                    None => {
                        let index = self.group_keys.len();
                        self.group_keys.push(key.0.clone());
                        self.states.push(vec![AggState::default(); self.specs.len()]);
                        self.groups.insert(key, index);
                        index
                    }
                };
                for (i, spec) in self.specs.iter().enumerate() {
                    let state = &mut self.states[index][i];
                    match spec.func.as_str() {
                        // Every value counts; this engine has no NULLs.
                        "COUNT" => state.count += 1,
                        _ => {
                            let value =
                                evaluate(&spec.arg, &batch, row, &self.bindings)?.widen_f64()?;
                            state.sum += value;
                            state.count += 1;
                        }
                    }
                }
            }
        }

        // A global aggregate emits one row even over empty input.
        if self.group_exprs.is_empty() && self.group_keys.is_empty() {
            self.group_keys.push(Vec::new());
            self.states.push(vec![AggState::default(); self.specs.len()]);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<ExecBatch>> {
        if self.emit_offset >= self.group_keys.len() {
            return Ok(None);
        }
        let take = BATCH_SIZE.min(self.group_keys.len() - self.emit_offset);
        let mut builders: Vec<ColumnBuilder> = self
            .types
            .iter()
            .map(|t| ColumnBuilder::with_capacity(*t, take))
            .collect();

        for group in self.emit_offset..self.emit_offset + take {
            for (builder, value) in builders.iter_mut().zip(self.group_keys[group].iter()) {
                builder.push(*value)?;
            }
            for (i, spec) in self.specs.iter().enumerate() {
                let state = self.states[group][i];
                let column = self.group_exprs.len() + i;
                let value = match spec.func.as_str() {
                    "COUNT" => Datum::Int64(state.count),
                    "SUM" => match self.types[column] {
                        DataType::Double => Datum::Double(state.sum),
                        _ => Datum::Int64(state.sum as i64),
                    },
                    _ => {
                        // AVG; empty-input global group averages to 0.
                        if state.count == 0 {
                            Datum::Double(0.0)
                        } else {
                            Datum::Double(state.sum / state.count as f64)
                        }
                    }
                };
                builders[column].push(value)?;
            }
        }

        self.emit_offset += take;
        let columns = builders.into_iter().map(ColumnBuilder::finish).collect();
        Ok(Some(ExecBatch::new(columns, take)))
    }

    fn close(&mut self) {
        self.child.close();
        self.groups.clear();
        self.group_keys.clear();
        self.states.clear();
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
