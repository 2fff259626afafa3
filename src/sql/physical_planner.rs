//! Physical planner: logical plan -> executable operator tree.
//!
//! Each logical node maps one-to-one onto a physical operator, recursing
//! through children. Expressions are cloned as they move into operators.
//! Two elisions: an empty projection (from `SELECT *`) and a projection
//! directly over an aggregate, which already produces the final columns.

use crate::catalog::Catalog;
use crate::error::{EngineError, Result};
use crate::exec::operators::{
    AggregateSpec, BoxedOperator, ColumnarScan, HashAggregate, HashJoin, Limit, OrderBy, Project,
    Selection,
};

use super::logical_plan::LogicalPlan;

/// Lower a logical plan over the catalog's tables.
pub fn build_physical_plan(logical: &LogicalPlan, catalog: &Catalog) -> Result<BoxedOperator> {
    match logical {
        LogicalPlan::Scan { table, columns } => {
            let table = catalog
                .table(table)
                .ok_or_else(|| EngineError::NameResolution(format!("table not found: {}", table)))?;
            // Keep the pruned names that exist in this table; a join's
            // shared pruning list also carries the other side's columns.
            let indices: Vec<usize> = columns
                .iter()
                .filter_map(|name| table.column_index(name))
                .collect();
            Ok(Box::new(ColumnarScan::new(table, indices)))
        }

        LogicalPlan::Filter { predicate, input } => {
            let child = build_physical_plan(input, catalog)?;
            Ok(Box::new(Selection::new(child, predicate.clone())))
        }

        LogicalPlan::Project { items, input } => {
            let child = build_physical_plan(input, catalog)?;
            if items.is_empty() || matches!(input.as_ref(), LogicalPlan::Aggregate { .. }) {
                return Ok(child);
            }
            Ok(Box::new(Project::new(child, items.clone())?))
        }

        LogicalPlan::HashJoin {
            left_keys,
            right_keys,
            residual,
            left,
            right,
        } => {
            let left = build_physical_plan(left, catalog)?;
            let right = build_physical_plan(right, catalog)?;
            Ok(Box::new(HashJoin::new(
                left,
                right,
                left_keys.clone(),
                right_keys.clone(),
                residual.clone(),
            )?))
        }

        LogicalPlan::Aggregate {
            group_keys,
            aggregates,
            input,
        } => {
            let child = build_physical_plan(input, catalog)?;
            let specs = aggregates
                .iter()
                .map(|agg| AggregateSpec {
                    func: agg.func.to_uppercase(),
                    arg: agg.arg.clone(),
                    alias: agg.alias.clone(),
                })
                .collect();
            Ok(Box::new(HashAggregate::new(
                child,
                group_keys.clone(),
                specs,
            )?))
        }

        LogicalPlan::Order { keys, input } => {
            let child = build_physical_plan(input, catalog)?;
            Ok(Box::new(OrderBy::new(child, keys.clone())))
        }

        LogicalPlan::Limit { count, input } => {
            let child = build_physical_plan(input, catalog)?;
            Ok(Box::new(Limit::new(child, *count)))
        }
    }
}
