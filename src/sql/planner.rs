//! Logical planner: SELECT statement -> logical plan tree.
//!
//! Built bottom-up: pruned base scans (or a left-deep join tree), then
//! Filter, Aggregate, Project, Order, and Limit as the statement requires.

use std::collections::BTreeSet;

use crate::error::{EngineError, Result};

use super::ast::{BinOp, Expr, SelectStmt};
use super::logical_plan::{AggExpr, LogicalPlan, SortKey};

/// Aggregate function names the engine understands.
pub const AGGREGATE_FUNCS: [&str; 3] = ["SUM", "COUNT", "AVG"];

/// Build the logical plan for a parsed statement.
pub fn build_logical_plan(stmt: &SelectStmt) -> Result<LogicalPlan> {
    let columns = collect_all_columns(stmt);
    let mut plan = build_base_relation(stmt, &columns);

    if let Some(pred) = &stmt.where_clause {
        plan = LogicalPlan::Filter {
            predicate: pred.clone(),
            input: Box::new(plan),
        };
    }

    let has_aggregates = stmt
        .select_list
        .iter()
        .any(|item| is_aggregate_call(&item.expr));
    if !stmt.group_by.is_empty() || has_aggregates {
        plan = LogicalPlan::Aggregate {
            group_keys: stmt.group_by.clone(),
            aggregates: extract_aggregates(stmt)?,
            input: Box::new(plan),
        };
    }

    plan = LogicalPlan::Project {
        items: stmt
            .select_list
            .iter()
            .map(|item| (item.expr.clone(), item.alias.clone()))
            .collect(),
        input: Box::new(plan),
    };

    if !stmt.order_by.is_empty() {
        plan = LogicalPlan::Order {
            keys: stmt
                .order_by
                .iter()
                .map(|item| SortKey {
                    expr: item.expr.clone(),
                    asc: item.asc,
                })
                .collect(),
            input: Box::new(plan),
        };
    }

    if let Some(count) = stmt.limit {
        plan = LogicalPlan::Limit {
            count,
            input: Box::new(plan),
        };
    }

    Ok(plan)
}

fn is_aggregate_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { name, .. } if AGGREGATE_FUNCS.contains(&name.as_str()))
}

/// Collect every column name the statement references, sorted for a
/// deterministic scan projection. The `*` pseudo-column of `COUNT(*)` is
/// not a real column and is skipped.
fn collect_all_columns(stmt: &SelectStmt) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for item in &stmt.select_list {
        collect_columns(&item.expr, &mut columns);
    }
    if let Some(pred) = &stmt.where_clause {
        collect_columns(pred, &mut columns);
    }
    for join in &stmt.joins {
        collect_columns(&join.on, &mut columns);
    }
    for key in &stmt.group_by {
        collect_columns(key, &mut columns);
    }
    if let Some(having) = &stmt.having {
        collect_columns(having, &mut columns);
    }
    for item in &stmt.order_by {
        collect_columns(&item.expr, &mut columns);
    }
    columns.into_iter().collect()
}

fn collect_columns(expr: &Expr, columns: &mut BTreeSet<String>) {
    match expr {
        Expr::Column(name) => {
            if name != "*" {
                columns.insert(name.clone());
            }
        }
        Expr::Binary { left, right, .. } => {
            collect_columns(left, columns);
            collect_columns(right, columns);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_columns(arg, columns);
            }
        }
        Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => {}
    }
}

/// A single scan, or a left-deep join tree over all joined tables. Each
/// scan carries the full pruned column list; the physical planner keeps
/// only the names that exist in its table.
fn build_base_relation(stmt: &SelectStmt, columns: &[String]) -> LogicalPlan {
    let mut plan = LogicalPlan::Scan {
        table: stmt.from.name.clone(),
        columns: columns.to_vec(),
    };
    for join in &stmt.joins {
        let right = LogicalPlan::Scan {
            table: join.table.name.clone(),
            columns: columns.to_vec(),
        };
        let (left_keys, right_keys, residual) = split_join_condition(&join.on);
        plan = LogicalPlan::HashJoin {
            left_keys,
            right_keys,
            residual,
            left: Box::new(plan),
            right: Box::new(right),
        };
    }
    plan
}

/// An ON clause of the exact shape `col = col` becomes an equi-join key
/// pair; any other shape is carried as a residual predicate evaluated over
/// the joined row.
fn split_join_condition(on: &Expr) -> (Vec<String>, Vec<String>, Option<Expr>) {
    if let Expr::Binary {
        op: BinOp::Eq,
        left,
        right,
    } = on
    {
        if let (Expr::Column(l), Expr::Column(r)) = (left.as_ref(), right.as_ref()) {
            return (vec![l.clone()], vec![r.clone()], None);
        }
    }
    (Vec::new(), Vec::new(), Some(on.clone()))
}

/// The SUM/COUNT/AVG calls of the select list, positionally.
fn extract_aggregates(stmt: &SelectStmt) -> Result<Vec<AggExpr>> {
    let mut aggregates = Vec::new();
    for item in &stmt.select_list {
        if let Expr::Call { name, args } = &item.expr {
            if !AGGREGATE_FUNCS.contains(&name.as_str()) {
                continue;
            }
            let arg = args.first().ok_or_else(|| {
                EngineError::Plan(format!("aggregate {} requires an argument", name))
            })?;
            aggregates.push(AggExpr {
                func: name.clone(),
                arg: arg.clone(),
                alias: item.alias.clone(),
            });
        }
    }
    Ok(aggregates)
}
