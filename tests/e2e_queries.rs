//! End-to-end query tests over in-memory tables.
//!
//! Each test builds the fixture catalog, executes SQL through the full
//! pipeline (parse -> logical plan -> physical plan -> execute), and
//! checks the decoded rows.

use csvql::catalog::Catalog;
use csvql::error::Result;
use csvql::exec::driver::execute_sql;
use csvql::exec::format::Formatter;
use csvql::storage::{DataType, Dictionary, Table, TableColumn, TableMeta};

// ============================================================
// Test helpers
// ============================================================

/// Collects decoded rows instead of printing them.
#[derive(Default)]
struct CollectingFormatter {
    names: Vec<String>,
    rows: Vec<Vec<String>>,
    ended_with: Option<usize>,
}

impl Formatter for CollectingFormatter {
    fn begin(&mut self, names: &[String], _types: &[DataType]) -> Result<()> {
        self.names = names.to_vec();
        Ok(())
    }

    fn write_row(&mut self, cells: Vec<String>) -> Result<()> {
        self.rows.push(cells);
        Ok(())
    }

    fn end(&mut self, row_count: usize) -> Result<()> {
        self.ended_with = Some(row_count);
        Ok(())
    }
}

/// orders(id INT64, qty INT64) = {(1,10),(2,20),(3,30)}
fn orders() -> (Table, TableMeta) {
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
    let meta = TableMeta {
        name: "orders".into(),
        columns: vec![],
        row_count: 3,
    };
    (table, meta)
}

/// detail(id INT64, region STRING) = {(1,"north"),(2,"south"),(4,"west")}
fn detail() -> (Table, TableMeta) {
    let dict = Dictionary::shared();
    let codes: Vec<u32> = ["north", "south", "west"]
        .iter()
        .map(|s| dict.write().get_or_add(s))
        .collect();
    let table = Table {
        name: "detail".into(),
        columns: vec![
            TableColumn {
                name: "detail.id".into(),
                data: vec![1i64, 2, 4].into(),
            },
            TableColumn {
                name: "detail.region".into(),
                data: codes.into(),
            },
        ],
        dict,
    };
    let meta = TableMeta {
        name: "detail".into(),
        columns: vec![],
        row_count: 3,
    };
    (table, meta)
}

fn fixture_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    let (table, meta) = orders();
    catalog.register(table, meta);
    let (table, meta) = detail();
    catalog.register(table, meta);
    catalog
}

fn run(sql: &str) -> CollectingFormatter {
    let catalog = fixture_catalog();
    let mut fmt = CollectingFormatter::default();
    execute_sql(&catalog, sql, &mut fmt)
        .unwrap_or_else(|e| panic!("query '{}' failed: {}", sql, e));
    fmt
}

fn rows_of(sql: &str) -> Vec<Vec<String>> {
    run(sql).rows
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Spec scenarios
// ============================================================

#[test]
fn test_filter_scan() {
    assert_eq!(
        rows_of("SELECT orders.id FROM orders WHERE orders.qty > 15"),
        vec![row(&["2"]), row(&["3"])]
    );
}

#[test]
fn test_projection_with_arithmetic() {
    assert_eq!(
        rows_of("SELECT orders.id, orders.qty * 2 AS double_qty FROM orders"),
        vec![row(&["1", "20"]), row(&["2", "40"]), row(&["3", "60"])]
    );
}

#[test]
fn test_limit() {
    assert_eq!(
        rows_of("SELECT orders.id FROM orders LIMIT 2"),
        vec![row(&["1"]), row(&["2"])]
    );
}

#[test]
fn test_inner_join() {
    assert_eq!(
        rows_of(
            "SELECT orders.id, detail.region FROM orders \
             INNER JOIN detail ON orders.id = detail.id"
        ),
        vec![row(&["1", "north"]), row(&["2", "south"])]
    );
}

#[test]
fn test_join_group_by_sum() {
    let mut rows = rows_of(
        "SELECT detail.region, SUM(orders.qty) AS total FROM orders \
         INNER JOIN detail ON orders.id = detail.id GROUP BY detail.region",
    );
    rows.sort();
    assert_eq!(rows, vec![row(&["north", "10"]), row(&["south", "20"])]);
}

#[test]
fn test_count_star() {
    assert_eq!(rows_of("SELECT COUNT(*) FROM orders"), vec![row(&["3"])]);
}

#[test]
fn test_order_by_desc_limit() {
    assert_eq!(
        rows_of(
            "SELECT orders.id, orders.qty FROM orders ORDER BY orders.qty DESC LIMIT 1"
        ),
        vec![row(&["3", "30"])]
    );
}

// ============================================================
// Additional end-to-end coverage
// ============================================================

#[test]
fn test_select_star_passthrough() {
    let fmt = run("SELECT * FROM orders");
    assert_eq!(fmt.names, vec!["orders.id", "orders.qty"]);
    assert_eq!(fmt.rows.len(), 3);
    assert_eq!(fmt.ended_with, Some(3));
}

#[test]
fn test_string_predicate_extends_dictionary_idempotently() {
    assert_eq!(
        rows_of("SELECT detail.id FROM detail WHERE detail.region = 'south'"),
        vec![row(&["2"])]
    );
    // A literal never seen in the data selects nothing but still runs.
    assert_eq!(
        rows_of("SELECT detail.id FROM detail WHERE detail.region = 'elsewhere'"),
        Vec::<Vec<String>>::new()
    );
}

#[test]
fn test_compound_predicate_and_or() {
    assert_eq!(
        rows_of(
            "SELECT orders.id FROM orders WHERE orders.qty > 15 AND orders.id < 3 \
             OR orders.id = 1"
        ),
        vec![row(&["1"]), row(&["2"])]
    );
}

#[test]
fn test_global_avg() {
    assert_eq!(
        rows_of("SELECT AVG(orders.qty) FROM orders"),
        vec![row(&["20"])]
    );
}

#[test]
fn test_aggregate_header_names() {
    let fmt = run("SELECT COUNT(*), SUM(orders.qty) AS total FROM orders");
    assert_eq!(fmt.names, vec!["COUNT(*)", "total"]);
    assert_eq!(fmt.rows, vec![row(&["3", "90"])]);
}

#[test]
fn test_order_by_stability() {
    // qty DESC then the tie on a constant expression keeps row order.
    assert_eq!(
        rows_of("SELECT orders.id FROM orders ORDER BY orders.qty / 100"),
        vec![row(&["1"]), row(&["2"]), row(&["3"])]
    );
}

#[test]
fn test_limit_exceeding_input() {
    assert_eq!(rows_of("SELECT orders.id FROM orders LIMIT 99").len(), 3);
}

#[test]
fn test_division_by_zero_aborts_query() {
    let catalog = fixture_catalog();
    let mut fmt = CollectingFormatter::default();
    let err = execute_sql(
        &catalog,
        "SELECT orders.qty / 0 FROM orders",
        &mut fmt,
    )
    .unwrap_err();
    assert!(err.to_string().contains("arithmetic"));
}

#[test]
fn test_unknown_column_aborts_query() {
    let catalog = fixture_catalog();
    let mut fmt = CollectingFormatter::default();
    assert!(execute_sql(&catalog, "SELECT orders.oops FROM orders", &mut fmt).is_err());
}

#[test]
fn test_join_then_order() {
    assert_eq!(
        rows_of(
            "SELECT orders.qty, detail.region FROM orders \
             INNER JOIN detail ON orders.id = detail.id \
             ORDER BY orders.qty DESC"
        ),
        vec![row(&["20", "south"]), row(&["10", "north"])]
    );
}
