//! End-to-end tests from CSV files on disk through the full pipeline.
//!
//! Each test writes CSV data into a temp directory, loads it through the
//! inference-driven loader, and runs SQL against the resulting catalog.

use std::path::Path;

use tempfile::TempDir;

use csvql::catalog::Catalog;
use csvql::exec::driver::execute_sql;
use csvql::exec::format::DelimitedFormatter;
use csvql::io::csv::load_csv_path;
use csvql::storage::DataType;

/// Write a CSV file into a directory.
fn write_csv(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("write csv");
}

/// Load every CSV in the directory, table-named by file stem.
fn load_catalog(dir: &Path, names: &[&str]) -> Catalog {
    let mut catalog = Catalog::new();
    for name in names {
        let path = dir.join(format!("{}.csv", name));
        let (table, meta) = load_csv_path(&path, name).expect("load csv");
        catalog.register(table, meta);
    }
    catalog
}

/// Run a query and return its CSV-formatted output.
fn run(catalog: &Catalog, sql: &str) -> String {
    let mut buf = Vec::new();
    {
        let mut fmt = DelimitedFormatter::new(&mut buf, ',');
        execute_sql(catalog, sql, &mut fmt)
            .unwrap_or_else(|e| panic!("query '{}' failed: {}", sql, e));
    }
    String::from_utf8(buf).expect("utf8 output")
}

#[test]
fn test_csv_filter_projection() {
    let tmp = TempDir::new().unwrap();
    write_csv(tmp.path(), "orders.csv", "id,qty\n1,10\n2,20\n3,30\n");
    let catalog = load_catalog(tmp.path(), &["orders"]);

    let out = run(
        &catalog,
        "SELECT orders.id FROM orders WHERE orders.qty > 15",
    );
    assert_eq!(out, "orders.id\n2\n3\n");
}

#[test]
fn test_csv_join_with_strings() {
    let tmp = TempDir::new().unwrap();
    write_csv(tmp.path(), "orders.csv", "id,qty\n1,10\n2,20\n3,30\n");
    write_csv(
        tmp.path(),
        "detail.csv",
        "id,region\n1,north\n2,south\n4,west\n",
    );
    let catalog = load_catalog(tmp.path(), &["orders", "detail"]);

    let out = run(
        &catalog,
        "SELECT orders.id, detail.region FROM orders \
         INNER JOIN detail ON orders.id = detail.id",
    );
    assert_eq!(out, "orders.id,detail.region\n1,north\n2,south\n");
}

#[test]
fn test_csv_group_by_on_joined_tables() {
    let tmp = TempDir::new().unwrap();
    write_csv(tmp.path(), "orders.csv", "id,qty\n1,10\n2,20\n3,30\n");
    write_csv(
        tmp.path(),
        "detail.csv",
        "id,region\n1,north\n2,south\n4,west\n",
    );
    let catalog = load_catalog(tmp.path(), &["orders", "detail"]);

    let out = run(
        &catalog,
        "SELECT detail.region, SUM(orders.qty) AS total FROM orders \
         INNER JOIN detail ON orders.id = detail.id GROUP BY detail.region",
    );
    let mut lines: Vec<&str> = out.lines().skip(1).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec!["north,10", "south,20"]);
}

#[test]
fn test_csv_type_inference_shapes_queries() {
    let tmp = TempDir::new().unwrap();
    write_csv(
        tmp.path(),
        "trades.csv",
        "day,price,note\n20240101,1.5,alpha\n20240102,2.5,beta\n20240103,4.0,alpha\n",
    );
    let catalog = load_catalog(tmp.path(), &["trades"]);

    let meta = catalog.meta("trades").unwrap();
    assert_eq!(meta.columns[0].data_type, DataType::Date32);
    assert_eq!(meta.columns[1].data_type, DataType::Double);
    assert_eq!(meta.columns[2].data_type, DataType::Str);

    // Date columns compare as YYYYMMDD integers.
    let out = run(
        &catalog,
        "SELECT trades.price FROM trades WHERE trades.day > 20240101",
    );
    assert_eq!(out, "trades.price\n2.5\n4\n");

    // Strings group through the dictionary.
    let out = run(
        &catalog,
        "SELECT trades.note, COUNT(*) AS n FROM trades GROUP BY trades.note",
    );
    assert_eq!(out, "trades.note,n\nalpha,2\nbeta,1\n");
}

#[test]
fn test_csv_order_and_limit() {
    let tmp = TempDir::new().unwrap();
    write_csv(tmp.path(), "orders.csv", "id,qty\n1,10\n2,20\n3,30\n");
    let catalog = load_catalog(tmp.path(), &["orders"]);

    let out = run(
        &catalog,
        "SELECT orders.id, orders.qty FROM orders ORDER BY orders.qty DESC LIMIT 1",
    );
    assert_eq!(out, "orders.id,orders.qty\n3,30\n");
}

#[test]
fn test_csv_large_input_batches() {
    // More rows than one batch, so the scan emits multiple windows.
    let tmp = TempDir::new().unwrap();
    let mut content = String::from("id,qty\n");
    for i in 0..10_000 {
        content.push_str(&format!("{},{}\n", i, i % 100));
    }
    write_csv(tmp.path(), "big.csv", &content);
    let catalog = load_catalog(tmp.path(), &["big"]);

    let out = run(&catalog, "SELECT COUNT(*) FROM big");
    assert_eq!(out, "COUNT(*)\n10000\n");

    let out = run(&catalog, "SELECT COUNT(*) FROM big WHERE big.qty = 7");
    assert_eq!(out, "COUNT(*)\n100\n");
}

#[test]
fn test_csv_error_is_single_line() {
    let tmp = TempDir::new().unwrap();
    write_csv(tmp.path(), "orders.csv", "id,qty\n1,10\n");
    let catalog = load_catalog(tmp.path(), &["orders"]);

    let mut buf = Vec::new();
    let mut fmt = DelimitedFormatter::new(&mut buf, ',');
    let err = execute_sql(&catalog, "SELECT orders.id FROM nowhere", &mut fmt).unwrap_err();
    assert_eq!(
        err.to_string(),
        "name resolution error: table not found: nowhere"
    );
}
