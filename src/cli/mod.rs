//! Non-interactive command-line front end.

pub mod args;

use std::io;

use tracing::info;

use crate::catalog::Catalog;
use crate::exec::driver::execute_sql;
use crate::exec::format::{DelimitedFormatter, Formatter, TableFormatter};
use crate::io::csv::load_csv_path;

use args::{CliArgs, OutputFormat};

/// Load the given CSVs, run one query, print the result. Returns a
/// process exit code; errors print as a single line on stderr.
pub fn run(args: &CliArgs) -> i32 {
    let mut catalog = Catalog::new();
    for path in &args.files {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table")
            .to_string();
        match load_csv_path(path, &name) {
            Ok((table, meta)) => {
                info!(table = name.as_str(), rows = meta.row_count, "registered table");
                catalog.register(table, meta);
            }
            Err(e) => {
                eprintln!("Error loading '{}': {}", path.display(), e);
                return 1;
            }
        }
    }

    let sql = match args.resolve_query() {
        Ok(sql) => sql,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let stdout = io::stdout().lock();
    let mut formatter: Box<dyn Formatter> = match args.format {
        OutputFormat::Table => Box::new(TableFormatter::new(stdout)),
        OutputFormat::Csv => Box::new(DelimitedFormatter::new(stdout, ',')),
    };
    match execute_sql(&catalog, &sql, formatter.as_mut()) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
