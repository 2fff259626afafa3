//! CSV loader with type inference.
//!
//! Reads a delimited file into a dictionary-encoded columnar [`Table`] plus
//! its [`TableMeta`]. The delimiter is detected from the header line by
//! frequency (comma, tab, or pipe). Each column's type is inferred from its
//! raw cells in priority order: DATE32, then INT64, then DOUBLE, with
//! STRING as the fallback.
//!
//! Column names are qualified as `table.column` at load time so that the
//! SQL surface's qualified references resolve by exact match.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::storage::{
    ColumnBuffer, ColumnMeta, ColumnStats, DataType, Datum, Dictionary, Table, TableColumn,
    TableMeta,
};

/// Candidate delimiters, in priority order.
const CANDIDATES: &[u8] = b",\t|";

/// Detect the most frequent candidate delimiter in the header line,
/// defaulting to comma.
fn detect_delimiter(line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0usize;
    for &delim in CANDIDATES {
        let count = line.bytes().filter(|&b| b == delim).count();
        if count > best_count {
            best_count = count;
            best = delim;
        }
    }
    best
}

/// All cells are 8-digit integers inside the plausible YYYYMMDD window.
fn is_date_cell(cell: &str) -> bool {
    if cell.len() != 8 || !cell.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(cell.parse::<i32>(), Ok(v) if (19_000_000..=21_000_000).contains(&v))
}

/// The cell parses as a float that is integer-valued and fits in i64.
fn is_int_cell(cell: &str) -> bool {
    match cell.trim().parse::<f64>() {
        Ok(v) => v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64,
        Err(_) => false,
    }
}

fn is_float_cell(cell: &str) -> bool {
    cell.trim().parse::<f64>().is_ok()
}

fn parse_int_cell(cell: &str) -> i64 {
    let cell = cell.trim();
    cell.parse::<i64>()
        .unwrap_or_else(|_| cell.parse::<f64>().map(|v| v as i64).unwrap_or(0))
}

/// Load a CSV file into a table registered under `table_name`.
///
/// # Errors
/// Returns an I/O error if the file cannot be opened, is empty, or contains
/// a row whose cell count differs from the header.
pub fn load_csv_path<P: AsRef<Path>>(path: P, table_name: &str) -> Result<(Table, TableMeta)> {
    let file = File::open(path.as_ref())?;
    load_csv_reader(file, table_name)
}

/// Load CSV data from any reader (file, stdin, in-memory buffer).
///
/// # Errors
/// Same failure modes as [`load_csv_path`].
pub fn load_csv_reader<R: Read>(reader: R, table_name: &str) -> Result<(Table, TableMeta)> {
    let mut lines = BufReader::new(reader).lines();

    let header_line = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "CSV source is empty, no header line",
            )
            .into())
        }
    };
    let header_line = header_line.trim_end_matches(['\n', '\r']);
    if header_line.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "CSV header line is empty").into());
    }

    let delimiter = detect_delimiter(header_line) as char;
    let headers: Vec<String> = header_line
        .split(delimiter)
        .enumerate()
        .map(|(i, name)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                format!("{}._col_{}", table_name, i)
            } else {
                format!("{}.{}", table_name, trimmed)
            }
        })
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }
        let cells: Vec<String> = line.split(delimiter).map(|c| c.to_string()).collect();
        if cells.len() != headers.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "row {} has {} cells, expected {}",
                    line_no + 2,
                    cells.len(),
                    headers.len()
                ),
            )
            .into());
        }
        rows.push(cells);
    }

    let dict = Dictionary::shared();
    let mut columns = Vec::with_capacity(headers.len());
    let mut metas = Vec::with_capacity(headers.len());

    for (col, name) in headers.iter().enumerate() {
        let cells: Vec<&str> = rows.iter().map(|r| r[col].as_str()).collect();
        let (buffer, data_type) = infer_column(&cells, &dict);
        let stats = column_stats(&cells, &buffer);
        columns.push(TableColumn {
            name: name.clone(),
            data: buffer,
        });
        metas.push(ColumnMeta {
            name: name.clone(),
            data_type,
            stats,
        });
    }

    debug!(
        table = table_name,
        rows = rows.len(),
        columns = columns.len(),
        "loaded csv table"
    );

    let table = Table {
        name: table_name.to_string(),
        columns,
        dict,
    };
    let meta = TableMeta {
        name: table_name.to_string(),
        columns: metas,
        row_count: rows.len(),
    };
    Ok((table, meta))
}

/// Infer one column's type from its raw cells and materialise the buffer.
/// An empty column (header-only file) falls through to STRING.
fn infer_column(
    cells: &[&str],
    dict: &crate::storage::SharedDictionary,
) -> (ColumnBuffer, DataType) {
    if !cells.is_empty() {
        if cells.iter().all(|c| is_date_cell(c)) {
            let data: Vec<i32> = cells.iter().map(|c| c.parse().unwrap_or(0)).collect();
            return (data.into(), DataType::Date32);
        }
        if cells.iter().all(|c| is_int_cell(c)) {
            let data: Vec<i64> = cells.iter().map(|c| parse_int_cell(c)).collect();
            return (data.into(), DataType::Int64);
        }
        if cells.iter().all(|c| is_float_cell(c)) {
            let data: Vec<f64> = cells
                .iter()
                .map(|c| c.trim().parse().unwrap_or(0.0))
                .collect();
            return (data.into(), DataType::Double);
        }
    }
    let mut guard = dict.write();
    let data: Vec<u32> = cells.iter().map(|c| guard.get_or_add(c)).collect();
    drop(guard);
    (data.into(), DataType::Str)
}

/// Min/max for numeric and date columns, distinct count for every column.
fn column_stats(cells: &[&str], buffer: &ColumnBuffer) -> ColumnStats {
    let ndv = cells.iter().collect::<HashSet<_>>().len();
    let mut stats = ColumnStats {
        min: None,
        max: None,
        ndv,
    };
    if matches!(buffer.data_type(), DataType::Str) {
        return stats;
    }
    for row in 0..buffer.len() {
        let value = buffer.value(row);
        stats.min = Some(match stats.min {
            Some(current) if datum_le(current, value) => current,
            _ => value,
        });
        stats.max = Some(match stats.max {
            Some(current) if datum_le(value, current) => current,
            _ => value,
        });
    }
    stats
}

/// Ordering helper for same-typed numeric stats datums.
fn datum_le(a: Datum, b: Datum) -> bool {
    match (a, b) {
        (Datum::Int64(x), Datum::Int64(y)) => x <= y,
        (Datum::Double(x), Datum::Double(y)) => x <= y,
        (Datum::Date32(x), Datum::Date32(y)) => x <= y,
        _ => false,
    }
}
