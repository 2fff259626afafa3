//! Output formatters.
//!
//! The driver hands formatters fully decoded string cells; a formatter
//! only decides layout. `TableFormatter` buffers everything to compute
//! column widths; `DelimitedFormatter` streams.

use std::io::Write;

use crate::error::Result;
use crate::storage::DataType;

/// Receives one query result: `begin` once, `write_row` per row, `end`
/// once with the total row count.
pub trait Formatter {
    fn begin(&mut self, names: &[String], types: &[DataType]) -> Result<()>;
    fn write_row(&mut self, cells: Vec<String>) -> Result<()>;
    fn end(&mut self, row_count: usize) -> Result<()>;
}

/// Width-aligned pipe table, markdown style. Prints `(no results)` for an
/// empty result.
pub struct TableFormatter<W: Write> {
    out: W,
    headers: Vec<String>,
    widths: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl<W: Write> TableFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn print_row(&mut self, cells: &[String]) -> Result<()> {
        write!(self.out, "|")?;
        for (i, &width) in self.widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            write!(self.out, " {:<width$} |", cell, width = width)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

impl<W: Write> Formatter for TableFormatter<W> {
    fn begin(&mut self, names: &[String], _types: &[DataType]) -> Result<()> {
        self.headers = names.to_vec();
        self.widths = names.iter().map(String::len).collect();
        self.rows.clear();
        Ok(())
    }

    fn write_row(&mut self, cells: Vec<String>) -> Result<()> {
        if cells.len() > self.widths.len() {
            self.widths.resize(cells.len(), 0);
        }
        for (i, cell) in cells.iter().enumerate() {
            self.widths[i] = self.widths[i].max(cell.len());
        }
        self.rows.push(cells);
        Ok(())
    }

    fn end(&mut self, row_count: usize) -> Result<()> {
        if row_count == 0 {
            writeln!(self.out, "(no results)")?;
            return Ok(());
        }
        let headers = self.headers.clone();
        self.print_row(&headers)?;
        write!(self.out, "|")?;
        for width in &self.widths {
            write!(self.out, " {} |", "-".repeat(*width))?;
        }
        writeln!(self.out)?;
        let rows = std::mem::take(&mut self.rows);
        for row in &rows {
            self.print_row(row)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Streaming delimited output with RFC-style quoting.
pub struct DelimitedFormatter<W: Write> {
    out: W,
    sep: char,
}

impl<W: Write> DelimitedFormatter<W> {
    pub fn new(out: W, sep: char) -> Self {
        Self { out, sep }
    }

    fn escape(&self, cell: &str) -> String {
        let needs_quotes = cell.contains(self.sep)
            || cell.contains('"')
            || cell.contains('\n')
            || cell.contains('\r');
        if !needs_quotes {
            return cell.to_string();
        }
        let mut escaped = String::with_capacity(cell.len() + 2);
        escaped.push('"');
        for ch in cell.chars() {
            if ch == '"' {
                escaped.push('"');
            }
            escaped.push(ch);
        }
        escaped.push('"');
        escaped
    }

    fn write_cells(&mut self, cells: &[String]) -> Result<()> {
        let line: Vec<String> = cells.iter().map(|c| self.escape(c)).collect();
        writeln!(self.out, "{}", line.join(&self.sep.to_string()))?;
        Ok(())
    }
}

impl<W: Write> Formatter for DelimitedFormatter<W> {
    fn begin(&mut self, names: &[String], _types: &[DataType]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.write_cells(names)
    }

    fn write_row(&mut self, cells: Vec<String>) -> Result<()> {
        self.write_cells(&cells)
    }

    fn end(&mut self, _row_count: usize) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
