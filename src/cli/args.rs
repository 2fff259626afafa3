//! Command-line argument parsing via clap derive.
//!
//! Non-interactive, one query per invocation: load the given CSV files,
//! run the SQL from `-e`, `-f`, or a stdin pipe, format, exit.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;

/// In-memory analytical SQL engine over CSV files.
///
/// Each CSV file registers a table named after its file stem, with
/// columns qualified as `table.column`.
#[derive(Parser, Debug)]
#[command(name = "csvql", version, about)]
pub struct CliArgs {
    /// CSV files to load as tables.
    #[arg(value_name = "CSV")]
    pub files: Vec<PathBuf>,

    /// SQL query to execute.
    #[arg(short = 'e', long = "execute", value_name = "SQL")]
    pub execute: Option<String>,

    /// Read the SQL query from a file.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format: table or csv.
    #[arg(long = "format", value_name = "FORMAT", default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// Width-aligned pipe table (default).
    Table,
    /// Comma-separated values.
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("unknown format '{}'. Valid: table, csv", s)),
        }
    }
}

impl CliArgs {
    /// Resolve the SQL query from `-e`, `-f`, or a stdin pipe.
    pub fn resolve_query(&self) -> Result<String, String> {
        if let Some(sql) = &self.execute {
            return Ok(sql.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .map(|s| s.trim().to_string())
                .map_err(|e| format!("failed to read SQL file '{}': {}", path.display(), e));
        }
        if !std::io::stdin().is_terminal() {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .map_err(|e| format!("failed to read from stdin: {}", e))?;
            let trimmed = buf.trim().to_string();
            if !trimmed.is_empty() {
                return Ok(trimmed);
            }
        }
        Err("no query provided. Use -e \"SQL\", -f file.sql, or pipe via stdin".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("json".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_execute_flag_wins() {
        let args = CliArgs {
            files: vec![],
            execute: Some("SELECT * FROM t".into()),
            file: None,
            format: OutputFormat::Table,
        };
        assert_eq!(args.resolve_query().unwrap(), "SELECT * FROM t");
    }
}
