//! Crate-wide error type.
//!
//! Errors abort the current query at the point of detection and surface to
//! the caller as a single formatted line; there is no recovery or retry.

use thiserror::Error;

/// All failure modes the engine reports.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unexpected token, unknown operator character, unterminated string.
    #[error("parse error: {0}")]
    Parse(String),

    /// Unknown column, missing join key, or table not in the catalog.
    #[error("name resolution error: {0}")]
    NameResolution(String),

    /// Datum accessed as the wrong primitive or incompatible comparison.
    #[error("type error: {0}")]
    Type(String),

    /// Integer division by zero.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Invalid logical node or unsupported expression during planning.
    #[error("plan error: {0}")]
    Plan(String),

    /// Unreadable CSV source or malformed row.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
