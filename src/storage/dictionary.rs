//! Dictionary encoding for string values.
//!
//! Strings are stored in columns as u32 codes into an append-only
//! dictionary. Codes are assigned in first-seen order and are stable for
//! the life of the dictionary, so equality of codes implies equality of
//! strings within one dictionary. Two tables may carry different
//! dictionaries; comparing codes across them is meaningless.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Append-only string <-> code mapping.
#[derive(Debug, Default)]
pub struct Dictionary {
    /// Distinct strings in insertion order. Index = code.
    values: Vec<String>,
    /// Reverse lookup: string -> code.
    index: HashMap<String, u32>,
}

/// A dictionary shared between a table and the queries that run over it.
/// Queries take the write lock only to intern string literals.
pub type SharedDictionary = Arc<RwLock<Dictionary>>;

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh dictionary for sharing.
    pub fn shared() -> SharedDictionary {
        Arc::new(RwLock::new(Dictionary::new()))
    }

    /// Return the code for `s`, appending it if unseen. Idempotent: the
    /// same string always yields the same code.
    pub fn get_or_add(&mut self, s: &str) -> u32 {
        if let Some(&code) = self.index.get(s) {
            return code;
        }
        let code = self.values.len() as u32;
        self.values.push(s.to_string());
        self.index.insert(s.to_string(), code);
        code
    }

    /// The string for a code, or `None` if the code was never assigned.
    pub fn get(&self, code: u32) -> Option<&str> {
        self.values.get(code as usize).map(String::as_str)
    }

    /// The code for a string, without interning it.
    pub fn lookup(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    /// Number of distinct strings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
