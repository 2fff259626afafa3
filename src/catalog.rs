//! Table registry.
//!
//! Maps table names to their loaded data and metadata. Names are unique;
//! registering under an existing name replaces the previous entry.

use std::collections::HashMap;

use crate::storage::{Table, TableMeta};

/// One registered table: data plus metadata.
#[derive(Debug)]
pub struct CatalogEntry {
    pub table: Table,
    pub meta: TableMeta,
}

/// Name -> table mapping for the current session.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its metadata name, replacing any existing
    /// entry with the same name.
    pub fn register(&mut self, table: Table, meta: TableMeta) {
        self.tables
            .insert(meta.name.clone(), CatalogEntry { table, meta });
    }

    /// Look up a table's data by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).map(|e| &e.table)
    }

    /// Look up a table's metadata by name.
    pub fn meta(&self, name: &str) -> Option<&TableMeta> {
        self.tables.get(name).map(|e| &e.meta)
    }

    /// All registered table names, sorted for deterministic output.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
