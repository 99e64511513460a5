//! The catalog (C5): a process-wide map from table name to schema.
//!
//! Keyed by bare table name, *not* `(database, table)` — two databases
//! with same-named tables share a catalog slot. spec.md leaves this
//! ambiguous; `SPEC_FULL.md` resolves it as "kept as specified", so this
//! is a deliberate, known limitation rather than an oversight (it affects
//! invariant I2 when more than one database is ever open). The struct
//! itself holds no lock — callers (the engine facade) hold the shared
//! `tokio::sync::RwLock` that also guards the session registry (§5.1).
use std::collections::HashMap;
use std::path::Path;

use gitdb_core::schema::Schema;

use crate::row_store;

/// In-memory table-name -> schema map.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Schema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` for every `_schema.json` and seed the map. Called once
    /// at boot; directories that fail to parse are skipped (a cold or
    /// partially-written catalog must never fail a query scan, §4.5).
    pub fn boot(root: &Path) -> Catalog {
        let mut catalog = Catalog::new();
        let Ok(databases) = std::fs::read_dir(root) else {
            return catalog;
        };
        for db_entry in databases.flatten() {
            let db_path = db_entry.path();
            if !db_path.is_dir() {
                continue;
            }
            let Ok(tables) = std::fs::read_dir(&db_path) else {
                continue;
            };
            for table_entry in tables.flatten() {
                let table_path = table_entry.path();
                if !table_path.is_dir() {
                    continue;
                }
                let Some(name) = table_path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if let Ok(schema) = row_store::read_schema(&table_path) {
                    catalog.tables.insert(name.to_string(), schema);
                }
            }
        }
        catalog
    }

    pub fn get(&self, table: &str) -> Option<&Schema> {
        self.tables.get(table)
    }

    pub fn insert(&mut self, table: String, schema: Schema) {
        self.tables.insert(table, schema);
    }

    pub fn remove(&mut self, table: &str) {
        self.tables.remove(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdb_core::schema::Column;
    use gitdb_core::value::ColumnKind;

    #[test]
    fn boot_seeds_from_schema_files() {
        let root = tempfile::tempdir().unwrap();
        let table_dir = root.path().join("d1").join("t1");
        std::fs::create_dir_all(&table_dir).unwrap();
        let schema = Schema::new(vec![Column {
            name: "x".to_string(),
            kind: ColumnKind::Int,
        }])
        .unwrap();
        std::fs::write(
            table_dir.join("_schema.json"),
            serde_json::to_string(&schema).unwrap(),
        )
        .unwrap();

        let catalog = Catalog::boot(root.path());
        assert!(catalog.get("t1").is_some());
    }

    #[test]
    fn boot_on_missing_root_is_empty_not_an_error() {
        let catalog = Catalog::boot(Path::new("/does/not/exist"));
        assert!(catalog.get("anything").is_none());
    }

    #[test]
    fn insert_and_remove() {
        let mut catalog = Catalog::new();
        catalog.insert("t".to_string(), Schema::default());
        assert!(catalog.get("t").is_some());
        catalog.remove("t");
        assert!(catalog.get("t").is_none());
    }
}
