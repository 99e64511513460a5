//! The row store (C4): per-table directory of JSON row files plus a
//! `_schema.json` sidecar.
//!
//! ```text
//! <db>/<table>/_schema.json
//! <db>/<table>/<id>.json
//! ```
//!
//! `_schema.json` and any other underscore-prefixed file are reserved and
//! never scanned as rows (§4.4).

use std::path::{Path, PathBuf};

use gitdb_core::error::{GitDbError, Result};
use gitdb_core::row::Row;
use gitdb_core::schema::Schema;

const SCHEMA_FILE: &str = "_schema.json";

pub fn database_dir(root: &Path, database: &str) -> PathBuf {
    root.join(database)
}

pub fn database_exists(root: &Path, database: &str) -> bool {
    database_dir(root, database).is_dir()
}

/// Create a database directory. The caller commits a revision and seeds
/// the catalog from whatever tables it later creates.
pub fn create_database(root: &Path, database: &str) -> Result<()> {
    std::fs::create_dir_all(database_dir(root, database))?;
    Ok(())
}

/// Remove a database directory entirely. Missing database is not an
/// error, matching `drop_table`'s idempotent-delete semantics.
pub fn drop_database(root: &Path, database: &str) -> Result<()> {
    match std::fs::remove_dir_all(database_dir(root, database)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn table_dir(database_dir: &Path, table: &str) -> PathBuf {
    database_dir.join(table)
}

fn row_path(table_dir: &Path, id: &str) -> PathBuf {
    table_dir.join(format!("{id}.json"))
}

/// Read `_schema.json` from a table directory.
pub fn read_schema(table_dir: &Path) -> Result<Schema> {
    let path = table_dir.join(SCHEMA_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|_| GitDbError::UnknownTable(table_name(table_dir)))?;
    Ok(serde_json::from_str(&text)?)
}

fn write_schema(table_dir: &Path, schema: &Schema) -> Result<()> {
    let path = table_dir.join(SCHEMA_FILE);
    let pretty = serde_json::to_string_pretty(schema)?;
    std::fs::write(path, pretty)?;
    Ok(())
}

fn table_name(table_dir: &Path) -> String {
    table_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Create a table directory and write its schema. The caller is
/// responsible for committing a revision and updating the catalog.
pub fn create_table(database_dir: &Path, table: &str, schema: &Schema) -> Result<()> {
    let dir = table_dir(database_dir, table);
    std::fs::create_dir_all(&dir)?;
    write_schema(&dir, schema)
}

/// Remove a table's directory entirely. Missing table is not an error
/// (§4.4, resolved open question: `DROP TABLE` on a missing table
/// succeeds silently).
pub fn drop_table(database_dir: &Path, table: &str) -> Result<()> {
    let dir = table_dir(database_dir, table);
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove every row file (anything not prefixed `_`) from a table,
/// leaving `_schema.json` in place.
pub fn truncate_table(database_dir: &Path, table: &str) -> Result<()> {
    let dir = table_dir(database_dir, table);
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('_') || !name.ends_with(".json") {
            continue;
        }
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

/// Read a single row by id. Fails with [`GitDbError::UnknownTable`]-shaped
/// I/O errors bubbled as [`GitDbError::Io`] when the file is absent;
/// callers typically already checked the table exists in the catalog.
pub fn read_row(database_dir: &Path, table: &str, id: &str, schema: &Schema) -> Result<Row> {
    let path = row_path(&table_dir(database_dir, table), id);
    let text = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Row::from_json(&json, schema)
}

/// Serialize a row to pretty-printed JSON and write it to
/// `<table>/<id>.json`. The caller commits a revision afterward with a
/// message built from [`Row::preview_lines`] (§4.4).
pub fn write_row(database_dir: &Path, table: &str, row: &Row) -> Result<()> {
    let dir = table_dir(database_dir, table);
    let path = row_path(&dir, &row.id);
    let pretty = serde_json::to_string_pretty(&row.to_json())?;
    std::fs::write(path, pretty)?;
    Ok(())
}

/// List every row in a table, skipping reserved files and silently
/// discarding rows that fail to parse (§4.4, §7).
pub fn list_rows(database_dir: &Path, table: &str, schema: &Schema) -> Result<Vec<Row>> {
    let dir = table_dir(database_dir, table);
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GitDbError::UnknownTable(table.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut rows = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('_') || !name.ends_with(".json") {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };
        if let Ok(row) = Row::from_json(&json, schema) {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn table_exists(database_dir: &Path, table: &str) -> bool {
    table_dir(database_dir, table).join(SCHEMA_FILE).is_file()
}
