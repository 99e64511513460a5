//! The query executor (C7): table-level operations over the row store and
//! history store.
//!
//! This module never touches the catalog. `INSERT`/`UPDATE` take the
//! `Schema` they need as a parameter, cloned by the dispatcher out of the
//! catalog under a short lock; scans (`query`, `find_ids_matching`, `join`)
//! and `DELETE` read `_schema.json` straight off disk via
//! [`schema_from_disk`], so they keep working even when the catalog is
//! cold for an otherwise-existing table (§4.5).

use std::path::Path;

use chrono::Utc;
use gitdb_core::error::{GitDbError, Result};
use gitdb_core::predicate::{self, Predicate};
use gitdb_core::row::{self, Row};
use gitdb_core::schema::{Column, Schema};
use gitdb_core::value::{self, ColumnKind, Value};
use gitdb_storage::{row_store, HistoryStore};

/// `ORDER BY` direction, decoupled here from `gitdb-sql`'s AST type so the
/// executor doesn't depend on the parser crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

/// Parameters for a table scan (§4.7 `Query`).
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub filter: Predicate,
    pub order_by: Option<(String, OrderDir)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Read `_schema.json` directly off disk, bypassing the catalog entirely.
fn schema_from_disk(database_dir: &Path, table: &str) -> Result<Schema> {
    row_store::read_schema(&row_store::table_dir(database_dir, table))
}

fn coerce_fields(
    schema: &Schema,
    assignments: &[(String, String)],
) -> Result<Vec<(String, Value)>> {
    assignments
        .iter()
        .map(|(name, literal)| {
            let kind = schema
                .kind_of(name)
                .ok_or_else(|| GitDbError::UnknownColumn(name.clone()))?;
            Ok((name.clone(), value::coerce(literal, kind)?))
        })
        .collect()
}

/// `CREATE TABLE <name> (<col> <kind>, ...)` (§4.4, §4.8). Returns the new
/// schema; the caller is responsible for inserting it into the catalog.
pub fn create_table(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    columns: &[(String, String)],
) -> Result<Schema> {
    let cols = columns
        .iter()
        .map(|(name, kind)| {
            Ok(Column {
                name: name.clone(),
                kind: ColumnKind::parse(kind)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let schema = Schema::new(cols)?;

    row_store::create_table(database_dir, table, &schema)?;
    history.commit(database_dir, &format!("Create table {table}"))?;
    tracing::info!(event = "table.create", table);
    Ok(schema)
}

/// `DROP TABLE <name>` — missing table is not an error (§4.4, §9). The
/// caller is responsible for removing the table from the catalog.
pub fn drop_table(database_dir: &Path, history: &dyn HistoryStore, table: &str) -> Result<()> {
    row_store::drop_table(database_dir, table)?;
    history.commit(database_dir, &format!("Drop table {table}"))?;
    tracing::info!(event = "table.drop", table);
    Ok(())
}

/// `TRUNCATE TABLE <name>`.
pub fn truncate_table(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
) -> Result<()> {
    row_store::truncate_table(database_dir, table)?;
    history.commit(database_dir, &format!("Truncate table {table}"))?;
    tracing::info!(event = "table.truncate", table);
    Ok(())
}

/// `ALTER TABLE <name> ADD COLUMN <col> <kind>` (§4.7): rewrites the
/// schema and back-fills every existing row with the zero value.
/// `existing_schema` is cloned out of the catalog by the caller; the new
/// schema is returned for the caller to re-insert.
pub fn alter_add_column(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    existing_schema: &Schema,
    column_name: &str,
    column_kind: &str,
) -> Result<Schema> {
    let kind = ColumnKind::parse(column_kind)?;
    let mut schema = existing_schema.clone();
    schema.add_column(Column {
        name: column_name.to_string(),
        kind,
    })?;

    row_store::create_table(database_dir, table, &schema)?;

    let zero = value::zero(kind);
    for mut row in row_store::list_rows(database_dir, table, &schema)? {
        row.fields.insert(column_name.to_string(), zero.clone());
        row_store::write_row(database_dir, table, &row)?;
    }

    history.commit(
        database_dir,
        &format!("Alter table {table} add column {column_name}"),
    )?;
    tracing::info!(event = "table.alter_add_column", table, column = column_name);
    Ok(schema)
}

/// `INSERT INTO <table> (...) VALUES (...)` (§4.7). `schema` is cloned out
/// of the catalog by the caller (§4.5: INSERT/UPDATE consult the catalog).
pub fn insert(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    schema: &Schema,
    columns: &[String],
    values: &[String],
) -> Result<Row> {
    for name in columns {
        if !schema.has_column(name) {
            return Err(GitDbError::UnknownColumn(name.clone()));
        }
    }

    let mut fields = indexmap::IndexMap::new();
    for column in schema.columns() {
        let provided = columns.iter().position(|c| c == &column.name);
        let val = match provided {
            Some(idx) => value::coerce(&values[idx], column.kind)?,
            None => value::zero(column.kind),
        };
        fields.insert(column.name.clone(), val);
    }

    let now = Utc::now();
    let row = Row {
        id: row::next_id(),
        deleted: false,
        created_at: now,
        updated_at: None,
        deleted_at: None,
        fields,
    };

    row_store::write_row(database_dir, table, &row)?;
    commit_row(database_dir, history, table, &row, "Insert")?;
    tracing::info!(event = "row.insert", table, id = %row.id);
    Ok(row)
}

/// `Update(table, id, patch)` — read-modify-write of a single row by id
/// (§4.7). The dispatcher resolves `UPDATE ... WHERE` into a scan plus one
/// call per matching row.
pub fn update_by_id(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    schema: &Schema,
    id: &str,
    assignments: &[(String, String)],
) -> Result<Row> {
    let coerced = coerce_fields(schema, assignments)?;

    let mut row = row_store::read_row(database_dir, table, id, schema)?;
    for (name, value) in coerced {
        row.fields.insert(name, value);
    }
    row.updated_at = Some(Utc::now());

    row_store::write_row(database_dir, table, &row)?;
    commit_row(database_dir, history, table, &row, "Update")?;
    tracing::info!(event = "row.update", table, id);
    Ok(row)
}

/// `Delete(table, id)` — soft delete (§4.7). Resolves its schema off disk
/// like the scan paths; a delete needs no column-kind lookup, so there is
/// no reason to depend on the catalog here.
pub fn delete_by_id(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    id: &str,
) -> Result<Row> {
    let schema = schema_from_disk(database_dir, table)?;
    let mut row = row_store::read_row(database_dir, table, id, &schema)?;
    row.deleted = true;
    row.deleted_at = Some(Utc::now());

    row_store::write_row(database_dir, table, &row)?;
    commit_row(database_dir, history, table, &row, "Delete")?;
    tracing::info!(event = "row.delete", table, id);
    Ok(row)
}

fn commit_row(
    database_dir: &Path,
    history: &dyn HistoryStore,
    table: &str,
    row: &Row,
    verb: &str,
) -> Result<()> {
    let mut message = format!("{verb} row {} in {table}\n\n", row.id);
    for line in row.preview_lines() {
        message.push_str(&line);
        message.push('\n');
    }
    history.commit(database_dir, &message)
}

/// Resolve every non-deleted row in `table` matching `filter` — used by
/// `UPDATE`/`DELETE ... WHERE` to find the rows to mutate by id. A scan, so
/// it resolves its schema off disk and never fails on a cold catalog
/// (§4.5).
pub fn find_ids_matching(
    database_dir: &Path,
    table: &str,
    filter: &Predicate,
) -> Result<Vec<String>> {
    let schema = schema_from_disk(database_dir, table)?;
    let rows = row_store::list_rows(database_dir, table, &schema)?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.deleted && predicate::eval(filter, r))
        .map(|r| r.id)
        .collect())
}

/// `Query(table, where, order_by, order_dir, limit, offset)` (§4.7). Reads
/// `_schema.json` off disk rather than through the catalog, so a scan
/// against a table the catalog hasn't (yet) learned about still succeeds
/// (§4.5).
pub fn query(database_dir: &Path, table: &str, params: &QueryParams) -> Result<Vec<Row>> {
    let schema = schema_from_disk(database_dir, table)?;
    let mut rows: Vec<Row> = row_store::list_rows(database_dir, table, &schema)?
        .into_iter()
        .filter(|r| !r.deleted)
        .filter(|r| predicate::eval(&params.filter, r))
        .collect();

    if let Some((column, dir)) = &params.order_by {
        rows.sort_by(|a, b| {
            let va = field_value(a, column);
            let vb = field_value(b, column);
            let ord = if value::less(&va, &vb) {
                std::cmp::Ordering::Less
            } else if value::less(&vb, &va) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            };
            match dir {
                OrderDir::Asc => ord,
                OrderDir::Desc => ord.reverse(),
            }
        });
    }

    let offset = params.offset.unwrap_or(0);
    if offset >= rows.len() {
        return Ok(Vec::new());
    }
    rows.drain(..offset);

    if let Some(limit) = params.limit {
        if limit > 0 && limit < rows.len() {
            rows.truncate(limit);
        }
    }

    Ok(rows)
}

pub(crate) fn field_value(row: &Row, column: &str) -> Value {
    match column {
        "id" => Value::String(row.id.clone()),
        "deleted" => Value::Bool(row.deleted),
        "created_at" => Value::Timestamp(row.created_at),
        "updated_at" => row.updated_at.map(Value::Timestamp).unwrap_or(Value::Null),
        "deleted_at" => row.deleted_at.map(Value::Timestamp).unwrap_or(Value::Null),
        other => row.fields.get(other).cloned().unwrap_or(Value::Null),
    }
}

/// A joined row: provenance-prefixed fields from both sides (§4.7).
pub type JoinedRow = indexmap::IndexMap<String, Value>;

/// `Join(left, right, left_key, right_key)` — inner equi-join (§4.7).
pub fn join(
    database_dir: &Path,
    left_table: &str,
    right_table: &str,
    left_key: &str,
    right_key: &str,
) -> Result<Vec<JoinedRow>> {
    let empty = QueryParams::default();
    let left_rows = query(database_dir, left_table, &empty)?;
    let right_rows = query(database_dir, right_table, &empty)?;

    let mut index: std::collections::HashMap<String, Vec<&Row>> = std::collections::HashMap::new();
    for row in &right_rows {
        let key = field_value(row, right_key).render();
        index.entry(key).or_default().push(row);
    }

    let mut results = Vec::new();
    for left in &left_rows {
        let key = field_value(left, left_key).render();
        if let Some(matches) = index.get(&key) {
            for right in matches {
                let mut joined = JoinedRow::new();
                for (k, v) in row_fields_with_engine(left) {
                    joined.insert(format!("left.{k}"), v);
                }
                for (k, v) in row_fields_with_engine(right) {
                    joined.insert(format!("right.{k}"), v);
                }
                results.push(joined);
            }
        }
    }
    Ok(results)
}

fn row_fields_with_engine(row: &Row) -> Vec<(String, Value)> {
    let mut out = vec![
        ("id".to_string(), Value::String(row.id.clone())),
        ("created_at".to_string(), Value::Timestamp(row.created_at)),
    ];
    if let Some(ts) = row.updated_at {
        out.push(("updated_at".to_string(), Value::Timestamp(ts)));
    }
    for (k, v) in &row.fields {
        out.push((k.clone(), v.clone()));
    }
    out
}
