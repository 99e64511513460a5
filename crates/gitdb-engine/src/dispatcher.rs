//! The SQL dispatcher's execution half (C8): matches a parsed [`Statement`]
//! to executor calls, resolves `WHERE`-scoped `UPDATE`/`DELETE` into
//! per-row calls, and shapes the result projection.
//!
//! Locking discipline (§5.1): every touch of [`Shared`] goes through one of
//! the small helpers below, each of which takes the lock, does one
//! in-memory read or write, and drops the guard before returning. No
//! helper call ever wraps a row-store or history-adapter call, so a DDL
//! statement and a concurrent `INSERT` against the same table may
//! interleave rather than fully serialize — mirroring how
//! `aivcs-core/src/git.rs`'s callers never hold a lock across the
//! subprocess call.

use std::path::{Path, PathBuf};

use gitdb_core::error::{GitDbError, Result};
use gitdb_core::row::Row;
use gitdb_core::schema::Schema;
use gitdb_sql::{OrderDir as SqlOrderDir, Projection, Statement};
use gitdb_storage::{row_store, HistoryStore};
use serde_json::Value as Json;
use tokio::sync::RwLock;

use crate::engine::Shared;
use crate::executor::{self, OrderDir, QueryParams};
use crate::result::StatementResult;

fn touch_session(shared: &RwLock<Shared>, session_id: &str) {
    shared.blocking_write().sessions.get_or_create(session_id);
}

fn selected_database(shared: &RwLock<Shared>, session_id: &str) -> Option<String> {
    shared
        .blocking_write()
        .sessions
        .get_or_create(session_id)
        .selected_database
        .clone()
}

fn set_selected_database(shared: &RwLock<Shared>, session_id: &str, database: Option<String>) {
    shared
        .blocking_write()
        .sessions
        .get_or_create(session_id)
        .selected_database = database;
}

fn current_database_dir(root: &Path, shared: &RwLock<Shared>, session_id: &str) -> Result<PathBuf> {
    let database = selected_database(shared, session_id).ok_or(GitDbError::NoDatabaseSelected)?;
    Ok(row_store::database_dir(root, &database))
}

fn catalog_schema(shared: &RwLock<Shared>, table: &str) -> Result<Schema> {
    shared
        .blocking_read()
        .catalog
        .get(table)
        .cloned()
        .ok_or_else(|| GitDbError::UnknownTable(table.to_string()))
}

fn catalog_insert(shared: &RwLock<Shared>, table: String, schema: Schema) {
    shared.blocking_write().catalog.insert(table, schema);
}

fn catalog_remove(shared: &RwLock<Shared>, table: &str) {
    shared.blocking_write().catalog.remove(table);
}

fn convert_dir(dir: SqlOrderDir) -> OrderDir {
    match dir {
        SqlOrderDir::Asc => OrderDir::Asc,
        SqlOrderDir::Desc => OrderDir::Desc,
    }
}

fn project_row(row: &Row, projection: &Projection) -> Json {
    match projection {
        Projection::All => {
            let mut obj = row.to_json().as_object().cloned().unwrap_or_default();
            obj.remove("deleted");
            obj.remove("deleted_at");
            Json::Object(obj)
        }
        Projection::Columns(columns) => {
            let mut obj = serde_json::Map::new();
            for name in columns {
                let value = executor::field_value(row, name);
                obj.insert(name.clone(), serde_json::to_value(value).unwrap_or(Json::Null));
            }
            Json::Object(obj)
        }
    }
}

/// Drop later duplicates whose textual (compact JSON) rendering matches an
/// earlier row, preserving first-seen order (§4.8 DISTINCT).
fn dedup_by_textual_form(rows: &mut Vec<Json>) {
    let mut seen = std::collections::HashSet::new();
    rows.retain(|row| seen.insert(row.to_string()));
}

/// Run one already-parsed statement against the shared catalog/session
/// state and the session's selected database. Every lock acquisition here
/// is short-lived and never spans a row-store or history call (§5.1).
pub fn execute_statement(
    root: &Path,
    shared: &RwLock<Shared>,
    session_id: &str,
    history: &dyn HistoryStore,
    statement: Statement,
) -> Result<StatementResult> {
    touch_session(shared, session_id);

    match statement {
        Statement::CreateDatabase { name } => {
            let dir = row_store::database_dir(root, &name);
            row_store::create_database(root, &name)?;
            history.init(&dir)?;
            tracing::info!(event = "database.create", database = %name);
            Ok(StatementResult::ok())
        }

        Statement::DropDatabase { name } => {
            row_store::drop_database(root, &name)?;
            if selected_database(shared, session_id).as_deref() == Some(name.as_str()) {
                set_selected_database(shared, session_id, None);
            }
            tracing::info!(event = "database.drop", database = %name);
            Ok(StatementResult::ok())
        }

        Statement::UseDatabase { name } => {
            if !row_store::database_exists(root, &name) {
                return Err(GitDbError::UnknownDatabase(name));
            }
            set_selected_database(shared, session_id, Some(name.clone()));
            tracing::info!(event = "database.use", database = %name);
            Ok(StatementResult::ok())
        }

        Statement::CreateTable { table, columns } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let columns: Vec<(String, String)> =
                columns.into_iter().map(|c| (c.name, c.kind)).collect();
            let schema = executor::create_table(&db_dir, history, &table, &columns)?;
            catalog_insert(shared, table, schema);
            Ok(StatementResult::ok())
        }

        Statement::DropTable { table } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            executor::drop_table(&db_dir, history, &table)?;
            catalog_remove(shared, &table);
            Ok(StatementResult::ok())
        }

        Statement::TruncateTable { table } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            executor::truncate_table(&db_dir, history, &table)?;
            Ok(StatementResult::ok())
        }

        Statement::AlterAddColumn { table, column } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let existing = catalog_schema(shared, &table)?;
            let schema =
                executor::alter_add_column(&db_dir, history, &table, &existing, &column.name, &column.kind)?;
            catalog_insert(shared, table, schema);
            Ok(StatementResult::ok())
        }

        Statement::Insert { table, columns, values } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let schema = catalog_schema(shared, &table)?;
            executor::insert(&db_dir, history, &table, &schema, &columns, &values)?;
            Ok(StatementResult::ok())
        }

        Statement::Update { table, assignments, filter } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let schema = catalog_schema(shared, &table)?;
            let ids = executor::find_ids_matching(&db_dir, &table, &filter)?;
            for id in ids {
                executor::update_by_id(&db_dir, history, &table, &schema, &id, &assignments)?;
            }
            Ok(StatementResult::ok())
        }

        Statement::Delete { table, filter } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let ids = executor::find_ids_matching(&db_dir, &table, &filter)?;
            for id in ids {
                executor::delete_by_id(&db_dir, history, &table, &id)?;
            }
            Ok(StatementResult::ok())
        }

        Statement::Select {
            table,
            distinct,
            projection,
            filter,
            order_by,
            limit,
            offset,
        } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let params = QueryParams {
                filter,
                order_by: order_by.map(|(column, dir)| (column, convert_dir(dir))),
                limit,
                offset,
            };
            let rows = executor::query(&db_dir, &table, &params)?;
            let mut projected: Vec<Json> = rows.iter().map(|r| project_row(r, &projection)).collect();
            if distinct {
                dedup_by_textual_form(&mut projected);
            }
            Ok(StatementResult::Rows(projected))
        }

        Statement::Join {
            left_table,
            right_table,
            left_column,
            right_column,
        } => {
            let db_dir = current_database_dir(root, shared, session_id)?;
            let joined = executor::join(&db_dir, &left_table, &right_table, &left_column, &right_column)?;
            let rows = joined
                .into_iter()
                .map(|fields| {
                    let obj: serde_json::Map<String, Json> = fields
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::to_value(v).unwrap_or(Json::Null)))
                        .collect();
                    Json::Object(obj)
                })
                .collect();
            Ok(StatementResult::Rows(rows))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdb_storage::history::fake::MemoryHistoryStore;
    use gitdb_storage::Catalog;

    const SID: &str = "s1";

    fn test_shared() -> RwLock<Shared> {
        RwLock::new(Shared {
            catalog: Catalog::new(),
            sessions: gitdb_session::SessionRegistry::new(),
        })
    }

    fn run(root: &Path, shared: &RwLock<Shared>, history: &MemoryHistoryStore, sql: &str) -> Vec<StatementResult> {
        gitdb_sql::split_batch(sql)
            .into_iter()
            .map(|fragment| {
                let statement = gitdb_sql::parse_statement(&fragment).unwrap();
                execute_statement(root, shared, SID, history, statement).unwrap()
            })
            .collect()
    }

    #[test]
    fn database_lifecycle_requires_use_before_table_ops() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        let statement = gitdb_sql::parse_statement("CREATE TABLE t(x INT)").unwrap();
        let err = execute_statement(root.path(), &shared, SID, &history, statement).unwrap_err();
        assert!(matches!(err, GitDbError::NoDatabaseSelected));
    }

    #[test]
    fn use_database_rejects_unknown_name() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        let statement = gitdb_sql::parse_statement("USE DATABASE ghost").unwrap();
        let err = execute_statement(root.path(), &shared, SID, &history, statement).unwrap_err();
        assert!(matches!(err, GitDbError::UnknownDatabase(_)));
    }

    #[test]
    fn full_batch_end_to_end_select_strips_deleted_fields() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        run(
            root.path(),
            &shared,
            &history,
            "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t(x INT); INSERT INTO t(x) VALUES ('1');",
        );
        let results = run(root.path(), &shared, &history, "SELECT * FROM t");
        match &results[0] {
            StatementResult::Rows(rows) => {
                let row = rows[0].as_object().unwrap();
                assert!(!row.contains_key("deleted"));
                assert!(!row.contains_key("deleted_at"));
                assert!(row.contains_key("id"));
                assert_eq!(row.get("x"), Some(&serde_json::json!(1)));
            }
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn delete_where_resolves_to_per_row_delete() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        run(
            root.path(),
            &shared,
            &history,
            "CREATE DATABASE d; USE DATABASE d; CREATE TABLE users(name STRING); \
             INSERT INTO users(name) VALUES ('Bob');",
        );
        run(root.path(), &shared, &history, "DELETE FROM users WHERE name = 'Bob'");
        let results = run(root.path(), &shared, &history, "SELECT * FROM users WHERE name = 'Bob'");
        match &results[0] {
            StatementResult::Rows(rows) => assert!(rows.is_empty()),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn distinct_dedups_by_projected_record() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        run(
            root.path(),
            &shared,
            &history,
            "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t(x INT); \
             INSERT INTO t(x) VALUES ('1'); INSERT INTO t(x) VALUES ('1'); INSERT INTO t(x) VALUES ('2');",
        );
        let results = run(root.path(), &shared, &history, "SELECT DISTINCT x FROM t");
        match &results[0] {
            StatementResult::Rows(rows) => assert_eq!(rows.len(), 2),
            _ => panic!("expected rows"),
        }
    }

    #[test]
    fn join_result_rows_are_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let shared = test_shared();
        let history = MemoryHistoryStore::new();

        run(
            root.path(),
            &shared,
            &history,
            "CREATE DATABASE d; USE DATABASE d; \
             CREATE TABLE users(name STRING); \
             CREATE TABLE orders(user_id STRING, product STRING);",
        );
        run(root.path(), &shared, &history, "INSERT INTO users(name) VALUES ('Alice');");
        let select = run(root.path(), &shared, &history, "SELECT * FROM users");
        let id = match &select[0] {
            StatementResult::Rows(rows) => rows[0]["id"].as_str().unwrap().to_string(),
            _ => panic!("expected rows"),
        };
        run(
            root.path(),
            &shared,
            &history,
            &format!("INSERT INTO orders(user_id, product) VALUES ('{id}', 'Widget');"),
        );

        let statement =
            gitdb_sql::parse_statement("SELECT * FROM users JOIN orders ON users.id=orders.user_id")
                .unwrap();
        let result = execute_statement(root.path(), &shared, SID, &history, statement).unwrap();
        match result {
            StatementResult::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["left.name"], serde_json::json!("Alice"));
                assert_eq!(rows[0]["right.product"], serde_json::json!("Widget"));
            }
            _ => panic!("expected rows"),
        }
    }
}
