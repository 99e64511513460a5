//! The engine facade (C9): the single entry point the HTTP layer calls.
//!
//! Combines the catalog and the session registry behind one
//! `tokio::sync::RwLock` per §5.1 — a DDL statement and a concurrent
//! INSERT to the same table may interleave, since the dispatcher only ever
//! takes this lock long enough to read or mutate the session and the
//! catalog; it is always released again before a row-store or history call.
//! Statement execution itself runs on the blocking thread pool via
//! `spawn_blocking`, since the row store and history adapter are
//! synchronous I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitdb_core::error::{GitDbError, Result};
use gitdb_sql::Statement;
use gitdb_storage::{Catalog, HistoryStore};
use tokio::sync::RwLock;

use crate::dispatcher;
use crate::result::{ExecuteOutput, StatementResult};

/// State guarded by [`Engine`]'s single lock. `pub(crate)` so the
/// dispatcher can take short, targeted locks of its own instead of the
/// facade holding one guard for an entire statement (§5.1).
pub(crate) struct Shared {
    pub(crate) catalog: Catalog,
    pub(crate) sessions: gitdb_session::SessionRegistry,
}

/// Process-wide gitdb instance: one per `--root`.
pub struct Engine {
    root: PathBuf,
    shared: Arc<RwLock<Shared>>,
    history: Arc<dyn HistoryStore>,
}

impl Engine {
    /// Boot the catalog from `root` and start the idle-session sweeper.
    pub fn new(root: impl Into<PathBuf>, history: Arc<dyn HistoryStore>) -> Engine {
        let root = root.into();
        let catalog = Catalog::boot(&root);
        let shared = Arc::new(RwLock::new(Shared {
            catalog,
            sessions: gitdb_session::SessionRegistry::new(),
        }));

        let engine = Engine {
            root,
            shared,
            history,
        };
        engine.spawn_sweeper();
        engine
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn spawn_sweeper(&self) {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(gitdb_session::SWEEP_INTERVAL).await;
                let mut guard = shared.write().await;
                guard.sessions.evict_idle(gitdb_session::SESSION_IDLE_TIMEOUT);
            }
        });
    }

    /// Run a `;`-separated statement batch under `session_id`, creating the
    /// session on first use. Statements run strictly in order and each
    /// one's effects are visible to the next (§5 ordering guarantee, P8).
    pub async fn execute(&self, session_id: &str, sql_batch: &str) -> Result<ExecuteOutput> {
        let fragments = gitdb_sql::split_batch(sql_batch);
        let mut results = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let statement = gitdb_sql::parse_statement(&fragment)?;
            results.push(self.execute_one(session_id, statement).await?);
        }
        Ok(match results.len() {
            1 => ExecuteOutput::Single(results.into_iter().next().expect("len checked above")),
            _ => ExecuteOutput::Many(results),
        })
    }

    async fn execute_one(&self, session_id: &str, statement: Statement) -> Result<StatementResult> {
        let root = self.root.clone();
        let history = self.history.clone();
        let shared = self.shared.clone();
        let session_id = session_id.to_string();

        tokio::task::spawn_blocking(move || {
            dispatcher::execute_statement(&root, &shared, &session_id, history.as_ref(), statement)
        })
        .await
        .map_err(|e| GitDbError::HistoryFailure(format!("executor task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdb_storage::history::fake::MemoryHistoryStore;

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(dir.path(), Arc::new(MemoryHistoryStore::new()));
        (dir, engine)
    }

    #[tokio::test]
    async fn single_statement_serializes_bare() {
        let (_dir, engine) = engine();
        let out = engine.execute("s1", "CREATE DATABASE d").await.unwrap();
        assert!(matches!(out, ExecuteOutput::Single(_)));
    }

    #[tokio::test]
    async fn multi_statement_batch_serializes_as_many() {
        let (_dir, engine) = engine();
        let out = engine
            .execute("s1", "CREATE DATABASE d; USE DATABASE d;")
            .await
            .unwrap();
        assert!(matches!(out, ExecuteOutput::Many(_)));
    }

    #[tokio::test]
    async fn scenario_s1_insert_then_select() {
        let (_dir, engine) = engine();
        engine
            .execute(
                "s1",
                "CREATE DATABASE d; USE DATABASE d; CREATE TABLE t(x INT); \
                 INSERT INTO t(x) VALUES ('1');",
            )
            .await
            .unwrap();
        let out = engine.execute("s1", "SELECT * FROM t").await.unwrap();
        match out {
            ExecuteOutput::Single(StatementResult::Rows(rows)) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0]["x"], serde_json::json!(1));
                assert_eq!(rows[0]["deleted"], serde_json::Value::Null);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_state_is_isolated_per_session_id() {
        let (_dir, engine) = engine();
        engine.execute("s1", "CREATE DATABASE d").await.unwrap();
        engine.execute("s1", "USE DATABASE d").await.unwrap();

        let err = engine
            .execute("s2", "CREATE TABLE t(x INT)")
            .await
            .unwrap_err();
        assert!(matches!(err, GitDbError::NoDatabaseSelected));
    }

    #[tokio::test]
    async fn unknown_table_select_is_an_error() {
        let (_dir, engine) = engine();
        engine
            .execute("s1", "CREATE DATABASE d; USE DATABASE d;")
            .await
            .unwrap();
        let err = engine.execute("s1", "SELECT * FROM ghost").await.unwrap_err();
        assert!(matches!(err, GitDbError::UnknownTable(_)));
    }
}
