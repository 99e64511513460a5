//! The history store adapter (C1): shells out to a version-control binary
//! to record every mutation as a revision.
//!
//! Treated as an injected dependency behind [`HistoryStore`] so the engine
//! is testable without a real subprocess (§4.1, §9 "External-process
//! coupling").

use std::path::Path;
use std::process::Command;

use gitdb_core::error::{GitDbError, Result};

/// Operations the engine needs from a content-addressed history tool.
pub trait HistoryStore: Send + Sync {
    /// Initialize a repository rooted at `path`. Idempotent: succeeds if
    /// a repository already exists there.
    fn init(&self, path: &Path) -> Result<()>;

    /// Stage every change under `path` and commit with `message`.
    /// "Nothing to commit" is treated as success.
    fn commit(&self, path: &Path, message: &str) -> Result<()>;
}

/// Shells out to the `git` binary (or whatever `GITDB_VCS_BIN` names).
pub struct GitHistoryStore {
    bin: String,
}

impl Default for GitHistoryStore {
    fn default() -> Self {
        let bin = std::env::var("GITDB_VCS_BIN").unwrap_or_else(|_| "git".to_string());
        GitHistoryStore { bin }
    }
}

impl GitHistoryStore {
    pub fn new(bin: impl Into<String>) -> Self {
        GitHistoryStore { bin: bin.into() }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.bin)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| GitDbError::HistoryFailure(format!("failed to run {}: {e}", self.bin)))
    }
}

impl HistoryStore for GitHistoryStore {
    fn init(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        if path.join(".git").is_dir() {
            return Ok(());
        }
        let output = self.run(path, &["init"])?;
        if !output.status.success() {
            return Err(failure("init", &output));
        }
        tracing::info!(event = "history.init", path = %path.display());
        Ok(())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<()> {
        let add = self.run(path, &["add", "."])?;
        if !add.status.success() {
            return Err(failure("add", &add));
        }

        let output = self.run(path, &["commit", "-m", message])?;
        if output.status.success() {
            tracing::info!(event = "history.commit", path = %path.display(), message = %message);
            return Ok(());
        }

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if combined.contains("nothing to commit") {
            return Ok(());
        }
        Err(failure("commit", &output))
    }
}

fn failure(op: &str, output: &std::process::Output) -> GitDbError {
    GitDbError::HistoryFailure(format!(
        "git {op} failed\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    ))
}

/// An in-memory fake used by tests: records every commit message per path
/// without shelling out, so engine tests stay hermetic and fast (§9).
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryHistoryStore {
        commits: Mutex<HashMap<String, Vec<String>>>,
    }

    impl MemoryHistoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commit messages recorded for `path`, in order.
        pub fn commits_for(&self, path: &Path) -> Vec<String> {
            self.commits
                .lock()
                .unwrap()
                .get(&path.display().to_string())
                .cloned()
                .unwrap_or_default()
        }
    }

    impl HistoryStore for MemoryHistoryStore {
        fn init(&self, path: &Path) -> Result<()> {
            std::fs::create_dir_all(path)?;
            self.commits
                .lock()
                .unwrap()
                .entry(path.display().to_string())
                .or_default();
            Ok(())
        }

        fn commit(&self, path: &Path, message: &str) -> Result<()> {
            self.commits
                .lock()
                .unwrap()
                .entry(path.display().to_string())
                .or_default()
                .push(message.to_string());
            Ok(())
        }
    }
}
