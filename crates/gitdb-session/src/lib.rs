//! The session registry (C6): opaque session id -> per-session state.
//!
//! The registry itself holds no lock — the engine facade guards it (and
//! the catalog) behind a single shared `tokio::sync::RwLock`, per §5.1.
//! This crate only models the data and the double-checked-lookup /
//! eviction *policy*; the locking choreography lives in `gitdb-engine`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Sessions idle longer than this are purged by the sweeper (§3, §4.6).
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How often the sweeper runs (§4.6).
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Per-session state: currently just the selected database.
#[derive(Debug, Clone)]
pub struct Session {
    pub selected_database: Option<String>,
    pub last_active: Instant,
}

impl Session {
    fn new() -> Session {
        Session {
            selected_database: None,
            last_active: Instant::now(),
        }
    }
}

/// In-memory map from opaque session id to [`Session`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Create a session for `id` if it doesn't already exist, bumping
    /// `last_active` either way.
    pub fn get_or_create(&mut self, id: &str) -> &mut Session {
        let session = self.sessions.entry(id.to_string()).or_insert_with(Session::new);
        session.last_active = Instant::now();
        session
    }

    /// Remove every session whose `last_active` is older than `idle`.
    /// Returns the number evicted.
    pub fn evict_idle(&mut self, idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.last_active.elapsed() <= idle);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::info!(event = "session.sweep", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
