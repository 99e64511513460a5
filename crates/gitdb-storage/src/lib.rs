//! The on-disk row store, the in-memory catalog, and the history-store
//! adapter that mirrors every mutation as a version-control revision.

pub mod catalog;
pub mod history;
pub mod row_store;

pub use catalog::Catalog;
pub use history::{fake::MemoryHistoryStore, GitHistoryStore, HistoryStore};
