//! Storage seam for battle documents. A store persists whole JSON documents under a version
//! number and offers compare-and-swap plus change listeners; everything above it is
//! storage-agnostic.

pub mod memory;
pub mod sanitize;
pub mod transaction;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sanitize::strip_nulls;
pub use transaction::{run_transaction, RetryPolicy, Step, TransactionError};

/// A stored document and the version it was written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub version: u64,
    pub doc: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("document '{0}' not found")]
    NotFound(String),
    #[error("document '{0}' already exists")]
    AlreadyExists(String),
    #[error("write conflict on '{id}': expected version {expected}, found {found}")]
    Conflict { id: String, expected: u64, found: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Listener = Arc<dyn Fn(&Record) + Send + Sync>;

/// Handle returned by [`BattleStore::listen`]; pass back to [`BattleStore::unlisten`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub trait BattleStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Write a new document at version 1. Fails if `id` is taken.
    fn insert(&self, id: &str, doc: Value) -> Result<u64, StoreError>;

    /// Replace the document only if it is still at `expected`. Returns the new version.
    fn compare_and_swap(&self, id: &str, expected: u64, doc: Value) -> Result<u64, StoreError>;

    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<(String, Record)>, StoreError>;

    /// Register a change listener for one document. Called after each committed write, and
    /// once immediately with the current record when it exists. Versions delivered to one
    /// listener are strictly increasing.
    fn listen(&self, id: &str, listener: Listener) -> ListenerId;

    fn unlisten(&self, id: &str, listener: ListenerId);
}
