//! Process-local document store. Writers never block each other longer than one map update;
//! listeners run after the write lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use super::{BattleStore, Listener, ListenerId, Record, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.records.read().map(|r| r.len()).unwrap_or_default();
        f.debug_struct("MemoryStore").field("records", &count).finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned(what: &str) -> StoreError {
        StoreError::Unavailable(format!("{what} lock poisoned"))
    }

    fn notify(&self, id: &str, record: &Record) {
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(guard) => guard
                .get(id)
                .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(record);
        }
    }
}

impl BattleStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned("records"))?;
        Ok(records.get(id).cloned())
    }

    fn insert(&self, id: &str, doc: Value) -> Result<u64, StoreError> {
        let record = {
            let mut records = self.records.write().map_err(|_| Self::poisoned("records"))?;
            if records.contains_key(id) {
                return Err(StoreError::AlreadyExists(id.to_string()));
            }
            let record = Record { version: 1, doc };
            records.insert(id.to_string(), record.clone());
            record
        };
        self.notify(id, &record);
        Ok(record.version)
    }

    fn compare_and_swap(&self, id: &str, expected: u64, doc: Value) -> Result<u64, StoreError> {
        let record = {
            let mut records = self.records.write().map_err(|_| Self::poisoned("records"))?;
            let current = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if current.version != expected {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    found: current.version,
                });
            }
            current.version += 1;
            current.doc = doc;
            current.clone()
        };
        self.notify(id, &record);
        Ok(record.version)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned("records"))?;
        Ok(records.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<(String, Record)>, StoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned("records"))?;
        Ok(records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }

    fn listen(&self, id: &str, listener: Listener) -> ListenerId {
        let listener_id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener = in_version_order(listener);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners
                .entry(id.to_string())
                .or_default()
                .push((listener_id, listener.clone()));
        }
        if let Ok(Some(record)) = self.get(id) {
            listener(&record);
        }
        listener_id
    }

    fn unlisten(&self, id: &str, listener: ListenerId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            if let Some(entries) = listeners.get_mut(id) {
                entries.retain(|(lid, _)| *lid != listener);
                if entries.is_empty() {
                    listeners.remove(id);
                }
            }
        }
    }
}

/// Wrap `listener` so it only ever sees strictly increasing versions. The initial snapshot
/// and concurrent writers' notifications can race; whichever arrives late is dropped.
fn in_version_order(listener: Listener) -> Listener {
    let delivered = Mutex::new(0u64);
    Arc::new(move |record: &Record| {
        let mut last = match delivered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if record.version > *last {
            *last = record.version;
            listener(record);
        }
    })
}
