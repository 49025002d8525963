//! Optimistic read-modify-write over a single battle document.
//!
//! The body sees a freshly decoded [`Battle`] on every attempt. If the compare-and-swap loses a
//! race the whole body runs again against the newer record, so it must derive every effect
//! from the battle it is handed and hold no side effects of its own.

use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::battle::Battle;
use crate::store::{strip_nulls, BattleStore, StoreError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

/// What the transaction body decided.
#[derive(Debug)]
pub enum Step<R> {
    /// Write the mutated battle back, then return the value.
    Commit(R),
    /// Return the value without writing.
    Skip(R),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause before attempt `n` is `backoff * n`, capped at 10 ms.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_micros(50),
        }
    }
}

impl RetryPolicy {
    fn pause(&self, attempt: u32) {
        if attempt <= 1 || self.backoff.is_zero() {
            thread::yield_now();
            return;
        }
        let wait = self.backoff.saturating_mul(attempt).min(Duration::from_millis(10));
        thread::sleep(wait);
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("gave up after {attempts} conflicting attempts on '{id}'")]
    Contention { id: String, attempts: u32 },
    #[error("stored battle '{id}' could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("battle could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Encode a battle into the document shape the store accepts.
pub fn encode(battle: &Battle) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(battle).map(strip_nulls)
}

pub fn decode(id: &str, doc: serde_json::Value) -> Result<Battle, TransactionError> {
    serde_json::from_value(doc).map_err(|source| TransactionError::Decode {
        id: id.to_string(),
        source,
    })
}

/// Run `body` against battle `id` until it commits without conflict.
///
/// Returns `Ok(None)` when the battle does not exist (or disappears mid-transaction).
pub fn run_transaction<R, F>(
    store: &dyn BattleStore,
    id: &str,
    policy: RetryPolicy,
    mut body: F,
) -> Result<Option<R>, TransactionError>
where
    F: FnMut(&mut Battle) -> Step<R>,
{
    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let Some(record) = store.get(id)? else {
            return Ok(None);
        };
        let mut battle = decode(id, record.doc)?;
        battle.version = record.version;

        let value = match body(&mut battle) {
            Step::Skip(value) => return Ok(Some(value)),
            Step::Commit(value) => value,
        };

        battle.version = record.version + 1;
        let doc = encode(&battle).map_err(TransactionError::Encode)?;
        match store.compare_and_swap(id, record.version, doc) {
            Ok(_) => return Ok(Some(value)),
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(battle_id = id, attempt, "write conflict, retrying");
                policy.pause(attempt);
            }
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    }

    tracing::warn!(battle_id = id, attempts = max_attempts, "transaction retry budget exhausted");
    Err(TransactionError::Contention {
        id: id.to_string(),
        attempts: max_attempts,
    })
}
