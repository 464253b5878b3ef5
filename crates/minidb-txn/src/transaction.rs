//! Transaction lifecycle management.

use minidb_common::{DbError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// States a transaction can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Hands out monotonic transaction ids and tracks each transaction's state.
///
/// Ids start at 1 and never repeat within one manager instance. Terminal
/// states stay queryable after commit/abort.
pub struct TransactionManager {
    /// Next transaction id to hand out.
    next_txn_id: AtomicU64,
    /// State of every transaction ever begun.
    states: Mutex<HashMap<u64, TransactionState>>,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    pub fn new() -> Self {
        Self {
            next_txn_id: AtomicU64::new(1),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Begins a new transaction and returns its id.
    pub fn begin(&self) -> u64 {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        self.states.lock().insert(txn_id, TransactionState::Active);
        txn_id
    }

    /// Commits an active transaction.
    pub fn commit(&self, txn_id: u64) -> Result<()> {
        self.transition(txn_id, TransactionState::Committed)
    }

    /// Aborts an active transaction.
    pub fn abort(&self, txn_id: u64) -> Result<()> {
        self.transition(txn_id, TransactionState::Aborted)
    }

    fn transition(&self, txn_id: u64, target: TransactionState) -> Result<()> {
        let mut states = self.states.lock();
        let state = states
            .get_mut(&txn_id)
            .ok_or(DbError::TransactionNotFound(txn_id))?;

        if *state != TransactionState::Active {
            return Err(DbError::TransactionNotActive(txn_id));
        }

        *state = target;
        Ok(())
    }

    /// Returns the state of a transaction, if it exists.
    pub fn state(&self, txn_id: u64) -> Option<TransactionState> {
        self.states.lock().get(&txn_id).copied()
    }

    /// Returns the number of currently active transactions.
    pub fn active_count(&self) -> usize {
        self.states
            .lock()
            .values()
            .filter(|s| **s == TransactionState::Active)
            .count()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
