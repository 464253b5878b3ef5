//! Per-record shared/exclusive locking.

use minidb_common::page::Rid;
use minidb_common::{DbError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Lock state for one record.
///
/// Invariant: an exclusive entry has exactly one holder; a shared entry
/// has at least one. An entry with no holders is removed.
#[derive(Debug)]
struct LockEntry {
    mode: LockMode,
    holders: HashSet<u64>,
}

/// Grants shared/exclusive locks keyed by record id.
///
/// Conflicts fail immediately with `LockConflict`; the manager never
/// blocks or queues waiters.
pub struct LockManager {
    entries: Mutex<HashMap<Rid, LockEntry>>,
}

impl LockManager {
    /// Creates a new lock manager.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires a lock on `rid` for `txn_id`.
    ///
    /// Re-acquisition by a current holder succeeds without upgrading the
    /// mode. Two shared requests are compatible; every other combination
    /// conflicts.
    pub fn acquire(&self, txn_id: u64, rid: Rid, mode: LockMode) -> Result<()> {
        let mut entries = self.entries.lock();

        match entries.get_mut(&rid) {
            None => {
                let mut holders = HashSet::new();
                holders.insert(txn_id);
                entries.insert(rid, LockEntry { mode, holders });
                Ok(())
            }
            Some(entry) => {
                if entry.holders.contains(&txn_id) {
                    return Ok(());
                }
                if entry.mode == LockMode::Shared && mode == LockMode::Shared {
                    entry.holders.insert(txn_id);
                    return Ok(());
                }
                Err(DbError::LockConflict { rid })
            }
        }
    }

    /// Releases `txn_id`'s lock on `rid`, dropping the entry if it empties.
    pub fn release(&self, txn_id: u64, rid: Rid) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&rid) {
            entry.holders.remove(&txn_id);
            if entry.holders.is_empty() {
                entries.remove(&rid);
            }
        }
    }

    /// Releases every lock held by `txn_id`.
    pub fn release_all(&self, txn_id: u64) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| {
            entry.holders.remove(&txn_id);
            !entry.holders.is_empty()
        });
    }

    /// Returns true if any lock is held on `rid`.
    pub fn is_locked(&self, rid: Rid) -> bool {
        self.entries.lock().contains_key(&rid)
    }

    /// Returns the number of holders on `rid`.
    pub fn holder_count(&self, rid: Rid) -> usize {
        self.entries
            .lock()
            .get(&rid)
            .map(|e| e.holders.len())
            .unwrap_or(0)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
