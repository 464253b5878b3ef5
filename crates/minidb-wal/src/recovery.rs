//! WAL replay against a fresh catalog.

use crate::log::WriteAheadLog;
use crate::record::LogRecord;
use minidb_common::{DbError, Result};
use minidb_storage::{Catalog, Tuple};
use std::collections::HashSet;
use tracing::info;

/// Outcome of a recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Total log records scanned.
    pub records_scanned: usize,
    /// Transactions found committed.
    pub committed_txns: usize,
    /// Transactions found aborted.
    pub aborted_txns: usize,
    /// Rows re-inserted.
    pub rows_replayed: usize,
}

/// Replays a write-ahead log into `catalog`.
///
/// Two passes: the first collects the ids of committed transactions, the
/// second re-executes every insert belonging to one of them, building the
/// tuple from the logged values and the table's current schema. Aborted
/// and in-doubt transactions contribute nothing.
pub fn replay(wal: &WriteAheadLog, catalog: &mut Catalog) -> Result<RecoveryResult> {
    let mut committed: HashSet<u64> = HashSet::new();
    let mut aborted = 0usize;

    for record in wal.records() {
        match record {
            LogRecord::Commit { txn_id } => {
                committed.insert(*txn_id);
            }
            LogRecord::Abort { .. } => aborted += 1,
            _ => {}
        }
    }

    let mut rows_replayed = 0usize;
    for record in wal.records() {
        let LogRecord::Insert {
            txn_id,
            table,
            values,
        } = record
        else {
            continue;
        };
        if !committed.contains(txn_id) {
            continue;
        }

        let table = catalog
            .table_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.clone()))?;

        let schema = table.schema().clone();
        if values.len() != schema.len() {
            return Err(DbError::ColumnCountMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }

        table.insert(&Tuple::new(values.clone(), schema))?;
        rows_replayed += 1;
    }

    let result = RecoveryResult {
        records_scanned: wal.len(),
        committed_txns: committed.len(),
        aborted_txns: aborted,
        rows_replayed,
    };
    info!(
        records = result.records_scanned,
        committed = result.committed_txns,
        rows = result.rows_replayed,
        "recovery replay complete"
    );
    Ok(result)
}
