//! WAL log record format.

use minidb_common::types::Value;
use serde::{Deserialize, Serialize};

/// A single log record.
///
/// Records capture transaction boundaries and the logical effect of every
/// transactional insert, enough for an idempotent replay against a fresh
/// catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    /// Transaction begin.
    Begin { txn_id: u64 },
    /// A row inserted into `table` by `txn_id`.
    Insert {
        txn_id: u64,
        table: String,
        values: Vec<Value>,
    },
    /// Transaction commit.
    Commit { txn_id: u64 },
    /// Transaction abort.
    Abort { txn_id: u64 },
}

impl LogRecord {
    /// Creates a transaction begin record.
    pub fn begin(txn_id: u64) -> Self {
        LogRecord::Begin { txn_id }
    }

    /// Creates an insert record.
    pub fn insert(txn_id: u64, table: impl Into<String>, values: Vec<Value>) -> Self {
        LogRecord::Insert {
            txn_id,
            table: table.into(),
            values,
        }
    }

    /// Creates a transaction commit record.
    pub fn commit(txn_id: u64) -> Self {
        LogRecord::Commit { txn_id }
    }

    /// Creates a transaction abort record.
    pub fn abort(txn_id: u64) -> Self {
        LogRecord::Abort { txn_id }
    }

    /// Returns the transaction id this record belongs to.
    pub fn txn_id(&self) -> u64 {
        match self {
            LogRecord::Begin { txn_id }
            | LogRecord::Insert { txn_id, .. }
            | LogRecord::Commit { txn_id }
            | LogRecord::Abort { txn_id } => *txn_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_constructors() {
        assert_eq!(LogRecord::begin(1), LogRecord::Begin { txn_id: 1 });
        assert_eq!(LogRecord::commit(2), LogRecord::Commit { txn_id: 2 });
        assert_eq!(LogRecord::abort(3), LogRecord::Abort { txn_id: 3 });

        let insert = LogRecord::insert(4, "users", vec![Value::Integer(1)]);
        assert_eq!(
            insert,
            LogRecord::Insert {
                txn_id: 4,
                table: "users".to_string(),
                values: vec![Value::Integer(1)],
            }
        );
    }

    #[test]
    fn test_record_txn_id() {
        assert_eq!(LogRecord::begin(7).txn_id(), 7);
        assert_eq!(LogRecord::insert(8, "t", vec![]).txn_id(), 8);
        assert_eq!(LogRecord::commit(9).txn_id(), 9);
        assert_eq!(LogRecord::abort(10).txn_id(), 10);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let records = vec![
            LogRecord::begin(1),
            LogRecord::insert(
                1,
                "users",
                vec![
                    Value::Integer(10),
                    Value::Text("Alice".to_string()),
                    Value::Null,
                ],
            ),
            LogRecord::commit(1),
            LogRecord::abort(2),
        ];

        for record in records {
            let serialized = serde_json::to_string(&record).unwrap();
            let deserialized: LogRecord = serde_json::from_str(&serialized).unwrap();
            assert_eq!(record, deserialized);
        }
    }
}
