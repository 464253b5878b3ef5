//! Append-only in-memory write-ahead log.

use crate::record::LogRecord;

/// An ordered, append-only sequence of log records.
///
/// Appends never reorder and the log is read back exactly in append
/// order. The log is in-memory only; it exists for idempotent replay
/// against a fresh catalog, not for crash durability.
#[derive(Debug, Default)]
pub struct WriteAheadLog {
    records: Vec<LogRecord>,
}

impl WriteAheadLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record to the end of the log.
    pub fn append(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    /// Returns all records in append order.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minidb_common::types::Value;

    #[test]
    fn test_log_starts_empty() {
        let log = WriteAheadLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.records().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = WriteAheadLog::new();

        log.append(LogRecord::begin(1));
        log.append(LogRecord::begin(2));
        log.append(LogRecord::insert(1, "users", vec![Value::Integer(10)]));
        log.append(LogRecord::insert(2, "users", vec![Value::Integer(20)]));
        log.append(LogRecord::commit(1));
        log.append(LogRecord::abort(2));

        assert_eq!(log.len(), 6);
        assert_eq!(log.records()[0], LogRecord::begin(1));
        assert_eq!(log.records()[4], LogRecord::commit(1));
        assert_eq!(log.records()[5], LogRecord::abort(2));
    }

    #[test]
    fn test_append_order_survives_interleaving() {
        let mut log = WriteAheadLog::new();
        for i in 0..100 {
            if i % 2 == 0 {
                log.append(LogRecord::begin(i));
            } else {
                log.append(LogRecord::commit(i - 1));
            }
        }

        for (i, record) in log.records().iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(*record, LogRecord::begin(i as u64));
            } else {
                assert_eq!(*record, LogRecord::commit(i as u64 - 1));
            }
        }
    }
}
