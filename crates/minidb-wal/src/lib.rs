//! Write-ahead log for MiniDB.
//!
//! The log is an in-memory, append-only record of transaction effects,
//! read back in append order. Replaying it against a fresh catalog
//! restores exactly the rows of committed transactions.

pub mod log;
pub mod record;
pub mod recovery;

pub use log::WriteAheadLog;
pub use record::LogRecord;
pub use recovery::{replay, RecoveryResult};
