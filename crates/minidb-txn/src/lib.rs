//! Transaction lifecycle and record locking for MiniDB.
//!
//! The lock manager is a correctness primitive for a future multi-session
//! design; in the single-threaded execution model it reports conflicts
//! deterministically and never blocks.

pub mod lock;
pub mod transaction;

pub use lock::{LockManager, LockMode};
pub use transaction::{TransactionManager, TransactionState};
