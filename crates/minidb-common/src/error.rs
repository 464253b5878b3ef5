//! Error types for MiniDB.

use crate::page::Rid;
use thiserror::Error;

/// Result type alias using DbError.
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors that can occur in MiniDB operations.
#[derive(Debug, Error)]
pub enum DbError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Storage errors
    #[error("not enough free space on page: need {needed} bytes, have {available}")]
    NotEnoughFreeSpace { needed: usize, available: usize },

    #[error("no free frame in buffer pool: all frames pinned")]
    NoFreeFrame,

    #[error("page not resident in buffer pool: {page_id}")]
    PageNotFound { page_id: u32 },

    // Catalog / planner errors
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    // Lock manager errors
    #[error("lock conflict on record {rid}")]
    LockConflict { rid: Rid },

    // Transaction errors
    #[error("transaction {0} is not active")]
    TransactionNotActive(u64),

    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),

    #[error("a transaction is already in progress")]
    TransactionAlreadyExist,

    #[error("no transaction in progress")]
    TransactionNotExist,

    // Parser errors
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}
