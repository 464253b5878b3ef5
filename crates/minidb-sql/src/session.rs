//! Session: statement dispatch, transaction binding, and WAL emission.

use crate::ast::Statement;
use crate::parser;
use crate::planner;
use minidb_common::types::Value;
use minidb_common::{DbError, Result};
use minidb_storage::{Catalog, Tuple};
use minidb_txn::TransactionManager;
use minidb_wal::{LogRecord, WriteAheadLog};
use thiserror::Error;
use tracing::debug;

/// The successful outcome of one statement.
#[derive(Debug)]
pub enum StatementResult {
    TableCreated { table: String },
    IndexCreated { index: String, table: String },
    RowInserted,
    Select { rows: Vec<Tuple> },
    TransactionStarted { txn_id: u64 },
    TransactionCommitted { txn_id: u64 },
    TransactionAborted { txn_id: u64 },
}

/// A failed statement, tagged by the stage that rejected it.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Parse error: {0}")]
    Parse(DbError),
    #[error("Error: {0}")]
    Execute(DbError),
}

/// One client session over a catalog.
///
/// Owns the transaction manager and the WAL; at most one transaction is
/// open at a time. `execute` never panics: every statement yields either
/// a [`StatementResult`] or an [`ExecuteError`].
pub struct Session<'a> {
    catalog: &'a mut Catalog,
    txn_manager: TransactionManager,
    wal: WriteAheadLog,
    current_txn: Option<u64>,
}

impl<'a> Session<'a> {
    /// Creates a session over `catalog`.
    pub fn new(catalog: &'a mut Catalog) -> Self {
        Self {
            catalog,
            txn_manager: TransactionManager::new(),
            wal: WriteAheadLog::new(),
            current_txn: None,
        }
    }

    /// Returns the session's write-ahead log.
    pub fn wal(&self) -> &WriteAheadLog {
        &self.wal
    }

    /// Returns the open transaction, if any.
    pub fn current_txn(&self) -> Option<u64> {
        self.current_txn
    }

    /// Parses and executes one statement.
    pub fn execute(&mut self, sql: &str) -> std::result::Result<StatementResult, ExecuteError> {
        let statement = parser::parse_statement(sql).map_err(ExecuteError::Parse)?;
        debug!(?statement, "executing statement");
        self.run(statement).map_err(ExecuteError::Execute)
    }

    fn run(&mut self, statement: Statement) -> Result<StatementResult> {
        match statement {
            Statement::Begin => self.begin(),
            Statement::Commit => self.finish(true),
            Statement::Abort => self.finish(false),
            Statement::Insert { table, values } => self.insert(table, values),
            Statement::Select(stmt) => {
                let mut plan = planner::build_select(self.catalog, &stmt)?;
                let mut rows = Vec::new();
                while let Some(tuple) = plan.root.next()? {
                    rows.push(tuple);
                }
                Ok(StatementResult::Select { rows })
            }
            Statement::CreateTable { name, columns } => {
                planner::execute_create_table(self.catalog, &name, &columns)?;
                Ok(StatementResult::TableCreated { table: name })
            }
            Statement::CreateIndex {
                index_name,
                table,
                column,
            } => {
                planner::execute_create_index(self.catalog, &table, &column)?;
                Ok(StatementResult::IndexCreated {
                    index: index_name,
                    table,
                })
            }
        }
    }

    fn begin(&mut self) -> Result<StatementResult> {
        if self.current_txn.is_some() {
            return Err(DbError::TransactionAlreadyExist);
        }

        let txn_id = self.txn_manager.begin();
        self.wal.append(LogRecord::begin(txn_id));
        self.current_txn = Some(txn_id);
        Ok(StatementResult::TransactionStarted { txn_id })
    }

    fn finish(&mut self, commit: bool) -> Result<StatementResult> {
        let txn_id = self.current_txn.ok_or(DbError::TransactionNotExist)?;

        if commit {
            self.txn_manager.commit(txn_id)?;
            self.wal.append(LogRecord::commit(txn_id));
        } else {
            self.txn_manager.abort(txn_id)?;
            self.wal.append(LogRecord::abort(txn_id));
        }

        self.catalog.lock_manager().release_all(txn_id);
        self.current_txn = None;

        if commit {
            Ok(StatementResult::TransactionCommitted { txn_id })
        } else {
            Ok(StatementResult::TransactionAborted { txn_id })
        }
    }

    fn insert(&mut self, table: String, values: Vec<Value>) -> Result<StatementResult> {
        if let Some(t) = self.catalog.table(&table) {
            t.heap().bind_txn(self.current_txn);
        }
        let inserted = planner::execute_insert(self.catalog, &table, &values);
        if let Some(t) = self.catalog.table(&table) {
            t.heap().bind_txn(None);
        }
        inserted?;

        if let Some(txn_id) = self.current_txn {
            self.wal.append(LogRecord::insert(txn_id, table, values));
        }
        Ok(StatementResult::RowInserted)
    }
}

/// Decodes select rows into plain value vectors, a convenience for
/// result rendering and tests.
pub fn rows_to_values(rows: &[Tuple]) -> Vec<Vec<Value>> {
    rows.iter().map(|t| t.values().to_vec()).collect()
}
