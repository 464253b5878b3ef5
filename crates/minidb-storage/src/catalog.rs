//! Catalog: the name-to-table registry.

use crate::table::Table;
use minidb_buffer::{BufferPool, DiskManager};
use minidb_common::types::Schema;
use minidb_common::{Result, StorageConfig};
use minidb_txn::LockManager;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owns every table and the shared lock manager.
///
/// Each table gets its own disk manager and buffer pool over
/// `<data_dir>/<table_name>.db`.
pub struct Catalog {
    /// Storage configuration used when creating tables.
    config: StorageConfig,
    /// Lock manager shared by all heaps.
    locks: Arc<LockManager>,
    /// Registered tables by name.
    tables: HashMap<String, Table>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            locks: Arc::new(LockManager::new()),
            tables: HashMap::new(),
        }
    }

    /// Returns the shared lock manager.
    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Creates a table under `name` with a deep copy of `schema`.
    ///
    /// Registering a duplicate name replaces the previous table; avoiding
    /// that is the caller's responsibility.
    pub fn create_table(&mut self, name: &str, schema: &Schema) -> Result<()> {
        let path = self.config.data_dir.join(format!("{}.db", name));
        let disk = DiskManager::open(path, self.config.fsync_enabled)?;
        let pool = Arc::new(BufferPool::new(disk, self.config.buffer_pool_frames));
        let table = Table::new(name, schema.clone(), pool, self.locks.clone())?;

        debug!(table = name, columns = schema.len(), "created table");
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Returns the table registered under `name`.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the table registered under `name`, mutably.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Returns the names of all registered tables.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    /// Returns the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no table is registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("tables", &self.tables.len())
            .field("data_dir", &self.config.data_dir)
            .finish()
    }
}
