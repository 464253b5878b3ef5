//! A table: schema, heap storage, and per-column indexes.

use crate::btree::BTree;
use crate::heap::HeapFile;
use crate::tuple::Tuple;
use minidb_buffer::BufferPool;
use minidb_common::page::Rid;
use minidb_common::types::{DataType, Schema, SchemaRef, Value};
use minidb_common::{DbError, Result};
use minidb_txn::LockManager;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A table owning its schema, heap file, and B+Tree indexes.
///
/// Every insert goes through the heap first and then feeds each index, so
/// indexes always reflect the heap's live rows.
pub struct Table {
    /// Table name.
    name: String,
    /// Owned schema.
    schema: SchemaRef,
    /// Row storage.
    heap: HeapFile,
    /// Column name to index.
    indexes: HashMap<String, BTree>,
}

impl Table {
    /// Creates a table over its own buffer pool and the shared lock
    /// manager.
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        pool: Arc<BufferPool>,
        locks: Arc<LockManager>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            schema: Arc::new(schema),
            heap: HeapFile::new(pool, locks)?,
            indexes: HashMap::new(),
        })
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table's schema.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Returns the heap file.
    pub fn heap(&self) -> &HeapFile {
        &self.heap
    }

    /// Returns the index on `column`, if one exists.
    pub fn index(&self, column: &str) -> Option<&BTree> {
        self.indexes.get(column)
    }

    /// Returns the names of all indexed columns.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(|s| s.as_str())
    }

    /// Inserts a tuple into the heap and every index.
    ///
    /// A NULL in an indexed column contributes no index entry.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<Rid> {
        let rid = self.heap.insert(tuple)?;

        for (column, btree) in self.indexes.iter_mut() {
            let idx = self
                .schema
                .column_index(column)
                .ok_or_else(|| DbError::ColumnNotFound(column.clone()))?;
            if let Value::Integer(key) = tuple.value(idx) {
                btree.insert(*key, rid);
            }
        }

        Ok(rid)
    }

    /// Builds an index on `column`, backfilling it from the heap.
    ///
    /// Only integer columns are indexable; requests for other types are
    /// silently ignored. An existing index on the column is rebuilt.
    pub fn create_index(&mut self, column: &str) -> Result<()> {
        let idx = self
            .schema
            .column_index(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))?;

        if self.schema.column(idx).data_type != DataType::Integer {
            return Ok(());
        }

        let mut btree = BTree::new();
        for item in self.heap.scan() {
            let (rid, bytes) = item?;
            let tuple = Tuple::deserialize(&bytes, self.schema.clone()).ok_or_else(|| {
                DbError::Internal(format!("corrupt record {} in table {}", rid, self.name))
            })?;
            if let Value::Integer(key) = tuple.value(idx) {
                btree.insert(*key, rid);
            }
        }

        debug!(table = %self.name, column, "built index");
        self.indexes.insert(column.to_string(), btree);
        Ok(())
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.schema.len())
            .field("indexes", &self.indexes.len())
            .finish()
    }
}
