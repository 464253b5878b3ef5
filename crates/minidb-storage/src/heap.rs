//! Heap file: a multi-page record store with buffer pool integration.
//!
//! Pages are fetched from the pool, modified in place under a pin, marked
//! dirty, and written back lazily on flush or eviction.

use crate::slotted::SlottedPage;
use crate::tuple::Tuple;
use minidb_buffer::pool::PageReadGuard;
use minidb_buffer::BufferPool;
use minidb_common::page::{PageId, Rid};
use minidb_common::{DbError, Result};
use minidb_txn::{LockManager, LockMode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::trace;

/// An unordered sequence of slotted pages storing one table's rows.
///
/// Page 0 always exists after initialization and records never span
/// pages. When a session has a transaction open it binds the transaction
/// here, and reads/writes then go through the lock manager.
pub struct HeapFile {
    /// Buffer pool over this table's data file.
    pool: Arc<BufferPool>,
    /// Record lock manager.
    locks: Arc<LockManager>,
    /// Number of pages in the file.
    page_count: AtomicU32,
    /// Transaction currently bound to this heap, if any.
    current_txn: Mutex<Option<u64>>,
}

impl HeapFile {
    /// Opens a heap file over `pool`, initializing page 0 if the backing
    /// file is empty.
    pub fn new(pool: Arc<BufferPool>, locks: Arc<LockManager>) -> Result<Self> {
        let existing = pool.disk().num_pages()?;
        let heap = Self {
            pool,
            locks,
            page_count: AtomicU32::new(existing.max(1)),
            current_txn: Mutex::new(None),
        };

        if existing == 0 {
            let frame = heap.pool.new_page(PageId::new(0))?;
            {
                let mut data = frame.write_data();
                SlottedPage::init_in_slice(data.as_bytes_mut());
            }
            heap.pool.unpin_page(PageId::new(0), true);
        }

        Ok(heap)
    }

    /// Returns the number of pages in the file.
    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::Acquire)
    }

    /// Binds (or unbinds) a transaction to this heap.
    pub fn bind_txn(&self, txn_id: Option<u64>) {
        *self.current_txn.lock() = txn_id;
    }

    /// Returns the currently bound transaction.
    pub fn current_txn(&self) -> Option<u64> {
        *self.current_txn.lock()
    }

    /// Returns the buffer pool backing this heap.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Inserts a tuple, returning its record id.
    ///
    /// Pages are tried in order; the first page with room takes the
    /// record, otherwise a fresh page is appended. With a bound
    /// transaction an exclusive lock on the new RID is acquired after the
    /// write, and a conflict surfaces to the caller.
    pub fn insert(&self, tuple: &Tuple) -> Result<Rid> {
        let record = tuple.serialize();
        let rid = self.insert_record(&record)?;

        if let Some(txn_id) = self.current_txn() {
            self.locks.acquire(txn_id, rid, LockMode::Exclusive)?;
        }

        Ok(rid)
    }

    fn insert_record(&self, record: &[u8]) -> Result<Rid> {
        for page_no in 0..self.page_count() {
            let page_id = PageId::new(page_no);
            let frame = self.pool.fetch_page(page_id)?;
            let inserted = {
                let mut data = frame.write_data();
                SlottedPage::insert_in_slice(data.as_bytes_mut(), record)
            };

            match inserted {
                Ok(slot_id) => {
                    self.pool.unpin_page(page_id, true);
                    return Ok(Rid::new(page_no as u16, slot_id));
                }
                Err(DbError::NotEnoughFreeSpace { .. }) => {
                    self.pool.unpin_page(page_id, false);
                }
                Err(e) => {
                    self.pool.unpin_page(page_id, false);
                    return Err(e);
                }
            }
        }

        // Every existing page is full: append a new one.
        let page_no = self.page_count();
        let page_id = PageId::new(page_no);
        let frame = self.pool.new_page(page_id)?;
        let inserted = {
            let mut data = frame.write_data();
            SlottedPage::init_in_slice(data.as_bytes_mut());
            SlottedPage::insert_in_slice(data.as_bytes_mut(), record)
        };
        self.pool.unpin_page(page_id, true);
        self.page_count.store(page_no + 1, Ordering::Release);
        trace!(page = page_no, "appended heap page");

        let slot_id = inserted?;
        Ok(Rid::new(page_no as u16, slot_id))
    }

    /// Returns the record bytes stored under `rid`, or `None` for RIDs
    /// past the end of the file or dead slots.
    ///
    /// With a bound transaction a shared lock is attempted; a lock
    /// conflict is deliberately discarded so that reads never fail on
    /// contention (flagged for review, see DESIGN.md).
    pub fn get(&self, rid: Rid) -> Result<Option<Vec<u8>>> {
        if rid.page_id as u32 >= self.page_count() {
            return Ok(None);
        }

        let page_id = PageId::new(rid.page_id as u32);
        let frame = self.pool.fetch_page(page_id)?;
        let record = {
            let data = frame.read_data();
            SlottedPage::get_in_slice(data.as_bytes(), rid.slot_id).map(|b| b.to_vec())
        };
        self.pool.unpin_page(page_id, false);

        if record.is_some() {
            if let Some(txn_id) = self.current_txn() {
                if let Err(e) = self.locks.acquire(txn_id, rid, LockMode::Shared) {
                    match e {
                        DbError::LockConflict { .. } => {}
                        other => return Err(other),
                    }
                }
            }
        }

        Ok(record)
    }

    /// Deletes the record under `rid`. A no-op for RIDs past the end of
    /// the file or already-dead slots.
    pub fn delete(&self, rid: Rid) -> Result<()> {
        if rid.page_id as u32 >= self.page_count() {
            return Ok(());
        }

        let page_id = PageId::new(rid.page_id as u32);
        let frame = self.pool.fetch_page(page_id)?;
        let deleted = {
            let mut data = frame.write_data();
            SlottedPage::delete_in_slice(data.as_bytes_mut(), rid.slot_id)
        };
        self.pool.unpin_page(page_id, deleted);

        Ok(())
    }

    /// Returns an iterator over all live records in page, then slot order.
    ///
    /// The iterator keeps the page it is positioned on pinned and unpins
    /// it when advancing to the next page or when dropped.
    pub fn scan(&self) -> HeapScan<'_> {
        HeapScan {
            heap: self,
            page_no: 0,
            slot: 0,
            guard: None,
            done: false,
        }
    }

    /// Flushes all dirty pages of this heap to disk.
    pub fn flush(&self) -> Result<usize> {
        self.pool.flush_all()
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("page_count", &self.page_count())
            .field("current_txn", &self.current_txn())
            .finish()
    }
}

/// Forward iterator over the live records of a heap file.
pub struct HeapScan<'a> {
    heap: &'a HeapFile,
    page_no: u32,
    slot: u16,
    guard: Option<PageReadGuard<'a>>,
    done: bool,
}

impl Iterator for HeapScan<'_> {
    type Item = Result<(Rid, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.page_no >= self.heap.page_count() {
                self.guard = None;
                self.done = true;
                return None;
            }

            if self.guard.is_none() {
                match self.heap.pool.read_page(PageId::new(self.page_no)) {
                    Ok(guard) => self.guard = Some(guard),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            let mut found = None;
            {
                let guard = self.guard.as_ref().unwrap();
                let data = guard.data();
                let directory_len = SlottedPage::directory_len_in_slice(data.as_bytes()) as u16;

                while self.slot < directory_len {
                    let slot_id = self.slot;
                    self.slot += 1;
                    if let Some(bytes) = SlottedPage::get_in_slice(data.as_bytes(), slot_id) {
                        found = Some((Rid::new(self.page_no as u16, slot_id), bytes.to_vec()));
                        break;
                    }
                }
            }

            match found {
                Some(item) => return Some(Ok(item)),
                None => {
                    // Page exhausted; unpin it and move on.
                    self.guard = None;
                    self.page_no += 1;
                    self.slot = 0;
                }
            }
        }
    }
}
