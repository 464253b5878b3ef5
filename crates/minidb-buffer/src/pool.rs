//! Buffer pool manager.

use crate::disk::DiskManager;
use crate::frame::{Frame, FrameId};
use crate::replacer::{ClockReplacer, Replacer};
use minidb_common::page::{Page, PageId};
use minidb_common::{DbError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Buffer pool manager.
///
/// Caches a fixed number of pages of one data file in memory:
/// - page id to frame id mapping, at most one resident frame per page
/// - pin counting: a pinned frame is never evicted
/// - dirty tracking: a dirty victim is written to disk before reuse
/// - clock replacement among unpinned frames
pub struct BufferPool {
    /// Disk manager for the backing file.
    disk: DiskManager,
    /// Array of buffer frames.
    frames: Vec<Frame>,
    /// Page ID to frame ID mapping.
    page_table: Mutex<HashMap<PageId, FrameId>>,
    /// List of never-used frame IDs.
    free_list: Mutex<Vec<FrameId>>,
    /// Page replacement policy.
    replacer: ClockReplacer,
}

impl BufferPool {
    /// Creates a new buffer pool of `num_frames` frames over `disk`.
    pub fn new(disk: DiskManager, num_frames: usize) -> Self {
        assert!(num_frames > 0, "buffer pool requires at least one frame");

        let frames: Vec<_> = (0..num_frames)
            .map(|i| Frame::new(FrameId(i as u32)))
            .collect();

        // All frames start in the free list; popping from the back hands
        // out frame 0 first.
        let free_list: Vec<_> = (0..num_frames).rev().map(|i| FrameId(i as u32)).collect();

        Self {
            disk,
            frames,
            page_table: Mutex::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
        }
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of unused frames.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently resident.
    pub fn resident_count(&self) -> usize {
        self.page_table.lock().len()
    }

    /// Checks if a page is resident in the pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.lock().contains_key(&page_id)
    }

    /// Returns the underlying disk manager.
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    /// Fetches a page, reading it from disk on a miss.
    ///
    /// The returned frame is pinned; the caller must pair every fetch with
    /// an `unpin_page`. Fails with `NoFreeFrame` when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&Frame> {
        self.install_page(page_id, true)
    }

    /// Creates a fresh zero-filled page in the pool without touching disk.
    ///
    /// Used when appending a page to the file: the page does not exist on
    /// disk yet, so there is nothing to read. The caller must unpin it
    /// dirty so the image reaches disk before any later re-fetch.
    pub fn new_page(&self, page_id: PageId) -> Result<&Frame> {
        self.install_page(page_id, false)
    }

    fn install_page(&self, page_id: PageId, read_from_disk: bool) -> Result<&Frame> {
        let mut table = self.page_table.lock();

        if let Some(&frame_id) = table.get(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.record_access(frame_id);
            return Ok(frame);
        }

        let frame_id = self.allocate_frame(&mut table)?;
        let frame = &self.frames[frame_id.0 as usize];

        if read_from_disk {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                drop(data);
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        }

        frame.set_page_id(Some(page_id));
        frame.set_dirty(false);
        frame.pin();
        table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);

        Ok(frame)
    }

    /// Allocates a frame, evicting an unpinned page if necessary.
    ///
    /// The victim's page, if dirty, is written to disk before its mapping
    /// is removed. The returned frame is reset to the empty state.
    fn allocate_frame(&self, table: &mut HashMap<PageId, FrameId>) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        let victim_id = self
            .replacer
            .evict(&|fid| self.frames[fid.0 as usize].pin_count() == 0)
            .ok_or(DbError::NoFreeFrame)?;

        let frame = &self.frames[victim_id.0 as usize];
        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let data = frame.read_data();
                self.disk.write_page(old_page_id, &data)?;
            }
            table.remove(&old_page_id);
            debug!(page = %old_page_id, frame = victim_id.0, "evicted page");
        }

        frame.reset();
        Ok(victim_id)
    }

    /// Unpins a page, ORing in the dirty flag.
    ///
    /// The dirty flag is never cleared here. Unpinning a page that is not
    /// resident is a no-op.
    pub fn unpin_page(&self, page_id: PageId, dirty_now: bool) {
        let table = self.page_table.lock();
        if let Some(&frame_id) = table.get(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            if dirty_now {
                frame.set_dirty(true);
            }
            frame.unpin();
        }
    }

    /// Writes a resident page to disk.
    ///
    /// Fails with `PageNotFound` if the page is not resident. After a
    /// successful flush the on-disk image matches the in-memory page and
    /// the dirty flag is cleared.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let table = self.page_table.lock();
        let frame_id = table
            .get(&page_id)
            .copied()
            .ok_or(DbError::PageNotFound { page_id: page_id.0 })?;

        let frame = &self.frames[frame_id.0 as usize];
        let data = frame.read_data();
        self.disk.write_page(page_id, &data)?;
        frame.set_dirty(false);
        Ok(())
    }

    /// Writes every dirty resident page to disk.
    ///
    /// Returns the number of pages flushed.
    pub fn flush_all(&self) -> Result<usize> {
        let table = self.page_table.lock();
        let mut flushed = 0;

        for (&page_id, &frame_id) in table.iter() {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_dirty() {
                let data = frame.read_data();
                self.disk.write_page(page_id, &data)?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }

        Ok(flushed)
    }

    /// Fetches a page and returns an RAII read guard that unpins on drop.
    pub fn read_page(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageReadGuard {
            pool: self,
            page_id,
            frame,
        })
    }

    /// Fetches a page and returns an RAII write guard that unpins on drop.
    pub fn write_page(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageWriteGuard {
            pool: self,
            page_id,
            frame,
        })
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let table = self.page_table.lock();
        let mut pinned_frames = 0;
        let mut dirty_frames = 0;

        for &frame_id in table.values() {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_pinned() {
                pinned_frames += 1;
            }
            if frame.is_dirty() {
                dirty_frames += 1;
            }
        }

        BufferPoolStats {
            total_frames: self.frames.len(),
            free_frames: self.free_count(),
            resident_frames: table.len(),
            pinned_frames,
            dirty_frames,
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("num_frames", &self.frames.len())
            .field("resident", &self.resident_count())
            .finish()
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    /// Total number of frames.
    pub total_frames: usize,
    /// Number of never-used frames.
    pub free_frames: usize,
    /// Number of frames holding pages.
    pub resident_frames: usize,
    /// Number of pinned frames.
    pub pinned_frames: usize,
    /// Number of dirty frames.
    pub dirty_frames: usize,
}

/// RAII guard for reading a page; unpins (clean) on drop.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    frame: &'a Frame,
}

impl PageReadGuard<'_> {
    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the page data.
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Page> {
        self.frame.read_data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, false);
    }
}

/// RAII guard for writing a page; unpins on drop.
///
/// Callers that modify the page must call `set_dirty` before dropping.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    frame: &'a Frame,
}

impl PageWriteGuard<'_> {
    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns mutable access to the page data.
    pub fn data_mut(&self) -> parking_lot::RwLockWriteGuard<'_, Page> {
        self.frame.write_data()
    }

    /// Marks the page as dirty.
    pub fn set_dirty(&self) {
        self.frame.set_dirty(true);
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_pool(num_frames: usize) -> (BufferPool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let disk = DiskManager::open(dir.path().join("pool.db"), false).unwrap();
        (BufferPool::new(disk, num_frames), dir)
    }

    /// Seeds `count` pages on disk, each tagged with its page number.
    fn seed_pages(pool: &BufferPool, count: u32) {
        for i in 0..count {
            let mut page = Page::new();
            page.write(0, &[i as u8]);
            pool.disk().write_page(PageId::new(i), &page).unwrap();
        }
    }

    #[test]
    fn test_buffer_pool_new() {
        let (pool, _dir) = create_test_pool(10);

        assert_eq!(pool.num_frames(), 10);
        assert_eq!(pool.free_count(), 10);
        assert_eq!(pool.resident_count(), 0);
    }

    #[test]
    fn test_buffer_pool_fetch_reads_from_disk() {
        let (pool, _dir) = create_test_pool(10);
        seed_pages(&pool, 3);

        let frame = pool.fetch_page(PageId::new(2)).unwrap();
        assert_eq!(frame.read_data().read(0, 1), &[2]);
        assert!(frame.is_pinned());
        assert!(!frame.is_dirty());

        pool.unpin_page(PageId::new(2), false);
    }

    #[test]
    fn test_buffer_pool_fetch_cached_pins_again() {
        let (pool, _dir) = create_test_pool(10);
        seed_pages(&pool, 1);

        let page_id = PageId::new(0);
        pool.fetch_page(page_id).unwrap();
        let frame = pool.fetch_page(page_id).unwrap();

        assert_eq!(frame.pin_count(), 2);
        assert_eq!(pool.resident_count(), 1);

        pool.unpin_page(page_id, false);
        pool.unpin_page(page_id, false);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_buffer_pool_fetch_missing_page_fails() {
        let (pool, _dir) = create_test_pool(10);

        assert!(pool.fetch_page(PageId::new(5)).is_err());
        // The frame reserved for the failed read is reclaimed
        assert_eq!(pool.free_count(), 10);
    }

    #[test]
    fn test_buffer_pool_new_page_zeroed() {
        let (pool, _dir) = create_test_pool(10);

        let frame = pool.new_page(PageId::new(0)).unwrap();
        assert!(frame.read_data().as_bytes().iter().all(|&b| b == 0));
        assert!(frame.is_pinned());

        pool.unpin_page(PageId::new(0), true);
    }

    #[test]
    fn test_buffer_pool_unpin_dirty_is_sticky() {
        let (pool, _dir) = create_test_pool(10);
        seed_pages(&pool, 1);

        let page_id = PageId::new(0);
        pool.fetch_page(page_id).unwrap();
        pool.unpin_page(page_id, true);

        // A later clean unpin must not clear the dirty flag
        let frame = pool.fetch_page(page_id).unwrap();
        pool.unpin_page(page_id, false);
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_buffer_pool_unpin_unknown_page_is_noop() {
        let (pool, _dir) = create_test_pool(10);
        pool.unpin_page(PageId::new(99), true);
    }

    #[test]
    fn test_buffer_pool_eviction_writes_dirty_victim() {
        let (pool, _dir) = create_test_pool(1);

        // Dirty a fresh page in the single frame
        let frame = pool.new_page(PageId::new(0)).unwrap();
        frame.write_data().write(0, &[0xAB]);
        pool.unpin_page(PageId::new(0), true);

        // Loading another page evicts it, which must reach disk first
        pool.new_page(PageId::new(1)).unwrap();
        pool.unpin_page(PageId::new(1), true);

        let mut read = Page::new();
        pool.disk().read_page(PageId::new(0), &mut read).unwrap();
        assert_eq!(read.read(0, 1), &[0xAB]);

        // And the evicted page's contents survive a re-fetch
        let frame = pool.fetch_page(PageId::new(0)).unwrap();
        assert_eq!(frame.read_data().read(0, 1), &[0xAB]);
        pool.unpin_page(PageId::new(0), false);
    }

    #[test]
    fn test_buffer_pool_eviction_keeps_one_frame_per_page() {
        let (pool, _dir) = create_test_pool(2);
        seed_pages(&pool, 3);

        for i in 0..3 {
            pool.fetch_page(PageId::new(i)).unwrap();
            pool.unpin_page(PageId::new(i), false);
        }

        assert_eq!(pool.resident_count(), 2);
    }

    #[test]
    fn test_buffer_pool_all_pinned_no_free_frame() {
        let (pool, _dir) = create_test_pool(2);

        pool.new_page(PageId::new(0)).unwrap();
        pool.new_page(PageId::new(1)).unwrap();

        let result = pool.new_page(PageId::new(2));
        assert!(matches!(result, Err(DbError::NoFreeFrame)));

        // Unpinning one frame makes the fetch succeed
        pool.unpin_page(PageId::new(0), true);
        assert!(pool.new_page(PageId::new(2)).is_ok());
        pool.unpin_page(PageId::new(2), true);
    }

    #[test]
    fn test_buffer_pool_flush_page() {
        let (pool, _dir) = create_test_pool(4);

        let frame = pool.new_page(PageId::new(0)).unwrap();
        frame.write_data().write(0, &[0x42]);
        pool.unpin_page(PageId::new(0), true);

        pool.flush_page(PageId::new(0)).unwrap();

        let mut read = Page::new();
        pool.disk().read_page(PageId::new(0), &mut read).unwrap();
        assert_eq!(read.read(0, 1), &[0x42]);
    }

    #[test]
    fn test_buffer_pool_flush_nonresident_page_fails() {
        let (pool, _dir) = create_test_pool(4);

        let result = pool.flush_page(PageId::new(7));
        assert!(matches!(result, Err(DbError::PageNotFound { page_id: 7 })));
    }

    #[test]
    fn test_buffer_pool_flush_all() {
        let (pool, _dir) = create_test_pool(8);

        for i in 0..5 {
            pool.new_page(PageId::new(i)).unwrap();
            pool.unpin_page(PageId::new(i), i % 2 == 0);
        }

        // Pages 0, 2, 4 are dirty
        assert_eq!(pool.flush_all().unwrap(), 3);
        assert_eq!(pool.flush_all().unwrap(), 0);
    }

    #[test]
    fn test_buffer_pool_read_guard_unpins() {
        let (pool, _dir) = create_test_pool(4);
        seed_pages(&pool, 1);

        let page_id = PageId::new(0);
        {
            let guard = pool.read_page(page_id).unwrap();
            assert_eq!(guard.page_id(), page_id);
            assert_eq!(guard.data().read(0, 1), &[0]);
        }

        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.pin_count(), 1);
        pool.unpin_page(page_id, false);
    }

    #[test]
    fn test_buffer_pool_write_guard_marks_dirty() {
        let (pool, _dir) = create_test_pool(4);
        seed_pages(&pool, 1);

        let page_id = PageId::new(0);
        {
            let guard = pool.write_page(page_id).unwrap();
            guard.data_mut().write(0, &[0xFF]);
            guard.set_dirty();
        }

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(frame.is_dirty());
        assert_eq!(frame.read_data().read(0, 1), &[0xFF]);
        pool.unpin_page(page_id, false);
    }

    #[test]
    fn test_buffer_pool_stats() {
        let (pool, _dir) = create_test_pool(10);

        for i in 0..4 {
            pool.new_page(PageId::new(i)).unwrap();
        }
        pool.unpin_page(PageId::new(0), true);
        pool.unpin_page(PageId::new(1), false);

        let stats = pool.stats();
        assert_eq!(stats.total_frames, 10);
        assert_eq!(stats.free_frames, 6);
        assert_eq!(stats.resident_frames, 4);
        assert_eq!(stats.pinned_frames, 2);
        assert_eq!(stats.dirty_frames, 1);
    }
}
