//! Disk manager for page-level file I/O.

use minidb_common::page::{Page, PageId, PAGE_SIZE};
use minidb_common::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Manages reading and writing pages of a single data file.
///
/// Logical page id `n` lives at file offset `n * PAGE_SIZE`. The file is
/// opened read/write without truncation, so an existing database file is
/// picked up as-is. Writing past the current end of the file extends it;
/// reading a page past end-of-file is the caller's responsibility to avoid.
pub struct DiskManager {
    /// Open file handle.
    file: Mutex<File>,
    /// Path to the file.
    path: PathBuf,
    /// Whether to fsync after every write.
    fsync_enabled: bool,
}

impl DiskManager {
    /// Opens (or creates) the data file at `path`.
    pub fn open(path: impl Into<PathBuf>, fsync_enabled: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            fsync_enabled,
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of whole pages currently in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock();
        let len = file.metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as u32)
    }

    /// Reads the page at `page_id`, filling all of `page`.
    pub fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset()))?;
        file.read_exact(page.as_bytes_mut())?;
        Ok(())
    }

    /// Writes all of `page` at `page_id`, extending the file if needed.
    pub fn write_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset()))?;
        file.write_all(page.as_bytes())?;

        if self.fsync_enabled {
            file.sync_all()?;
        }

        Ok(())
    }

    /// Flushes pending writes to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("path", &self.path)
            .field("fsync_enabled", &self.fsync_enabled)
            .finish()
    }
}
