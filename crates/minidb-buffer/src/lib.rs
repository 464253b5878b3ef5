//! Disk manager and buffer pool for MiniDB.
//!
//! All page I/O goes through a [`BufferPool`]: pages are fetched into
//! pinned frames, modified in place, marked dirty, and written back on
//! flush or eviction.

pub mod disk;
pub mod frame;
pub mod pool;
pub mod replacer;

pub use disk::DiskManager;
pub use frame::{Frame, FrameId};
pub use pool::{BufferPool, BufferPoolStats, PageReadGuard, PageWriteGuard};
pub use replacer::{ClockReplacer, Replacer};
