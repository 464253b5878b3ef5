//! Configuration structures for MiniDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the database engine.
///
/// Each table stores its heap in `<data_dir>/<table_name>.db` behind a
/// buffer pool of `buffer_pool_frames` frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for table data files.
    pub data_dir: PathBuf,
    /// Buffer pool size per table, in frames.
    pub buffer_pool_frames: usize,
    /// Enable fsync after page writes.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            buffer_pool_frames: 64,
            fsync_enabled: true,
        }
    }
}
