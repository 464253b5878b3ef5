//! MiniDB storage engine: slotted pages, heap files, B+Tree indexes,
//! tables, and the catalog.
//!
//! Rows flow bottom-up: a scan pulls records from a table's heap through
//! the buffer pool page by page, while writes go through `Table::insert`,
//! which also feeds every index and, under a bound transaction, the lock
//! manager.

pub mod btree;
pub mod catalog;
pub mod heap;
pub mod slotted;
pub mod table;
pub mod tuple;

pub use btree::{BTree, BTreeNode, MAX_KEYS};
pub use catalog::Catalog;
pub use heap::{HeapFile, HeapScan};
pub use slotted::SlottedPage;
pub use table::Table;
pub use tuple::Tuple;
