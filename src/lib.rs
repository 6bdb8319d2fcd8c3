//! A concurrent buffer pool manager for a disk-backed heap file.
//!
//! [`BufferPool`] is a fixed-capacity in-memory cache of fixed-size pages
//! with LRU-driven eviction, concurrent readers and writers per page, and
//! an asynchronous I/O dispatcher that services page faults and dirty-page
//! writebacks off the caller's thread.
//!
//! ```no_run
//! use bufferpool::{BufferPool, BufferPoolConfig, PageId};
//!
//! # fn main() -> bufferpool::Result<()> {
//! let config = BufferPoolConfig::new("heap.db", 64, 8);
//! let pool = BufferPool::open(config)?;
//!
//! let page_id = pool.allocate_new_page()?;
//! {
//!     let mut guard = pool.get_for_write(page_id);
//!     guard[..5].copy_from_slice(b"hello");
//! }
//! {
//!     let guard = pool.get_for_read(page_id);
//!     assert_eq!(&guard[..5], b"hello");
//! }
//!
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Non-goals
//! Transactions, crash recovery, write-ahead logging, multi-file databases,
//! compression, and any record- or index-level structure on top of pages
//! are out of scope; this crate manages page residency and I/O only.

pub mod buffer;
pub mod common;
pub mod storage;

pub use buffer::{BufferPool, BufferPoolStats, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use common::{BufferPoolConfig, Error, FrameId, PageId, Result};
pub use storage::DiskFile;
