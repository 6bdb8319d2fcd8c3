//! The unified error type for the buffer pool crate.

use crate::common::PageId;

/// Errors that can arise while opening or operating a buffer pool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The heap file could not be opened, read, written, or extended.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A page was requested that does not exist in the heap file. The
    /// buffer pool's own fault path never returns this: a miss always
    /// extends or reads through the page table instead of rejecting the
    /// request, so callers working purely through [`crate::BufferPool`]
    /// should not expect to see it. Reserved for lower-level callers that
    /// address the heap file directly.
    #[error("page {0} not found")]
    NotFound(PageId),

    /// Every frame in the pool is pinned; no victim is available and none
    /// will become available in time.
    #[error("buffer pool exhausted: no frame available for eviction")]
    ResourceExhausted,

    /// An invariant was violated in a way callers cannot recover from.
    #[error("fatal buffer pool error: {0}")]
    Fatal(String),
}

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;
