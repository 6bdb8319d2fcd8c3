//! RAII guards for page access.
//!
//! [`PageReadGuard`] and [`PageWriteGuard`] hold the entry's `frame_lock`
//! for the lifetime of the borrow and release the pin automatically on
//! drop, calling back into the pool exactly as `release_read`/
//! `release_write` would.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::pool::BufferPool;
use crate::common::PageId;

/// Shared read access to a page's bytes.
///
/// Multiple `PageReadGuard`s may exist for the same page at once. Dropping
/// the guard unpins the page and, if it is now unpinned, returns it to the
/// LRU.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    lock: RwLockReadGuard<'a, Option<Box<[u8]>>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        pool: &'a BufferPool,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Option<Box<[u8]>>>,
    ) -> Self {
        Self { pool, page_id, lock }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.lock
            .as_deref()
            .expect("resident page has a frame assigned")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pool.release_read_internal(self.page_id);
    }
}

/// Exclusive write access to a page's bytes.
///
/// `get_for_write` marks the page dirty up front (under `meta_lock`), since
/// a writer is assumed to mutate the frame. Dropping the guard unpins the
/// page and may submit a cleanup job.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    lock: RwLockWriteGuard<'a, Option<Box<[u8]>>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        pool: &'a BufferPool,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Option<Box<[u8]>>>,
    ) -> Self {
        Self { pool, page_id, lock }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.lock
            .as_deref()
            .expect("resident page has a frame assigned")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.lock
            .as_deref_mut()
            .expect("resident page has a frame assigned")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.pool.release_write_internal(self.page_id);
    }
}
