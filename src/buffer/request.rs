//! A pending page fault and its completion handle.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::buffer::page_entry::PageEntry;
use crate::common::PageId;

/// A page fault waiting to be serviced by the I/O dispatcher.
///
/// One `PageRequest` may have multiple owners: if several callers fault on
/// the same page-id concurrently, [`crate::buffer::prioritizer::RequestPrioritizer::enqueue`]
/// hands all of them the same request and they all `wait()` on it.
pub struct PageRequest {
    page_id: PageId,
    priority: AtomicU64,
    refcount: AtomicU32,
    result: Mutex<Option<Arc<PageEntry>>>,
    ready: Condvar,
}

impl PageRequest {
    pub(crate) fn new(page_id: PageId, priority: u64) -> Self {
        Self {
            page_id,
            priority: AtomicU64::new(priority),
            refcount: AtomicU32::new(1),
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn priority(&self) -> u64 {
        self.priority.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_priority(&self) -> u64 {
        self.priority.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn add_ref(&self) -> u32 {
        self.refcount.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Deliver the resolved entry and wake every waiter.
    pub(crate) fn fulfill(&self, entry: Arc<PageEntry>) {
        let mut slot = self.result.lock();
        *slot = Some(entry);
        self.ready.notify_all();
    }

    /// Block until the fault has been resolved, returning the entry.
    pub fn wait(&self) -> Arc<PageEntry> {
        let mut slot = self.result.lock();
        while slot.is_none() {
            self.ready.wait(&mut slot);
        }
        slot.clone().expect("checked Some above")
    }
}
