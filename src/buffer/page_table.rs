//! Page table: the concurrent page-id → page-entry mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::page_entry::PageEntry;
use crate::common::PageId;

/// Maps page-ids to their resident entry.
///
/// A hash map fronted by a single read-write lock: `lookup` takes it shared,
/// `insert`/`remove`/`for_each` take it exclusive.
#[derive(Default)]
pub struct PageTable {
    inner: RwLock<HashMap<PageId, Arc<PageEntry>>>,
}

impl PageTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Shared lookup of a page-id's resident entry.
    pub fn lookup(&self, page_id: PageId) -> Option<Arc<PageEntry>> {
        self.inner.read().get(&page_id).cloned()
    }

    /// Bind a page-id to an entry.
    ///
    /// # Panics
    /// Panics if `page_id` already has a binding; the fault protocol's
    /// double-checked-locking discipline is responsible for never calling
    /// this on an already-bound id.
    pub fn insert(&self, page_id: PageId, entry: Arc<PageEntry>) {
        let mut guard = self.inner.write();
        let prior = guard.insert(page_id, entry);
        assert!(prior.is_none(), "page {page_id} already bound in page table");
    }

    /// Remove and return a page-id's binding, if any.
    pub fn remove(&self, page_id: PageId) -> Option<Arc<PageEntry>> {
        self.inner.write().remove(&page_id)
    }

    /// Visit every resident entry under the exclusive lock.
    pub fn for_each<F: FnMut(PageId, &Arc<PageEntry>)>(&self, mut f: F) {
        let guard = self.inner.write();
        for (page_id, entry) in guard.iter() {
            f(*page_id, entry);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
