//! Page entry: the per-frame metadata/state record.
//!
//! Each entry has two lock domains, always taken in this order:
//! `meta_lock` before `frame_lock`. See the crate-level lock ordering note
//! in [`crate::buffer`].

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::frame_pool::FrameBytes;
use crate::common::{FrameId, PageId};

/// Metadata guarded by `meta_lock`: everything about an entry except the
/// frame bytes themselves.
#[derive(Debug)]
pub struct PageEntryMeta {
    /// The page currently materialized in the frame, if any.
    pub page_id: Option<PageId>,
    /// True before the entry's frame has ever been loaded.
    pub is_free: bool,
    /// Written but not yet flushed to disk.
    pub is_dirty: bool,
    /// A cleanup (writeback) job for this entry is already submitted.
    pub is_queued_for_cleanup: bool,
    /// Live readers + writers currently holding this frame.
    pub pin_count: u32,
}

impl PageEntryMeta {
    fn new() -> Self {
        Self {
            page_id: None,
            is_free: true,
            is_dirty: false,
            is_queued_for_cleanup: false,
            pin_count: 0,
        }
    }
}

/// One slot in the fixed M-entry arena.
///
/// `frame_id` is the entry's stable position in the arena and doubles as the
/// frame index; it never changes. `bytes` holds the checked-out frame
/// buffer, or `None` for an entry that has never been assigned one (i.e.
/// `meta.is_free == true`).
pub struct PageEntry {
    frame_id: FrameId,
    meta: Mutex<PageEntryMeta>,
    bytes: RwLock<Option<FrameBytes>>,
}

impl PageEntry {
    /// Create a fresh, unassigned entry at the given arena position.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            meta: Mutex::new(PageEntryMeta::new()),
            bytes: RwLock::new(None),
        }
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Lock the metadata.
    #[inline]
    pub fn meta(&self) -> MutexGuard<'_, PageEntryMeta> {
        self.meta.lock()
    }

    /// Acquire the frame bytes for shared (read) access.
    #[inline]
    pub fn frame_read(&self) -> RwLockReadGuard<'_, Option<FrameBytes>> {
        self.bytes.read()
    }

    /// Acquire the frame bytes for exclusive (write) access.
    #[inline]
    pub fn frame_write(&self) -> RwLockWriteGuard<'_, Option<FrameBytes>> {
        self.bytes.write()
    }

    /// Current page-id, if the entry has one bound. Takes `meta_lock`
    /// briefly; convenience wrapper for callers that don't need the full
    /// metadata guard.
    pub fn page_id(&self) -> Option<PageId> {
        self.meta.lock().page_id
    }

    pub fn pin_count(&self) -> u32 {
        self.meta.lock().pin_count
    }

    pub fn is_dirty(&self) -> bool {
        self.meta.lock().is_dirty
    }
}
