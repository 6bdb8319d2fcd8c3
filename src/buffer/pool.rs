//! The buffer pool facade: the only type most callers touch directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::dispatcher::IoDispatcher;
use crate::buffer::frame_pool::FramePool;
use crate::buffer::page_entry::PageEntry;
use crate::buffer::page_guard::{PageReadGuard, PageWriteGuard};
use crate::buffer::page_table::PageTable;
use crate::buffer::prioritizer::RequestPrioritizer;
use crate::buffer::replacer::LruReplacer;
use crate::buffer::stats::{BufferPoolStats, StatsSnapshot};
use crate::common::{BufferPoolConfig, Error, FrameId, PageId, Result};
use crate::storage::DiskFile;

/// Number of I/O worker threads backing every pool. Not user-configurable:
/// callers only choose the heap file path, frame count, and page width.
const DEFAULT_WORKERS: usize = 4;

/// State shared between the facade and the dispatcher's worker threads.
///
/// Kept as a separate type (rather than fields directly on [`BufferPool`])
/// so the dispatcher can hold its own `Arc` to it without holding a `BufferPool`.
pub(crate) struct PoolShared {
    pub(crate) disk: Mutex<DiskFile>,
    pub(crate) page_table: PageTable,
    pub(crate) lru: LruReplacer,
    pub(crate) prioritizer: RequestPrioritizer,
    pub(crate) frame_pool: FramePool,
    pub(crate) entries: Vec<Arc<PageEntry>>,
    pub(crate) config: BufferPoolConfig,
    pub(crate) stats: BufferPoolStats,
    fatal: AtomicBool,
}

impl PoolShared {
    pub(crate) fn entry(&self, frame_id: FrameId) -> &Arc<PageEntry> {
        &self.entries[frame_id.0]
    }

    pub(crate) fn mark_fatal(&self) {
        self.fatal.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }
}

/// A fixed-capacity, disk-backed page cache with concurrent readers and
/// writers per page and an asynchronous I/O dispatcher for faults and
/// writebacks.
///
/// Open one with [`BufferPool::open`], fetch pages with [`BufferPool::get_for_read`]
/// / [`BufferPool::get_for_write`], and let the returned guards release
/// themselves on drop.
pub struct BufferPool {
    pub(crate) shared: Arc<PoolShared>,
    dispatcher: IoDispatcher,
}

impl BufferPool {
    /// Open (creating if necessary) the heap file at `config.path` with
    /// `config.num_frames` frames of `config.blocks_per_page` blocks each.
    pub fn open(config: BufferPoolConfig) -> Result<Self> {
        let disk = DiskFile::open_or_create(&config.path)?;
        let page_bytes = config.page_bytes();
        let frame_pool = FramePool::new(config.num_frames, page_bytes);

        let entries: Vec<Arc<PageEntry>> = (0..config.num_frames)
            .map(|i| Arc::new(PageEntry::new(FrameId::new(i))))
            .collect();

        let lru = LruReplacer::new();
        for entry in &entries {
            lru.mark_recently_used(entry.frame_id());
        }

        let max_pending = config.num_frames.saturating_mul(4).max(16);

        let shared = Arc::new(PoolShared {
            disk: Mutex::new(disk),
            page_table: PageTable::new(),
            lru,
            prioritizer: RequestPrioritizer::new(max_pending),
            frame_pool,
            entries,
            config,
            stats: BufferPoolStats::new(),
            fatal: AtomicBool::new(false),
        });

        let dispatcher = IoDispatcher::new(shared.clone(), DEFAULT_WORKERS);

        Ok(Self { shared, dispatcher })
    }

    /// Resolve `page_id` to its resident entry, running the page-fault
    /// protocol if it isn't already in the page table.
    fn resolve_entry(&self, page_id: PageId) -> Arc<PageEntry> {
        loop {
            if let Some(entry) = self.shared.page_table.lookup(page_id) {
                self.shared.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return entry;
            }
            self.shared
                .stats
                .cache_misses
                .fetch_add(1, Ordering::Relaxed);
            tracing::debug!(page_id = %page_id, "page fault starting");

            match self.shared.prioritizer.enqueue(page_id) {
                Ok(req) => {
                    self.dispatcher.submit_replace();
                    let entry = req.wait();
                    tracing::debug!(page_id = %page_id, "page fault resolved");
                    return entry;
                }
                Err(_) => {
                    // The prioritizer is momentarily at its pending-request
                    // bound; back off and try again once some fault drains.
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Resolve and pin `page_id`, retrying if a concurrent eviction steals
    /// the entry between resolution and pinning (the entry is unpinned and
    /// sitting in the LRU until the instant `meta_lock` is taken here).
    fn pin_for(&self, page_id: PageId, mark_dirty: bool) -> FrameId {
        loop {
            let entry = self.resolve_entry(page_id);
            let mut meta = entry.meta();
            if meta.page_id != Some(page_id) {
                continue;
            }
            meta.pin_count += 1;
            if mark_dirty {
                meta.is_dirty = true;
            }
            let frame_id = entry.frame_id();
            drop(meta);
            self.shared.lru.remove(frame_id);
            return frame_id;
        }
    }

    /// Resolve `page_id`, pin it, and return shared access to its bytes.
    pub fn get_for_read(&self, page_id: PageId) -> PageReadGuard<'_> {
        let frame_id = self.pin_for(page_id, false);
        let entry = self.shared.entry(frame_id);
        PageReadGuard::new(self, page_id, entry.frame_read())
    }

    /// Resolve `page_id`, pin it, mark it dirty, and return exclusive
    /// access to its bytes.
    pub fn get_for_write(&self, page_id: PageId) -> PageWriteGuard<'_> {
        let frame_id = self.pin_for(page_id, true);
        let entry = self.shared.entry(frame_id);
        PageWriteGuard::new(self, page_id, entry.frame_write())
    }

    pub(crate) fn release_read_internal(&self, page_id: PageId) {
        let Some(entry) = self.shared.page_table.lookup(page_id) else {
            return;
        };
        let pin_count = {
            let mut meta = entry.meta();
            meta.pin_count = meta.pin_count.saturating_sub(1);
            meta.pin_count
        };
        if pin_count == 0 {
            self.shared.lru.mark_recently_used(entry.frame_id());
        }
    }

    pub(crate) fn release_write_internal(&self, page_id: PageId) {
        let Some(entry) = self.shared.page_table.lookup(page_id) else {
            return;
        };
        let (pin_count, should_queue_cleanup) = {
            let mut meta = entry.meta();
            meta.pin_count = meta.pin_count.saturating_sub(1);
            let should_queue = meta.is_dirty && !meta.is_queued_for_cleanup;
            if should_queue {
                meta.is_queued_for_cleanup = true;
            }
            (meta.pin_count, should_queue)
        };
        if pin_count == 0 {
            self.shared.lru.mark_recently_used(entry.frame_id());
        }
        if should_queue_cleanup {
            self.dispatcher.submit_cleanup(entry);
        }
    }

    /// Synchronously write `page_id` back to disk if dirty. Delegates to
    /// the I/O dispatcher's submit-and-wait cleanup job, so the writeback
    /// itself runs under the same path (and stats/fatal bookkeeping) as
    /// every other eviction writeback, and the entry is reinserted into
    /// the LRU at the stale end on completion (§4.10).
    pub fn force_flush(&self, page_id: PageId) -> Result<()> {
        let Some(entry) = self.shared.page_table.lookup(page_id) else {
            return Ok(());
        };
        if !entry.is_dirty() {
            return Ok(());
        }
        self.dispatcher.submit_cleanup_and_wait(entry)
    }

    /// Extend the heap file by one page and return its page-id. The caller
    /// may immediately `get_for_write` it; the fault path reads zeros.
    pub fn allocate_new_page(&self) -> Result<PageId> {
        let blocks_per_page = self.shared.config.blocks_per_page as u64;
        let mut disk = self.shared.disk.lock();
        let start_block = disk.extend(blocks_per_page)?;
        Ok(PageId::new((start_block / blocks_per_page) as u32))
    }

    /// Enqueue fire-and-forget fault requests for `[page_id, page_id + n)`.
    /// Requests for already-resident pages are skipped.
    pub fn prefetch(&self, page_id: PageId, n: u32) {
        for offset in 0..n {
            let target = PageId::new(page_id.0 + offset);
            if self.shared.page_table.lookup(target).is_some() {
                continue;
            }
            if self.shared.prioritizer.enqueue(target).is_ok() {
                self.dispatcher.submit_replace();
            }
        }
    }

    /// Write back every dirty page, then tear down the dispatcher.
    pub fn shutdown(mut self) -> Result<()> {
        let blocks_per_page = self.shared.config.blocks_per_page as u64;
        let mut first_err: Option<Error> = None;

        self.shared.page_table.for_each(|page_id, entry| {
            let mut meta = entry.meta();
            if !meta.is_dirty {
                return;
            }
            let frame = entry.frame_read();
            let result = match frame.as_deref() {
                Some(bytes) => self.shared.disk.lock().write(
                    bytes,
                    page_id.0 as u64 * blocks_per_page,
                    blocks_per_page,
                ),
                None => Ok(()),
            };
            drop(frame);
            match result {
                Ok(()) => meta.is_dirty = false,
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        });

        self.dispatcher.shutdown();
        if let Err(err) = self.shared.disk.lock().close() {
            if first_err.is_none() {
                first_err = Some(err);
            }
        }

        if let Some(err) = first_err {
            self.shared.mark_fatal();
            return Err(err);
        }
        if self.shared.is_fatal() {
            return Err(Error::Fatal(
                "buffer pool encountered a fatal I/O error before shutdown".to_string(),
            ));
        }
        Ok(())
    }

    /// A snapshot of the pool's hit/miss/eviction counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Whether a prior fatal I/O error has poisoned this pool.
    pub fn is_fatal(&self) -> bool {
        self.shared.is_fatal()
    }
}
