//! Request prioritizer: a max-heap of open page requests with an aging
//! rule, so requests queued first are not starved by a stream of newer
//! ones.

use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::request::PageRequest;
use crate::common::{Error, PageId, Result};

/// A heap slot. Carries a snapshot of the request's priority at the moment
/// it was pushed; `pop_highest` discards slots whose snapshot no longer
/// matches the request's live priority; a younger slot for the same request
/// always exists further up the heap in that case.
struct HeapEntry {
    priority: u64,
    seq: u64,
    page_id: PageId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Ties broken by insertion order: earlier sequence number wins, so
        // `BinaryHeap`'s max-heap semantics still prefer the older request.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct PrioritizerState {
    heap: BinaryHeap<HeapEntry>,
    /// Every outstanding request not yet fulfilled, keyed by page-id. Used
    /// both to dedupe concurrent faults on the same page and to answer
    /// `discard_if_unreferenced`.
    pending: HashMap<PageId, Arc<PageRequest>>,
    next_seq: u64,
}

/// The request prioritizer.
pub struct RequestPrioritizer {
    state: Mutex<PrioritizerState>,
    max_requests: usize,
}

const BASE_PRIORITY: u64 = 0;

impl RequestPrioritizer {
    pub fn new(max_requests: usize) -> Self {
        Self {
            state: Mutex::new(PrioritizerState {
                heap: BinaryHeap::new(),
                pending: HashMap::new(),
                next_seq: 0,
            }),
            max_requests,
        }
    }

    /// Enqueue a fault for `page_id`, or join an existing one.
    ///
    /// Every request already pending ages by one priority point first, so a
    /// long-waiting fault always outranks one that just arrived.
    pub fn enqueue(&self, page_id: PageId) -> Result<Arc<PageRequest>> {
        let mut state = self.state.lock();

        if let Some(existing) = state.pending.get(&page_id).cloned() {
            existing.add_ref();
            self.bump_locked(&mut state, &existing);
            return Ok(existing);
        }

        if state.pending.len() >= self.max_requests {
            return Err(Error::ResourceExhausted);
        }

        self.age_all(&mut state);

        let req = Arc::new(PageRequest::new(page_id, BASE_PRIORITY));
        state.pending.insert(page_id, req.clone());
        self.push(&mut state, page_id, BASE_PRIORITY);
        Ok(req)
    }

    /// Age every currently pending request by one priority point and push a
    /// fresh heap slot for each, reflecting its new priority.
    fn age_all(&self, state: &mut PrioritizerState) {
        let bumped: Vec<(PageId, u64)> = state
            .pending
            .values()
            .map(|req| (req.page_id(), req.bump_priority()))
            .collect();
        for (page_id, priority) in bumped {
            self.push(state, page_id, priority);
        }
    }

    fn push(&self, state: &mut PrioritizerState, page_id: PageId, priority: u64) {
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(HeapEntry {
            priority,
            seq,
            page_id,
        });
    }

    /// Raise a specific request's priority, e.g. because a new caller just
    /// joined it.
    fn bump_locked(&self, state: &mut PrioritizerState, request: &PageRequest) {
        let priority = request.bump_priority();
        self.push(state, request.page_id(), priority);
    }

    /// Public entry point for [`Self::bump_locked`]; takes the lock itself.
    pub fn bump(&self, request: &PageRequest) {
        let mut state = self.state.lock();
        self.bump_locked(&mut state, request);
    }

    /// Pop the highest-priority request still pending, skipping stale heap
    /// slots left behind by aging.
    pub fn pop_highest(&self) -> Option<Arc<PageRequest>> {
        let mut state = self.state.lock();
        loop {
            let slot = state.heap.pop()?;
            let Some(req) = state.pending.get(&slot.page_id).cloned() else {
                continue; // already fulfilled and removed
            };
            if req.priority() != slot.priority {
                continue; // superseded by a later aging bump
            }
            return Some(req);
        }
    }

    /// Called by the dispatcher just before reusing a victim's frame for a
    /// new page: true if nobody is waiting on `page_id` (so eviction may
    /// proceed), false if a live request still references it.
    pub fn discard_if_unreferenced(&self, page_id: PageId) -> bool {
        !self.state.lock().pending.contains_key(&page_id)
    }

    /// Mark a request as fulfilled: remove it from the pending set so
    /// `discard_if_unreferenced` stops protecting its page-id.
    pub fn complete(&self, page_id: PageId) {
        self.state.lock().pending.remove(&page_id);
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}
