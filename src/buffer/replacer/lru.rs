//! LRU (Least Recently Used) page replacement policy.
//!
//! Holds the set of currently *unpinned* frames, ordered by recency, and
//! hands out eviction victims from the least-recently-used end.

use std::collections::{HashSet, VecDeque};

use parking_lot::{Condvar, Mutex};

use crate::common::FrameId;

struct LruState {
    /// Unpinned frames in recency order; front = least recent, back = most
    /// recent.
    queue: VecDeque<FrameId>,
    /// Mirror of `queue`'s contents for O(1) membership checks.
    members: HashSet<FrameId>,
}

/// The LRU replacer.
///
/// All bookkeeping lives under one mutex, as described by the lock-ordering
/// discipline: callers take this lock before any entry's `meta_lock`, never
/// after.
pub struct LruReplacer {
    state: Mutex<LruState>,
    nonempty: Condvar,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LruState {
                queue: VecDeque::new(),
                members: HashSet::new(),
            }),
            nonempty: Condvar::new(),
        }
    }

    /// Insert (or move) a frame to the most-recently-used end.
    pub fn mark_recently_used(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if state.members.remove(&frame_id) {
            state.queue.retain(|&f| f != frame_id);
        }
        state.queue.push_back(frame_id);
        state.members.insert(frame_id);
        self.nonempty.notify_one();
    }

    /// Insert (or move) a frame to the least-recently-used end: the next
    /// victim chosen, all else equal. Used for entries that were just
    /// cleaned and need no further I/O before reuse.
    pub fn mark_stale(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if state.members.remove(&frame_id) {
            state.queue.retain(|&f| f != frame_id);
        }
        state.queue.push_front(frame_id);
        state.members.insert(frame_id);
        self.nonempty.notify_one();
    }

    /// Remove a frame from consideration, e.g. because it has just become
    /// pinned. A no-op if the frame isn't currently tracked.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if state.members.remove(&frame_id) {
            state.queue.retain(|&f| f != frame_id);
        }
    }

    /// Remove and return the least-recently-used frame, or `None` if empty.
    ///
    /// Ownership of the slot transfers to the caller: if the caller finds
    /// the victim unusable it must not be reinserted here (the caller would
    /// instead call `remove`/leave it out, since by definition it is no
    /// longer in this structure).
    pub fn pick_victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let frame_id = state.queue.pop_front()?;
        state.members.remove(&frame_id);
        Some(frame_id)
    }

    /// Block the calling thread until at least one frame is available, or
    /// until `deadline` elapses (used by tests and shutdown races to avoid
    /// hanging forever).
    pub fn wait_until_nonempty(&self) {
        let mut state = self.state.lock();
        while state.queue.is_empty() {
            self.nonempty.wait(&mut state);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_lru_order() {
        let lru = LruReplacer::new();
        lru.mark_recently_used(FrameId::new(0));
        lru.mark_recently_used(FrameId::new(1));
        lru.mark_recently_used(FrameId::new(2));

        assert_eq!(lru.pick_victim(), Some(FrameId::new(0)));
        assert_eq!(lru.pick_victim(), Some(FrameId::new(1)));
        assert_eq!(lru.pick_victim(), Some(FrameId::new(2)));
        assert_eq!(lru.pick_victim(), None);
    }

    #[test]
    fn test_reaccess_moves_to_back() {
        let lru = LruReplacer::new();
        lru.mark_recently_used(FrameId::new(0));
        lru.mark_recently_used(FrameId::new(1));
        lru.mark_recently_used(FrameId::new(0)); // re-touch 0

        // 1 is now least recently used
        assert_eq!(lru.pick_victim(), Some(FrameId::new(1)));
        assert_eq!(lru.pick_victim(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_remove_pinned() {
        let lru = LruReplacer::new();
        lru.mark_recently_used(FrameId::new(0));
        lru.mark_recently_used(FrameId::new(1));
        lru.remove(FrameId::new(0));

        assert_eq!(lru.pick_victim(), Some(FrameId::new(1)));
        assert_eq!(lru.pick_victim(), None);
    }

    #[test]
    fn test_mark_stale_goes_to_front() {
        let lru = LruReplacer::new();
        lru.mark_recently_used(FrameId::new(0));
        lru.mark_recently_used(FrameId::new(1));
        lru.mark_stale(FrameId::new(1));

        // 1 was pushed to the front, so it is now the next victim
        assert_eq!(lru.pick_victim(), Some(FrameId::new(1)));
        assert_eq!(lru.pick_victim(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_wait_until_nonempty_wakes_on_insert() {
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let lru = Arc::new(LruReplacer::new());
        let waiter = lru.clone();
        let handle = thread::spawn(move || {
            waiter.wait_until_nonempty();
            waiter.pick_victim()
        });

        thread::sleep(Duration::from_millis(20));
        lru.mark_recently_used(FrameId::new(3));

        assert_eq!(handle.join().unwrap(), Some(FrameId::new(3)));
    }
}
