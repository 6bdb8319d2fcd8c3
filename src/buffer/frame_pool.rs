//! The frame allocator: a bounded pool of fixed-size byte buffers.
//!
//! Page entries do not own their bytes permanently. A freshly-created entry
//! starts with no frame at all; frames are handed out by [`FramePool`] during
//! the page-fault protocol and returned to it when an entry is evicted in
//! favor of a different page.

use parking_lot::Mutex;

/// A single P·B-byte buffer.
pub type FrameBytes = Box<[u8]>;

/// Arena of reusable frame buffers, all `page_bytes` long.
///
/// The pool is sized once at startup (`M` buffers) and never grows. Every
/// buffer is either checked out to exactly one page entry or sitting idle
/// in the pool's free list; the two sets always partition the arena.
pub struct FramePool {
    page_bytes: usize,
    free: Mutex<Vec<FrameBytes>>,
}

impl FramePool {
    /// Build a pool of `capacity` zeroed buffers, each `page_bytes` long.
    pub fn new(capacity: usize, page_bytes: usize) -> Self {
        let free = (0..capacity)
            .map(|_| vec![0u8; page_bytes].into_boxed_slice())
            .collect();
        Self {
            page_bytes,
            free: Mutex::new(free),
        }
    }

    /// Size in bytes of every buffer this pool hands out.
    #[inline]
    pub fn page_bytes(&self) -> usize {
        self.page_bytes
    }

    /// Check out an idle buffer, or `None` if every buffer is in use.
    ///
    /// Under normal operation this never returns `None`: the pool holds `M`
    /// buffers and the fault protocol never requests more than one on top of
    /// the `M - 1` that can possibly be checked out to entries at once.
    pub fn allocate(&self) -> Option<FrameBytes> {
        self.free.lock().pop()
    }

    /// Return a buffer to the free list for reuse.
    pub fn free(&self, buf: FrameBytes) {
        debug_assert_eq!(buf.len(), self.page_bytes);
        self.free.lock().push(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let pool = FramePool::new(2, 16);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());

        pool.free(a);
        assert!(pool.allocate().is_some());
        pool.free(b);
    }

    #[test]
    fn test_buffers_are_zeroed() {
        let pool = FramePool::new(1, 8);
        let buf = pool.allocate().unwrap();
        assert_eq!(&*buf, &[0u8; 8]);
    }
}
