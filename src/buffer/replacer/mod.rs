//! Eviction policy: [`LruReplacer`] tracks unpinned frames in recency order
//! and hands out eviction victims on request.

mod lru;

pub use lru::LruReplacer;
