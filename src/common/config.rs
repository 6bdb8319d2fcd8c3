//! Configuration constants and the buffer pool's open-time configuration.

use std::path::PathBuf;

/// Size of one disk block in bytes.
///
/// Pages are `blocks_per_page` blocks wide; the disk file is addressed in
/// units of this constant. 512 bytes matches the classic sector size used
/// by the heap-file format this pool is built for.
pub const BLOCK_SIZE: u64 = 512;

/// Configuration for opening a [`crate::buffer::BufferPool`].
///
/// There are no environment variables and no on-disk metadata: a pool is
/// fully described by where its heap file lives, how many frames of cache
/// to keep in memory, and how many blocks make up one page.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Path to the single heap file backing this pool.
    pub path: PathBuf,
    /// Number of frames (`M`) held in the in-memory cache.
    pub num_frames: usize,
    /// Number of disk blocks (`P`) per page.
    pub blocks_per_page: u32,
}

impl BufferPoolConfig {
    /// Create a configuration with the given path, frame count, and page
    /// width in blocks.
    pub fn new(path: impl Into<PathBuf>, num_frames: usize, blocks_per_page: u32) -> Self {
        Self {
            path: path.into(),
            num_frames,
            blocks_per_page,
        }
    }

    /// Size of one page in bytes (`P * B`).
    pub fn page_bytes(&self) -> usize {
        self.blocks_per_page as usize * BLOCK_SIZE as usize
    }
}
