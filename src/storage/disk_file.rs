//! Block-addressed file I/O for the heap file backing a buffer pool.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::BLOCK_SIZE;
use crate::common::Result;

/// A single heap file, addressed in fixed-size blocks.
///
/// There is no header, no free list, and no catalog: block 0 is an ordinary
/// block like any other. The file grows only via [`DiskFile::extend`], which
/// appends whole blocks at the end.
///
/// # Thread safety
/// `DiskFile` is **not** internally synchronized. Every read or write targets
/// a disjoint byte range keyed by page-id, so concurrent I/O on distinct
/// pages is safe as long as callers never issue two operations against the
/// same range concurrently. The buffer pool upholds this by serializing
/// access to any single page through the page entry's `frame_lock`.
///
/// # Durability
/// Writes are synchronous to the OS but are not followed by `fsync`; there
/// is no durability contract beyond "the OS has accepted the bytes."
pub struct DiskFile {
    file: File,
    block_count: u64,
}

impl DiskFile {
    /// Create a new, empty heap file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            block_count: 0,
        })
    }

    /// Open an existing heap file, deriving the block count from its size.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let block_count = file_size / BLOCK_SIZE;

        Ok(Self { file, block_count })
    }

    /// Open an existing heap file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Size of one block in bytes.
    #[inline]
    pub fn block_size(&self) -> u64 {
        BLOCK_SIZE
    }

    /// Number of blocks currently in the file.
    #[inline]
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Extend the file by `n_blocks` zeroed blocks, returning the block
    /// index at which the extension begins.
    pub fn extend(&mut self, n_blocks: u64) -> Result<u64> {
        let start_block = self.block_count;
        let offset = start_block * BLOCK_SIZE;
        self.file.seek(SeekFrom::Start(offset))?;

        let zeros = vec![0u8; (n_blocks * BLOCK_SIZE) as usize];
        self.file.write_all(&zeros)?;

        self.block_count += n_blocks;
        Ok(start_block)
    }

    /// Read `n_blocks` blocks starting at `start_block` into `buf`.
    ///
    /// `buf` must be exactly `n_blocks * block_size()` bytes long.
    pub fn read(&mut self, buf: &mut [u8], start_block: u64, n_blocks: u64) -> Result<()> {
        debug_assert_eq!(buf.len() as u64, n_blocks * BLOCK_SIZE);

        let offset = start_block * BLOCK_SIZE;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write `n_blocks` blocks from `buf` starting at `start_block`.
    ///
    /// `buf` must be exactly `n_blocks * block_size()` bytes long.
    pub fn write(&mut self, buf: &[u8], start_block: u64, n_blocks: u64) -> Result<()> {
        debug_assert_eq!(buf.len() as u64, n_blocks * BLOCK_SIZE);

        let offset = start_block * BLOCK_SIZE;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Flush any OS-level buffering. Does not imply `fsync`.
    pub fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
