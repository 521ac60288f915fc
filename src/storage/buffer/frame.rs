//! Frame management for the buffer pool.
//!
//! A frame is a slot in the buffer pool that can hold one 4KB page at a time.
//! The page bytes live in the frame behind a per-frame lock; the bookkeeping
//! metadata (which page, pin count, dirty flag) lives in the pool's state
//! mutex so it can be inspected and updated without touching page data.

use crate::storage::{PageData, PageId};
use tokio::sync::RwLock;

/// Identifier for a frame in the buffer pool: an index into the frame array,
/// stable for the pool's lifetime.
///
/// `FrameId` is distinct from `PageId`: `PageId` identifies a logical page on
/// disk, while `FrameId` identifies a physical memory slot. Frame ids range
/// from 0 to pool_size - 1 and are meaningless outside their pool.
pub type FrameId = usize;

/// A frame in the buffer pool.
///
/// Only the page bytes live here. Each frame has its own `RwLock` so readers
/// of distinct pages (and multiple readers of the same page) proceed in
/// parallel, and so the lock can be held across the disk I/O that fills or
/// flushes the frame.
pub(super) struct Frame {
    pub(super) data: RwLock<PageData>,
}

impl Frame {
    pub(super) fn new() -> Self {
        Self {
            data: RwLock::new(PageData::new()),
        }
    }
}

/// Bookkeeping metadata for one frame, guarded by the pool's state mutex.
///
/// # Lifecycle
///
/// 1. **Empty**: `page_id = None`, the frame is on the free list
/// 2. **Pinned**: `pin_count > 0`, the page cannot be evicted
/// 3. **Unpinned**: `pin_count = 0`, the frame is in the replacer
/// 4. **Evicted**: written back if dirty, then reset for the next page
#[derive(Debug)]
pub(super) struct FrameMeta {
    /// The page currently loaded in this frame, if any.
    pub(super) page_id: Option<PageId>,

    /// Number of outstanding handles to this frame.
    ///
    /// Each fetch increments this counter and each unpin decrements it.
    /// A frame with `pin_count > 0` is never selected as an eviction victim.
    pub(super) pin_count: u32,

    /// Whether the page has been modified since it was loaded.
    ///
    /// Dirty frames are written back to storage before eviction.
    pub(super) is_dirty: bool,
}

impl FrameMeta {
    pub(super) fn new() -> Self {
        Self {
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Installs a freshly loaded page: pinned once, clean.
    pub(super) fn install(&mut self, page_id: PageId) {
        self.page_id = Some(page_id);
        self.pin_count = 1;
        self.is_dirty = false;
    }

    /// Returns the frame to the empty state.
    pub(super) fn reset(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}
