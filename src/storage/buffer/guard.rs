//! RAII guards for buffer pool page access.
//!
//! A guard is the caller's pin on a page: it is handed out by `fetch_page` /
//! `fetch_page_mut` / `new_page` with the pin count already incremented, and
//! it unpins exactly once when dropped. Holding a guard keeps the frame safe
//! from eviction; the page bytes are reached through `Deref`.

use super::frame::FrameId;
use super::pool::PoolInner;
use super::replacer::Replacer;
use crate::storage::{PageData, PageId, Storage};
use std::ops::{Deref, DerefMut};
use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};

/// RAII guard for read-only page access.
///
/// Multiple read guards for the same page can exist at once. When dropped,
/// the guard unpins the page without touching the dirty flag.
pub struct PageReadGuard<'a, S: Storage, R: Replacer> {
    pool: &'a PoolInner<S, R>,
    frame_id: FrameId,
    page_id: PageId,
    data: RwLockReadGuard<'a, PageData>,
}

impl<'a, S: Storage, R: Replacer> PageReadGuard<'a, S, R> {
    pub(super) fn new(
        pool: &'a PoolInner<S, R>,
        frame_id: FrameId,
        page_id: PageId,
        data: RwLockReadGuard<'a, PageData>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            data,
        }
    }

    /// Returns the PageId of this page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<S: Storage, R: Replacer> Deref for PageReadGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageReadGuard<'_, S, R> {
    fn drop(&mut self) {
        self.pool.unpin_frame(self.frame_id, false);
    }
}

/// RAII guard for exclusive page access.
///
/// The first mutable access marks the page dirty, so an eviction after the
/// guard drops writes the new bytes back to storage. `mark_dirty` is available
/// for callers that mutate through interior means.
pub struct PageWriteGuard<'a, S: Storage, R: Replacer> {
    pool: &'a PoolInner<S, R>,
    frame_id: FrameId,
    page_id: PageId,
    data: RwLockWriteGuard<'a, PageData>,
    is_dirty: bool,
}

impl<'a, S: Storage, R: Replacer> PageWriteGuard<'a, S, R> {
    pub(super) fn new(
        pool: &'a PoolInner<S, R>,
        frame_id: FrameId,
        page_id: PageId,
        data: RwLockWriteGuard<'a, PageData>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            data,
            is_dirty: false,
        }
    }

    /// Returns the PageId of this page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Explicitly marks the page as modified.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }
}

impl<S: Storage, R: Replacer> Deref for PageWriteGuard<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data.as_slice()
    }
}

impl<S: Storage, R: Replacer> DerefMut for PageWriteGuard<'_, S, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.is_dirty = true;
        self.data.as_mut_slice()
    }
}

impl<S: Storage, R: Replacer> Drop for PageWriteGuard<'_, S, R> {
    fn drop(&mut self) {
        self.pool.unpin_frame(self.frame_id, self.is_dirty);
    }
}
