//! Buffer pool manager for caching pages in memory.
//!
//! The buffer pool sits between the storage backend and higher-level
//! components, caching frequently accessed pages in memory to reduce I/O.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::storage::{PageId, Storage};

use super::error::BufferPoolError;
use super::frame::{Frame, FrameId, FrameMeta};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::replacer::Replacer;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the buffer pool.
    ///
    /// This determines the maximum number of pages that can be cached in
    /// memory simultaneously. Common values:
    /// - 256 frames = 1MB (testing)
    /// - 2048 frames = 8MB (small database)
    /// - 262144 frames = 1GB (production)
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { pool_size: 1024 }
    }
}

/// Buffer pool manager: a bounded cache of pages keyed by `PageId`, with
/// pin-count-based locking of frames against eviction.
///
/// # Architecture
///
/// ```text
/// +------------------------------------------------------+
/// |                     BufferPool                       |
/// |  +----------------+   +---------------------------+  |
/// |  | state (Mutex)  |   |   frames: Vec<Frame>      |  |
/// |  |  page_table    |-->|  [data] [data] [data] ... |  |
/// |  |  frame_meta    |   |  (per-frame RwLock)       |  |
/// |  |  free_list     |   +---------------------------+  |
/// |  |  replacer      |                |                 |
/// |  +----------------+                v                 |
/// |                         +-------------------+        |
/// |                         |  Storage (trait)  |        |
/// |                         +-------------------+        |
/// +------------------------------------------------------+
/// ```
///
/// Every frame belongs to exactly one of three sets at any quiescent moment:
/// the free list (holds no page), the replacer (holds an unpinned page), or
/// the pinned portion of the page table. Operations move frames between the
/// sets and re-establish the partition before returning.
///
/// # Thread Safety
///
/// The pool is safe to share via `Arc<BufferPool>`:
/// - Readers of different pages (and of the same page) proceed in parallel;
///   writers get exclusive access to their page via the per-frame lock.
/// - All bookkeeping (page table, metadata, free list, replacer) sits behind
///   one `parking_lot::Mutex`, which is never held across an `.await`. The
///   replacer is only ever called under this mutex, so the lock order is
///   strictly pool state -> replacer with no reverse edge.
///
/// Because the state mutex is released around disk I/O, operations
/// re-validate after re-acquiring it: a fetch that lost the load race parks
/// its redundant frame back on the free list, and an eviction re-checks the
/// victim's pin count after write-back and retries if the frame was re-pinned.
///
/// # Lock Order
///
/// State mutex, then a frame's data lock — never the reverse while blocking.
/// Frame data locks are held across the I/O that fills or flushes the frame,
/// which is what keeps eviction from racing the bytes.
pub struct BufferPool<S: Storage, R: Replacer> {
    inner: PoolInner<S, R>,
}

/// Internal state of the buffer pool, shared with the guards for unpinning.
pub(super) struct PoolInner<S: Storage, R: Replacer> {
    /// The underlying storage backend.
    storage: S,

    /// Frame array. The Vec itself is immutable after construction; each
    /// frame's page data is behind its own lock.
    frames: Vec<Frame>,

    /// Bookkeeping state (page table, metadata, free list, replacer).
    state: Mutex<PoolState<R>>,

    /// Configuration (immutable after construction).
    config: BufferPoolConfig,
}

/// Mutable bookkeeping guarded by the state mutex.
struct PoolState<R> {
    /// Maps PageId -> FrameId for cached pages.
    page_table: HashMap<PageId, FrameId>,

    /// Metadata for each frame (indexed by FrameId).
    frame_meta: Vec<FrameMeta>,

    /// Frames not currently holding any page.
    free_list: Vec<FrameId>,

    /// Replacement policy tracking unpinned frames.
    replacer: R,
}

impl<S: Storage, R: Replacer> BufferPool<S, R> {
    /// Creates a new buffer pool.
    ///
    /// Initially every frame is on the free list; the page table and the
    /// replacer are empty.
    ///
    /// # Panics
    ///
    /// Panics if `config.pool_size` is 0.
    pub fn new(storage: S, replacer: R, config: BufferPoolConfig) -> Self {
        assert!(config.pool_size > 0, "pool_size must be > 0");

        let frames: Vec<_> = (0..config.pool_size).map(|_| Frame::new()).collect();
        let frame_meta: Vec<_> = (0..config.pool_size).map(|_| FrameMeta::new()).collect();
        let free_list: Vec<_> = (0..config.pool_size).collect();

        Self {
            inner: PoolInner {
                storage,
                frames,
                state: Mutex::new(PoolState {
                    page_table: HashMap::with_capacity(config.pool_size),
                    frame_meta,
                    free_list,
                    replacer,
                }),
                config,
            },
        }
    }

    /// Returns the buffer pool configuration.
    pub fn config(&self) -> &BufferPoolConfig {
        &self.inner.config
    }

    /// Returns the number of frames in the buffer pool.
    pub fn pool_size(&self) -> usize {
        self.inner.config.pool_size
    }

    /// Returns the number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.inner.state.lock().page_table.len()
    }

    /// Returns the number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.inner.state.lock().free_list.len()
    }

    /// Fetches a page for reading.
    ///
    /// If the page is already cached, pins it and returns immediately.
    /// Otherwise reads it from storage into a free frame, evicting an
    /// unpinned page if the free list is empty. The returned guard holds a
    /// pin, preventing eviction until it is dropped.
    ///
    /// # Errors
    ///
    /// - `BufferPoolError::PoolExhausted` if every frame is pinned
    /// - `BufferPoolError::UnknownPage` / `Backend` when storage rejects the read
    pub async fn fetch_page(
        &self,
        page_id: PageId,
    ) -> Result<PageReadGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load_frame(page_id).await?;
        let data = self.inner.frames[frame_id].data.read().await;
        Ok(PageReadGuard::new(&self.inner, frame_id, page_id, data))
    }

    /// Fetches a page for modification.
    ///
    /// Same pinning semantics as [`fetch_page`](Self::fetch_page); the guard
    /// grants exclusive access and marks the frame dirty on first mutable
    /// access.
    pub async fn fetch_page_mut(
        &self,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.inner.get_or_load_frame(page_id).await?;
        let data = self.inner.frames[frame_id].data.write().await;
        Ok(PageWriteGuard::new(&self.inner, frame_id, page_id, data))
    }

    /// Allocates a new page in storage and pins it into the buffer pool.
    ///
    /// The frame is acquired before the storage allocation so that a full
    /// pool cannot leak a disk page, and the buffer is zeroed after the
    /// allocation so the returned frame is guaranteed clean.
    ///
    /// # Errors
    ///
    /// - `BufferPoolError::PoolExhausted` if every frame is pinned
    /// - `BufferPoolError::Backend` if the allocation fails
    pub async fn new_page(&self) -> Result<PageWriteGuard<'_, S, R>, BufferPoolError> {
        let frame_id = self.inner.acquire_frame().await?;

        let page_id = match self.inner.storage.allocate_page().await {
            Ok(page_id) => page_id,
            Err(e) => {
                let mut state = self.inner.state.lock();
                state.free_list.push(frame_id);
                return Err(e.into());
            }
        };

        let mut data = self.inner.frames[frame_id].data.write().await;
        data.zero();

        {
            let mut state = self.inner.state.lock();
            state.page_table.insert(page_id, frame_id);
            state.frame_meta[frame_id].install(page_id);
        }

        Ok(PageWriteGuard::new(&self.inner, frame_id, page_id, data))
    }

    /// Releases one pin on a page.
    ///
    /// Guards do this automatically on drop; `unpin_page` is the exposed
    /// low-level protocol operation for callers managing pins by hand.
    ///
    /// - Page not cached: returns `true` (nothing to do).
    /// - Pin count already zero: returns `false` — the caller is unpinning a
    ///   page it does not hold. Never a panic.
    /// - Otherwise decrements the pin count, ORs in the dirty hint (an
    ///   already-dirty frame stays dirty), and hands the frame to the
    ///   replacer once the count reaches zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.inner.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let meta = &mut state.frame_meta[frame_id];
        if meta.pin_count == 0 {
            return false;
        }
        meta.pin_count -= 1;
        meta.is_dirty |= is_dirty;
        let now_unpinned = meta.pin_count == 0;

        if now_unpinned {
            state.replacer.unpin(frame_id);
        }
        true
    }

    /// Removes a page from the buffer pool and deallocates it in storage.
    ///
    /// - Page not cached: returns `Ok(true)` (nothing to do).
    /// - Page pinned: returns `Ok(false)` — someone is using it.
    /// - Otherwise the frame is claimed out of the replacer, written back if
    ///   dirty, zeroed, returned to the free list, and the page is
    ///   deallocated in storage.
    pub async fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let (frame_id, was_dirty) = {
            let mut state = self.inner.state.lock();
            let Some(&frame_id) = state.page_table.get(&page_id) else {
                return Ok(true);
            };
            if state.frame_meta[frame_id].pin_count > 0 {
                return Ok(false);
            }

            // Claim the frame: out of the replacer and out of the page table,
            // so no concurrent fetch or eviction can reach it.
            state.replacer.pin(frame_id);
            state.page_table.remove(&page_id);
            (frame_id, state.frame_meta[frame_id].is_dirty)
        };

        let write_back = {
            let mut data = self.inner.frames[frame_id].data.write().await;
            let result = if was_dirty {
                self.inner
                    .storage
                    .write_page(page_id, data.as_slice())
                    .await
            } else {
                Ok(())
            };
            if result.is_ok() {
                data.zero();
            }
            result
        };

        if let Err(e) = write_back {
            // Put the page back exactly as it was so the partition holds.
            let mut state = self.inner.state.lock();
            state.page_table.insert(page_id, frame_id);
            state.replacer.unpin(frame_id);
            return Err(e.into());
        }

        {
            let mut state = self.inner.state.lock();
            state.frame_meta[frame_id].reset();
            state.free_list.push(frame_id);
        }

        self.inner.storage.deallocate_page(page_id).await?;
        Ok(true)
    }

    /// Writes a page's current bytes to storage and clears its dirty flag.
    ///
    /// The write is unconditional for a cached page — a clean page is written
    /// too. Returns `Ok(false)` only when the page is not cached; this is a
    /// benign miss, not an error.
    pub async fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let frame_id = {
            let state = self.inner.state.lock();
            match state.page_table.get(&page_id) {
                Some(&frame_id) => frame_id,
                None => return Ok(false),
            }
        };

        self.inner.flush_frame(frame_id, page_id).await?;
        Ok(true)
    }

    /// Flushes every cached page to storage, then syncs the backend.
    ///
    /// Useful for checkpointing or graceful shutdown. Returns the first error
    /// encountered; later pages may remain unflushed in that case.
    pub async fn flush_all(&self) -> Result<(), BufferPoolError> {
        let targets: Vec<(FrameId, PageId)> = {
            let state = self.inner.state.lock();
            state
                .frame_meta
                .iter()
                .enumerate()
                .filter_map(|(frame_id, meta)| meta.page_id.map(|page_id| (frame_id, page_id)))
                .collect()
        };

        for (frame_id, page_id) in targets {
            self.inner.flush_frame(frame_id, page_id).await?;
        }

        self.inner.storage.sync_all().await?;
        Ok(())
    }
}

impl<S: Storage, R: Replacer> PoolInner<S, R> {
    /// Returns the frame holding `page_id`, pinned once, loading the page
    /// from storage on a miss.
    async fn get_or_load_frame(&self, page_id: PageId) -> Result<FrameId, BufferPoolError> {
        // Fast path: the page is already cached.
        {
            let mut state = self.state.lock();
            if let Some(&frame_id) = state.page_table.get(&page_id) {
                state.frame_meta[frame_id].pin_count += 1;
                state.replacer.pin(frame_id);
                return Ok(frame_id);
            }
        }

        // Miss: take a frame and read the page into it.
        let frame_id = self.acquire_frame().await?;

        let read_result = {
            let mut data = self.frames[frame_id].data.write().await;
            self.storage.read_page(page_id, data.as_mut_slice()).await
        };

        if let Err(e) = read_result {
            // Return the frame so it is not leaked from the partition.
            let mut state = self.state.lock();
            state.free_list.push(frame_id);
            return Err(e.into());
        }

        let mut state = self.state.lock();

        // Another task may have loaded this page while we were doing I/O.
        // Use its frame and discard ours: wasted I/O, but correct.
        if let Some(&existing) = state.page_table.get(&page_id) {
            state.free_list.push(frame_id);
            state.frame_meta[existing].pin_count += 1;
            state.replacer.pin(existing);
            return Ok(existing);
        }

        state.page_table.insert(page_id, frame_id);
        state.frame_meta[frame_id].install(page_id);
        Ok(frame_id)
    }

    /// Acquires a frame holding no page: from the free list if possible,
    /// otherwise by evicting an unpinned page.
    async fn acquire_frame(&self) -> Result<FrameId, BufferPoolError> {
        // Free frames are strictly cheaper: no write-back, no page-table
        // churn, and they are never in the replacer.
        {
            let mut state = self.state.lock();
            if let Some(frame_id) = state.free_list.pop() {
                return Ok(frame_id);
            }
        }

        loop {
            let (frame_id, old_page_id, is_dirty) = {
                let mut state = self.state.lock();
                let Some(frame_id) = state.replacer.victim() else {
                    return Err(BufferPoolError::PoolExhausted);
                };
                let meta = &state.frame_meta[frame_id];
                (frame_id, meta.page_id, meta.is_dirty)
            };

            // Write the victim back while holding only its data lock. The
            // page is still mapped, so a concurrent fetch may pin it.
            if is_dirty {
                if let Some(old_page_id) = old_page_id {
                    let write_result = {
                        let data = self.frames[frame_id].data.read().await;
                        self.storage.write_page(old_page_id, data.as_slice()).await
                    };
                    if let Err(e) = write_result {
                        let mut state = self.state.lock();
                        let meta = &state.frame_meta[frame_id];
                        // Only hand the frame back to the replacer if it still
                        // holds the victim page and nobody pinned it.
                        if meta.pin_count == 0 && meta.page_id == Some(old_page_id) {
                            state.replacer.unpin(frame_id);
                        }
                        return Err(e.into());
                    }
                }
            }

            let mut state = self.state.lock();

            // The victim was re-pinned during write-back, or the frame was
            // recycled out from under us (a concurrent delete freed it): pick
            // another victim.
            let meta = &state.frame_meta[frame_id];
            if meta.pin_count > 0 || meta.page_id != old_page_id {
                continue;
            }

            // A transient pin/unpin cycle during write-back may have re-added
            // the frame to the replacer; purge it before reuse.
            state.replacer.pin(frame_id);

            if let Some(old_page_id) = old_page_id {
                state.page_table.remove(&old_page_id);
            }
            state.frame_meta[frame_id].reset();
            return Ok(frame_id);
        }
    }

    /// Writes a frame's bytes to storage and clears its dirty flag.
    ///
    /// Non-locking flush core shared by `flush_page` and `flush_all` — the
    /// state mutex is taken only for the validity checks, never re-entrantly.
    async fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<(), BufferPoolError> {
        let data = self.frames[frame_id].data.read().await;

        // The frame may have been recycled while we waited for its lock.
        {
            let state = self.state.lock();
            if state.frame_meta[frame_id].page_id != Some(page_id) {
                return Ok(());
            }
        }

        self.storage.write_page(page_id, data.as_slice()).await?;

        let mut state = self.state.lock();
        if state.frame_meta[frame_id].page_id == Some(page_id) {
            state.frame_meta[frame_id].is_dirty = false;
        }
        Ok(())
    }

    /// Releases one pin on a frame. Called from the guards' `Drop`.
    ///
    /// Tolerates a frame whose pin was already released through
    /// [`BufferPool::unpin_page`]; the count never underflows.
    pub(super) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();

        let meta = &mut state.frame_meta[frame_id];
        if meta.pin_count == 0 {
            return;
        }
        meta.pin_count -= 1;
        meta.is_dirty |= is_dirty;
        let now_unpinned = meta.pin_count == 0;

        if now_unpinned {
            state.replacer.unpin(frame_id);
        }
    }
}
