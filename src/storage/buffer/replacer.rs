//! Page replacement policies for the buffer pool.
//!
//! The replacer tracks which frames are evictable (unpinned) and selects
//! victims for eviction when the buffer pool needs free frames.

use super::frame::FrameId;
use std::collections::{HashSet, VecDeque};

/// Trait for page replacement policies.
///
/// # Usage
///
/// ```text
/// // When a frame's pin_count drops to 0
/// replacer.unpin(frame_id);
///
/// // When a frame's pin_count increases from 0
/// replacer.pin(frame_id);
///
/// // When the buffer pool needs a victim
/// if let Some(victim) = replacer.victim() {
///     // Evict the victim frame
/// }
/// ```
///
/// # Thread Safety
///
/// The buffer pool calls the replacer only while holding its state mutex, so
/// implementations need `Send` but no internal locking.
pub trait Replacer: Send {
    /// Selects a victim frame for eviction.
    ///
    /// Returns the least desirable evictable frame and removes it from the
    /// replacer's tracking, or `None` if every frame is pinned. An empty
    /// replacer is not an error; the pool maps it to resource exhaustion.
    fn victim(&mut self) -> Option<FrameId>;

    /// Marks a frame as non-evictable.
    ///
    /// Called when a frame's pin count increases from 0, or when the pool
    /// claims a frame for its own purposes (deletion, eviction). If the frame
    /// is not present, this is a no-op.
    fn pin(&mut self, frame_id: FrameId);

    /// Marks a frame as evictable.
    ///
    /// Called when a frame's pin count drops to 0.
    fn unpin(&mut self, frame_id: FrameId);

    /// Returns the number of evictable frames.
    fn size(&self) -> usize;
}

/// LRU (Least Recently Used) page replacement policy.
///
/// Frames are ordered by recency of unpin: `victim()` returns the frame whose
/// unpin is furthest in the past. Unpinning a frame that is already tracked is
/// a no-op and does **not** refresh its position — the pool only unpins on the
/// 1 → 0 pin transition, so a second unpin for the same frame is spurious and
/// must not re-order it.
///
/// # Data Structure
///
/// - `queue: VecDeque<FrameId>` in LRU order (front = least recently unpinned)
/// - `members: HashSet<FrameId>` for O(1) membership testing
///
/// Membership updates are eager: `pin` removes the frame from both structures,
/// so the queue never holds stale entries and `size()` is exact. The removal
/// scan is O(n); with pool-sized replacers this is fine, and it keeps
/// "frame is in the replacer" a crisp invariant for the pool to rely on.
pub struct LruReplacer {
    /// Frames in LRU order. Front = least recently unpinned.
    queue: VecDeque<FrameId>,

    /// Membership index over `queue`.
    members: HashSet<FrameId>,

    /// Maximum number of tracked frames.
    ///
    /// Inserting beyond the capacity drops the least-recent entry.
    capacity: usize,
}

impl LruReplacer {
    /// Creates an LRU replacer that tracks at most `capacity` frames.
    ///
    /// The capacity normally matches the pool size: every frame can be
    /// unpinned at once, and no more.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }
}

impl Replacer for LruReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self.queue.pop_front()?;
        self.members.remove(&frame_id);
        Some(frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        if self.members.remove(&frame_id) {
            if let Some(pos) = self.queue.iter().position(|&id| id == frame_id) {
                self.queue.remove(pos);
            }
        }
    }

    fn unpin(&mut self, frame_id: FrameId) {
        // Already tracked: spurious unpin, keep the original position.
        if self.members.contains(&frame_id) {
            return;
        }

        if self.queue.len() == self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                self.members.remove(&oldest);
            }
        }

        self.queue.push_back(frame_id);
        self.members.insert(frame_id);
    }

    fn size(&self) -> usize {
        self.queue.len()
    }
}
