//! Error type for the buffer pool.

use crate::storage::{PageId, StorageError};

/// Failures surfaced by buffer pool operations.
#[derive(Debug)]
pub enum BufferPoolError {
    /// Every frame is pinned, so nothing can be evicted to make room.
    ///
    /// Exhaustion, not corruption: the caller picks the policy, typically
    /// retrying once some pins drain, or failing the request upward.
    PoolExhausted,

    /// The page id resolves to nothing in the storage backend.
    UnknownPage(PageId),

    /// The storage backend failed underneath the pool.
    Backend(StorageError),
}

impl std::fmt::Display for BufferPoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferPoolError::PoolExhausted => {
                write!(f, "cannot evict: every buffer frame is pinned")
            }
            BufferPoolError::UnknownPage(page_id) => {
                write!(f, "page {:?} does not exist in storage", page_id)
            }
            BufferPoolError::Backend(e) => {
                write!(f, "storage backend failure: {}", e)
            }
        }
    }
}

impl std::error::Error for BufferPoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferPoolError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for BufferPoolError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UnallocatedPage(id) => BufferPoolError::UnknownPage(id),
            other => BufferPoolError::Backend(other),
        }
    }
}
