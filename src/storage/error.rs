//! Error type for the storage layer.

use crate::storage::{PageId, PAGE_SIZE};

/// Failures surfaced by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug)]
pub enum StorageError {
    /// A page id the backend never handed out.
    ///
    /// Reads, writes, and deallocations are only valid for ids previously
    /// returned by `allocate_page`.
    UnallocatedPage(PageId),

    /// A read or write used a buffer of the wrong length.
    ///
    /// Page I/O moves whole pages; the caller's buffer must be exactly
    /// `PAGE_SIZE` bytes. Carries the offending length.
    BufferLength(usize),

    /// The operating system reported an I/O failure.
    Io(std::io::Error),

    /// The backing file does not look like a page store.
    ///
    /// Raised on open when the file size is not a whole number of pages.
    Malformed(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::UnallocatedPage(page_id) => {
                write!(f, "page {:?} was never allocated", page_id)
            }
            StorageError::BufferLength(len) => {
                write!(f, "page buffers must be {} bytes, got {}", PAGE_SIZE, len)
            }
            StorageError::Io(e) => write!(f, "storage I/O failed: {}", e),
            StorageError::Malformed(reason) => {
                write!(f, "not a valid page store: {}", reason)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
