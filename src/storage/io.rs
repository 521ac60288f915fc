//! Page I/O backend implementations.
//!
//! This module provides the `Storage` trait for page-based I/O operations,
//! along with MemoryStorage and FileStorage implementations.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::page::PageId;
use crate::storage::error::StorageError;

/// Page I/O backend trait for page-based storage.
///
/// This trait defines the interface for reading and writing 4KB pages using
/// caller-owned buffers. Implementations include:
/// - `io::MemoryStorage`: In-memory storage
/// - `io::FileStorage`: Disk-backed storage using tokio::fs
///
/// # Design Decisions
///
/// 1. **Async trait**: Uses `async fn` (Rust 1.75+) for compatibility with
///    tokio. These disk calls are the only suspension points in the crate.
///
/// 2. **Caller-owned buffers**: Storage is responsible for reading and writing
///    raw bytes only. Memory management is the responsibility of the caller
///    (the buffer pool).
///
/// 3. **Page-level operations**: All I/O is page-sized (4KB) for alignment
///    with OS page sizes and efficient disk I/O.
///
/// 4. **Explicit allocation**: `allocate_page()` grows the storage and assigns
///    page numbers monotonically — a page number is never reused within a run.
///    `deallocate_page()` is advisory: the backends keep the page readable and
///    reclaim nothing.
///
/// 5. **No caching**: This layer does not cache pages. Caching is the
///    responsibility of the buffer pool.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Sync + Send). The buffer pool handles
/// page-level locking; this trait handles only raw I/O.
pub trait Storage: Send + Sync {
    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnallocatedPage` if the page has not been
    /// allocated, and `StorageError::BufferLength` if `buf.len() != PAGE_SIZE`.
    fn read_page(
        &self,
        page_id: PageId,
        buf: &mut [u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Writes a page from a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnallocatedPage` if the page has not been
    /// allocated, and `StorageError::BufferLength` if `buf.len() != PAGE_SIZE`.
    fn write_page(
        &self,
        page_id: PageId,
        buf: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Allocates a new page and returns its PageId.
    ///
    /// The new page is initialized to zeros. The first call on an empty
    /// storage is guaranteed to return `PageId(0)`, and subsequent calls
    /// assign page numbers monotonically.
    fn allocate_page(
        &self,
    ) -> impl std::future::Future<Output = Result<PageId, StorageError>> + Send;

    /// Releases a page back to the storage backend.
    ///
    /// Deallocation is advisory: the page stays readable (MemoryStorage clears
    /// it to zeros, FileStorage leaves the bytes in place) and its page number
    /// is not reused. Deallocating an unallocated page is an error.
    fn deallocate_page(
        &self,
        page_id: PageId,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Returns the total number of allocated pages.
    fn page_count(&self) -> impl std::future::Future<Output = usize> + Send;

    /// Syncs all pending writes to physical disk (fsync).
    ///
    /// For io::MemoryStorage, this is a no-op.
    /// For io::FileStorage, this calls `sync_all()` to ensure durability.
    fn sync_all(&self) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}
