//! In-memory page storage implementation.

use std::sync::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::PageData;
use crate::storage::page::{PageId, PAGE_SIZE};

/// In-memory page storage for testing and development.
///
/// Stores pages in a Vec backed by aligned memory allocations.
/// PageIds are assigned sequentially as Vec indices. Deallocated pages keep
/// their slot (page numbers are never reused) but are cleared to zeros.
///
/// All operations are synchronous but exposed through the async trait for
/// compatibility with the file backend.
pub struct MemoryStorage {
    pages: Mutex<Vec<PageData>>,
}

impl MemoryStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(Vec::new()),
        }
    }
}

impl Storage for MemoryStorage {
    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::BufferLength(buf.len()));
        }

        let pages = self.pages.lock().unwrap();
        let page = pages
            .get(page_id.page_num() as usize)
            .ok_or(StorageError::UnallocatedPage(page_id))?;

        buf.copy_from_slice(page.as_slice());
        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::BufferLength(buf.len()));
        }

        let mut pages = self.pages.lock().unwrap();
        let page = pages
            .get_mut(page_id.page_num() as usize)
            .ok_or(StorageError::UnallocatedPage(page_id))?;

        page.as_mut_slice().copy_from_slice(buf);
        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut pages = self.pages.lock().unwrap();
        let page_id = PageId::new(pages.len() as u32);
        pages.push(PageData::new());
        Ok(page_id)
    }

    async fn deallocate_page(&self, page_id: PageId) -> Result<(), StorageError> {
        let mut pages = self.pages.lock().unwrap();
        let page = pages
            .get_mut(page_id.page_num() as usize)
            .ok_or(StorageError::UnallocatedPage(page_id))?;

        page.zero();
        Ok(())
    }

    async fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        // No-op for in-memory storage
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
