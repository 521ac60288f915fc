//! File-backed storage implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::fs::{File as TokioFile, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{PageId, PAGE_SIZE};

/// File-backed storage implementation.
///
/// Stores pages as contiguous 4KB blocks in a single file.
/// Uses `tokio::fs` for async file I/O.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (4KB)     | Page 1 (4KB)     | Page 2 (4KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 4096      ^ offset 8192
/// ```
///
/// # Concurrency
///
/// Uses a `tokio::Mutex` around the file handle to serialize I/O operations.
///
/// # Durability
///
/// The `sync_all()` method calls `File::sync_all()` to ensure data reaches
/// disk. Without calling sync_all, data may be lost on crash.
pub struct FileStorage {
    /// Path to the storage file
    path: PathBuf,
    /// File handle wrapped in an async mutex for serialized access
    file: Mutex<TokioFile>,
    /// Number of pages currently in the file
    page_count: AtomicU32,
}

impl FileStorage {
    /// Opens or creates a storage file at the given path.
    ///
    /// If the file exists, its page count is calculated from file size.
    /// If the file doesn't exist, it is created empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Malformed` if the file size is not a multiple
    /// of PAGE_SIZE.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        let metadata = file.metadata().await?;
        let file_size = metadata.len();

        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::Malformed(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_count: AtomicU32::new(page_count),
        })
    }

    /// Returns the path to the storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::BufferLength(buf.len()));
        }

        let current_count = self.page_count.load(Ordering::Acquire);
        if page_id.page_num() >= current_count {
            return Err(StorageError::UnallocatedPage(page_id));
        }

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.read_exact(buf).await?;

        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::BufferLength(buf.len()));
        }

        let current_count = self.page_count.load(Ordering::Acquire);
        if page_id.page_num() >= current_count {
            return Err(StorageError::UnallocatedPage(page_id));
        }

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(buf).await?;

        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut file = self.file.lock().await;

        // Extend the file with a zeroed page at the current end.
        let page_num = self.page_count.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);

        file.seek(std::io::SeekFrom::Start(page_id.byte_offset()))
            .await?;
        file.write_all(&[0u8; PAGE_SIZE]).await?;

        self.page_count.store(page_num + 1, Ordering::Release);

        Ok(page_id)
    }

    async fn deallocate_page(&self, page_id: PageId) -> Result<(), StorageError> {
        // Advisory: the file is not shrunk and the bytes remain in place.
        let current_count = self.page_count.load(Ordering::Acquire);
        if page_id.page_num() >= current_count {
            return Err(StorageError::UnallocatedPage(page_id));
        }

        Ok(())
    }

    async fn page_count(&self) -> usize {
        self.page_count.load(Ordering::Acquire) as usize
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        let file = self.file.lock().await;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests as generic;
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Helper for creating temporary FileStorage instances for testing.
    struct TempFileStorage {
        dir: TempDir,
    }

    impl TempFileStorage {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        async fn storage(&self) -> FileStorage {
            FileStorage::open(self.dir.path().join("test.db"))
                .await
                .unwrap()
        }
    }

    // === Generic tests ===

    #[tokio::test]
    async fn test_basic_operations() {
        generic::test_basic_operations(TempFileStorage::new().storage().await).await;
    }

    #[tokio::test]
    async fn test_buffer_size_validation() {
        generic::test_buffer_size_validation(TempFileStorage::new().storage().await).await;
    }

    #[tokio::test]
    async fn test_unallocated_page() {
        generic::test_unallocated_page(TempFileStorage::new().storage().await).await;
    }

    #[tokio::test]
    async fn test_deallocate_keeps_page_readable() {
        generic::test_deallocate_keeps_page_readable(TempFileStorage::new().storage().await).await;
    }

    // === FileStorage-specific tests ===

    #[tokio::test]
    async fn test_create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = FileStorage::open(&path).await.unwrap();
        assert_eq!(storage.page_count().await, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_malformed_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        tokio::fs::write(&path, vec![0u8; 100]).await.unwrap();
        let result = FileStorage::open(&path).await;
        assert!(matches!(result, Err(StorageError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp = TempFileStorage::new();
        let mut page_ids = Vec::new();

        {
            let storage = temp.storage().await;
            for i in 0..5 {
                page_ids.push(generic::allocate_and_write(&storage, (i * 10) as u8).await);
            }
            storage.sync_all().await.unwrap();
        }

        {
            let storage = temp.storage().await;
            assert_eq!(storage.page_count().await, 5);
            for (i, &page_id) in page_ids.iter().enumerate() {
                generic::verify_fill(&storage, page_id, (i * 10) as u8).await;
            }
        }
    }

    #[tokio::test]
    async fn test_deallocate_preserves_bytes() {
        let temp = TempFileStorage::new();
        let storage = temp.storage().await;

        let page_id = generic::allocate_and_write(&storage, 0x5A).await;
        storage.deallocate_page(page_id).await.unwrap();

        // Deallocation is advisory for the file backend.
        generic::verify_fill(&storage, page_id, 0x5A).await;
    }
}
