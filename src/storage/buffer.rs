//! Buffer pool for page caching.
//!
//! The buffer pool caches pages in a fixed set of in-memory frames, gates
//! eviction on pin counts, and writes dirty frames back through the storage
//! backend. Access goes through RAII guards that pin the page for their
//! lifetime.
//!
//! # Example
//!
//! ```no_run
//! use plinth::storage::{BufferPool, BufferPoolConfig, LruReplacer, MemoryStorage};
//!
//! # async fn example() {
//! let storage = MemoryStorage::new();
//! let replacer = LruReplacer::new(64);
//! let pool = BufferPool::new(storage, replacer, BufferPoolConfig { pool_size: 64 });
//!
//! // Allocate and write a new page
//! let mut guard = pool.new_page().await.unwrap();
//! let page_id = guard.page_id();
//! guard[0..5].copy_from_slice(b"hello");
//! drop(guard); // Unpins and leaves the frame dirty
//!
//! // Read the page back
//! let guard = pool.fetch_page(page_id).await.unwrap();
//! assert_eq!(&guard[0..5], b"hello");
//! # }
//! ```

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::BufferPoolError;
pub use frame::FrameId;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use pool::{BufferPool, BufferPoolConfig};
pub use replacer::{LruReplacer, Replacer};
