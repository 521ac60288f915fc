//! B+Tree index pages.
//!
//! This module interprets the raw bytes of pinned buffer pool frames as
//! B+Tree nodes and implements the in-place slot-array mutations the tree
//! layer builds on: sorted insert/lookup/remove plus the split, merge, and
//! redistribution primitives.
//!
//! Two node kinds share a common 24-byte header:
//!
//! - [`LeafPage`]: sorted `(key, RecordId)` pairs with a right-sibling link
//!   for range scans.
//! - [`InternalPage`]: sorted `(key, child PageId)` pairs where slot 0's key
//!   is a sentinel and real separators start at slot 1.
//!
//! The views are parametric over the key type ([`IndexKey`]) and over the
//! underlying byte container, so the same code serves `&[u8]`, `&mut [u8]`,
//! and the buffer pool guards. Tree traversal, latch crabbing, and
//! split/merge *policy* live a layer above; this module only provides the
//! page mechanics.

mod header;
mod internal;
mod key;
mod leaf;
mod rid;

pub use header::{TreePageHeader, TreePageKind, TREE_PAGE_HEADER_LEN};
pub use internal::InternalPage;
pub use key::{FixedKey, IndexKey};
pub use leaf::LeafPage;
pub use rid::RecordId;
