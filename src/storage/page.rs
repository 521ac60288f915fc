//! Page identifier and size constants.

mod data;

pub use data::PageData;

/// 4KB page size (aligned with the OS page size).
pub const PAGE_SIZE: usize = 4096;

/// Raw on-disk encoding of "no page".
///
/// Page ids are persisted as little-endian `i32`, with `-1` reserved for an
/// absent reference (no parent, no right sibling, empty frame). In memory the
/// absent case is expressed as `Option<PageId>`; the raw form only appears at
/// the byte boundary.
pub const INVALID_PAGE_ID: i32 = -1;

/// Unique identifier for a page within the storage system.
///
/// A `PageId` is a 32-bit page number assigned monotonically by the storage
/// backend and never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Creates a new PageId from a page number.
    pub const fn new(page_num: u32) -> Self {
        Self(page_num)
    }

    /// Returns the page number.
    pub const fn page_num(&self) -> u32 {
        self.0
    }

    /// Calculates the byte offset for this page in a storage file.
    ///
    /// This is used by FileStorage to seek to the correct position.
    pub const fn byte_offset(&self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }

    /// Encodes an optional page reference into its raw on-disk form.
    pub const fn to_raw(page_id: Option<PageId>) -> i32 {
        match page_id {
            Some(id) => id.0 as i32,
            None => INVALID_PAGE_ID,
        }
    }

    /// Decodes a raw on-disk page reference.
    ///
    /// Any negative value is treated as "no page".
    pub const fn from_raw(raw: i32) -> Option<PageId> {
        if raw < 0 {
            None
        } else {
            Some(PageId(raw as u32))
        }
    }
}
