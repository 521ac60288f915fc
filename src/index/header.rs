//! Common header for B+Tree pages.
//!
//! Both node kinds start with the same 24-byte header, all fields
//! little-endian `i32`:
//!
//! ```text
//! offset  0: page_type        (0 = invalid, 1 = leaf, 2 = internal)
//! offset  4: lsn              (carried for layout compatibility, written 0)
//! offset  8: size             (number of occupied slots)
//! offset 12: max_size         (split threshold set by the tree layer)
//! offset 16: parent_page_id   (-1 = root)
//! offset 20: page_id
//! ```
//!
//! The buffer pool never interprets this header; it reads and writes raw
//! 4KB buffers. Interpretation happens in the leaf/internal page views,
//! which use the in-place field accessors below for their hot paths and the
//! [`TreePageHeader`] struct for whole-header initialization.

use crate::storage::PageId;

/// Size of the tree page header in bytes.
pub const TREE_PAGE_HEADER_LEN: usize = 24;

const OFFSET_PAGE_TYPE: usize = 0;
const OFFSET_LSN: usize = 4;
const OFFSET_SIZE: usize = 8;
const OFFSET_MAX_SIZE: usize = 12;
const OFFSET_PARENT_PAGE_ID: usize = 16;
const OFFSET_PAGE_ID: usize = 20;

/// B+Tree page kinds.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreePageKind {
    /// Uninitialized page.
    Invalid = 0,
    /// Leaf node holding `(key, RecordId)` pairs.
    Leaf = 1,
    /// Internal node holding `(key, child PageId)` pairs.
    Internal = 2,
}

impl TryFrom<i32> for TreePageKind {
    type Error = i32;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TreePageKind::Invalid),
            1 => Ok(TreePageKind::Leaf),
            2 => Ok(TreePageKind::Internal),
            _ => Err(v),
        }
    }
}

/// Decoded form of the common header.
#[derive(Debug, Clone, Copy)]
pub struct TreePageHeader {
    /// Kind of this page.
    pub kind: TreePageKind,
    /// Log sequence number of the last modification. Carried for layout
    /// compatibility; nothing in this crate advances it.
    pub lsn: i32,
    /// Number of occupied slots.
    pub size: i32,
    /// Slot count at which the tree layer splits the page.
    pub max_size: i32,
    /// Parent node, or `None` for the root.
    pub parent_page_id: Option<PageId>,
    /// This page's own id.
    pub page_id: Option<PageId>,
}

impl TreePageHeader {
    /// Reads a header from the start of a page byte slice.
    pub fn read_from(data: &[u8]) -> Self {
        Self {
            kind: TreePageKind::try_from(read_i32(data, OFFSET_PAGE_TYPE))
                .unwrap_or(TreePageKind::Invalid),
            lsn: read_i32(data, OFFSET_LSN),
            size: read_i32(data, OFFSET_SIZE),
            max_size: read_i32(data, OFFSET_MAX_SIZE),
            parent_page_id: PageId::from_raw(read_i32(data, OFFSET_PARENT_PAGE_ID)),
            page_id: PageId::from_raw(read_i32(data, OFFSET_PAGE_ID)),
        }
    }

    /// Writes the header to the start of a page byte slice.
    pub fn write_to(&self, data: &mut [u8]) {
        write_i32(data, OFFSET_PAGE_TYPE, self.kind as i32);
        write_i32(data, OFFSET_LSN, self.lsn);
        write_i32(data, OFFSET_SIZE, self.size);
        write_i32(data, OFFSET_MAX_SIZE, self.max_size);
        write_i32(data, OFFSET_PARENT_PAGE_ID, PageId::to_raw(self.parent_page_id));
        write_i32(data, OFFSET_PAGE_ID, PageId::to_raw(self.page_id));
    }
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn write_i32(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// In-place field accessors used by the page views.

pub(crate) fn kind(data: &[u8]) -> TreePageKind {
    TreePageKind::try_from(read_i32(data, OFFSET_PAGE_TYPE)).unwrap_or(TreePageKind::Invalid)
}

pub(crate) fn size(data: &[u8]) -> usize {
    read_i32(data, OFFSET_SIZE).max(0) as usize
}

pub(crate) fn set_size(data: &mut [u8], size: usize) {
    write_i32(data, OFFSET_SIZE, size as i32);
}

pub(crate) fn max_size(data: &[u8]) -> usize {
    read_i32(data, OFFSET_MAX_SIZE).max(0) as usize
}

pub(crate) fn parent_page_id(data: &[u8]) -> Option<PageId> {
    PageId::from_raw(read_i32(data, OFFSET_PARENT_PAGE_ID))
}

/// Rewrites a tree page's parent pointer, regardless of node kind.
///
/// This is the "adopt" primitive: when an internal page absorbs children it
/// fetches each one through the buffer pool and points its header back at the
/// new parent.
pub(crate) fn set_parent_page_id(data: &mut [u8], parent: Option<PageId>) {
    write_i32(data, OFFSET_PARENT_PAGE_ID, PageId::to_raw(parent));
}

pub(crate) fn page_id(data: &[u8]) -> Option<PageId> {
    PageId::from_raw(read_i32(data, OFFSET_PAGE_ID))
}
