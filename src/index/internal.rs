//! B+Tree internal pages.

use std::marker::PhantomData;

use crate::storage::{BufferPool, BufferPoolError, PageId, Replacer, Storage, PAGE_SIZE};

use super::header::{self, TreePageHeader, TreePageKind, TREE_PAGE_HEADER_LEN};
use super::key::IndexKey;

/// Start of the slot array.
const INTERNAL_SLOTS_OFFSET: usize = TREE_PAGE_HEADER_LEN;

/// A B+Tree internal page: a sorted array of `(key, child PageId)` pairs.
///
/// ```text
/// +---------------------+ offset 0
/// | common header (24B) |
/// +---------------------+ offset 24
/// | (key, child) slot 0 |  slot 0's key is a sentinel, never compared
/// | (key, child) slot 1 |  slots 1.. hold the real separator keys
/// | ...                 |
/// +---------------------+ offset 4096
/// ```
///
/// The invariant is `key_at(i)` = least key reachable through `value_at(i)`
/// for `i >= 1`: child `i` covers keys in `[key_at(i), key_at(i+1))`, with
/// child 0 covering everything below `key_at(1)`.
///
/// Moving children between internal pages changes their parent, so the move
/// operations take the buffer pool and "adopt" each moved child by fetching
/// it and rewriting its header's parent pointer. Each adoption is a fresh,
/// non-nested pool call; no pool lock is held while a page view exists.
pub struct InternalPage<T, K> {
    data: T,
    _key: PhantomData<K>,
}

impl<T: AsRef<[u8]>, K: IndexKey> InternalPage<T, K> {
    /// Creates an internal page view over the given data.
    ///
    /// # Panics
    ///
    /// Panics if `data.as_ref().len() != PAGE_SIZE`.
    pub fn new(data: T) -> Self {
        assert_eq!(
            data.as_ref().len(),
            PAGE_SIZE,
            "internal page view requires a full page buffer"
        );
        Self {
            data,
            _key: PhantomData,
        }
    }

    /// Width of one slot entry in bytes.
    const fn entry_len() -> usize {
        K::ENCODED_LEN + 4
    }

    /// Maximum number of pairs that physically fit in a page.
    pub const fn capacity() -> usize {
        (PAGE_SIZE - INTERNAL_SLOTS_OFFSET) / Self::entry_len()
    }

    fn entry_offset(index: usize) -> usize {
        INTERNAL_SLOTS_OFFSET + index * Self::entry_len()
    }

    /// Number of occupied slots (children), including the sentinel slot.
    pub fn size(&self) -> usize {
        header::size(self.data.as_ref())
    }

    /// Split threshold recorded at init.
    pub fn max_size(&self) -> usize {
        header::max_size(self.data.as_ref())
    }

    /// This page's id as recorded in the header.
    pub fn page_id(&self) -> Option<PageId> {
        header::page_id(self.data.as_ref())
    }

    /// Parent node, or `None` for the root.
    pub fn parent_page_id(&self) -> Option<PageId> {
        header::parent_page_id(self.data.as_ref())
    }

    /// Key in slot `index`. Slot 0's key is a sentinel with no meaning.
    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index < self.size());
        K::read_from(&self.data.as_ref()[Self::entry_offset(index)..])
    }

    /// Child page id in slot `index`.
    pub fn value_at(&self, index: usize) -> PageId {
        debug_assert!(index < self.size());
        let offset = Self::entry_offset(index) + K::ENCODED_LEN;
        let data = self.data.as_ref();
        PageId::new(u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]))
    }

    /// Finds the slot whose child is `value`, or `None`.
    pub fn value_index(&self, value: PageId) -> Option<usize> {
        (0..self.size()).find(|&index| self.value_at(index) == value)
    }

    /// Returns the child page covering `key`.
    ///
    /// This is the child of the greatest separator `<= key`; keys below the
    /// first separator route to child 0.
    pub fn lookup(&self, key: &K) -> PageId {
        debug_assert_eq!(header::kind(self.data.as_ref()), TreePageKind::Internal);
        let size = self.size();
        debug_assert!(size >= 1);

        if size == 1 || *key < self.key_at(1) {
            return self.value_at(0);
        }

        // Greatest index in [1, size) with key_at(index) <= key. The midpoint
        // rounds up so `lo` always advances.
        let mut lo = 1;
        let mut hi = size - 1;
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.key_at(mid) <= *key {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        self.value_at(lo)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, K: IndexKey> InternalPage<T, K> {
    /// Initializes a fresh internal page: empty, type INTERNAL.
    pub fn init(&mut self, page_id: PageId, parent_page_id: Option<PageId>, max_size: usize) {
        debug_assert!(max_size <= Self::capacity());
        TreePageHeader {
            kind: TreePageKind::Internal,
            lsn: 0,
            size: 0,
            max_size: max_size as i32,
            parent_page_id,
            page_id: Some(page_id),
        }
        .write_to(self.data.as_mut());
    }

    /// Updates the parent pointer.
    pub fn set_parent_page_id(&mut self, parent: Option<PageId>) {
        header::set_parent_page_id(self.data.as_mut(), parent);
    }

    /// Overwrites the key in slot `index`.
    pub fn set_key_at(&mut self, index: usize, key: K) {
        debug_assert!(index < self.size());
        let offset = Self::entry_offset(index);
        key.write_to(&mut self.data.as_mut()[offset..]);
    }

    /// Overwrites the child in slot `index`.
    pub fn set_value_at(&mut self, index: usize, value: PageId) {
        debug_assert!(index < self.size());
        let offset = Self::entry_offset(index) + K::ENCODED_LEN;
        self.data.as_mut()[offset..offset + 4].copy_from_slice(&value.page_num().to_le_bytes());
    }

    /// Populates a just-created root with exactly two children separated by
    /// `new_key`. Size becomes 2; slot 0's key stays a sentinel.
    pub fn populate_new_root(&mut self, old_child: PageId, new_key: K, new_child: PageId) {
        header::set_size(self.data.as_mut(), 2);
        self.set_value_at(0, old_child);
        self.set_key_at(1, new_key);
        self.set_value_at(1, new_child);
    }

    /// Inserts `(new_key, new_child)` in the slot right after the one whose
    /// child is `old_child`.
    ///
    /// Returns the size after insertion. If `old_child` is not present the
    /// page is left unchanged (the tree layer guarantees it is).
    pub fn insert_node_after(&mut self, old_child: PageId, new_key: K, new_child: PageId) -> usize {
        let Some(index) = self.value_index(old_child) else {
            return self.size();
        };
        self.insert_at(index + 1, new_key, new_child);
        self.size()
    }

    /// Removes the pair in slot `index`, keeping the remainder contiguous.
    pub fn remove(&mut self, index: usize) {
        let size = self.size();
        debug_assert!(index < size);

        let start = Self::entry_offset(index + 1);
        let end = Self::entry_offset(size);
        let data = self.data.as_mut();
        data.copy_within(start..end, Self::entry_offset(index));
        header::set_size(data, size - 1);
    }

    /// Collapses a single-child root: removes and returns the only child.
    ///
    /// Returns `None` unless the page holds exactly one child.
    pub fn remove_and_return_only_child(&mut self) -> Option<PageId> {
        if self.size() != 1 {
            return None;
        }
        let only_child = self.value_at(0);
        self.remove(0);
        Some(only_child)
    }

    /// Moves the trailing half (⌊size/2⌋ pairs) to `recipient`, appended,
    /// adopting each moved child.
    pub async fn move_half_to<U, S, R>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        U: AsRef<[u8]> + AsMut<[u8]>,
        S: Storage,
        R: Replacer,
    {
        let size = self.size();
        let remaining = size - size / 2;
        for index in remaining..size {
            recipient
                .copy_last_from(self.key_at(index), self.value_at(index), pool)
                .await?;
        }
        header::set_size(self.data.as_mut(), remaining);
        Ok(())
    }

    /// Moves every pair to `recipient` (the left sibling), adopting each
    /// child.
    ///
    /// `middle_key` is the parent's separator between the two siblings; it
    /// becomes the key of this page's first child in the recipient, since
    /// slot 0's key carries no information of its own.
    pub async fn move_all_to<U, S, R>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: K,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        U: AsRef<[u8]> + AsMut<[u8]>,
        S: Storage,
        R: Replacer,
    {
        let size = self.size();
        for index in 0..size {
            let key = if index == 0 {
                middle_key
            } else {
                self.key_at(index)
            };
            recipient
                .copy_last_from(key, self.value_at(index), pool)
                .await?;
        }
        header::set_size(self.data.as_mut(), 0);
        Ok(())
    }

    /// Moves the first pair to the end of `recipient` (the left sibling).
    ///
    /// The moved child enters the recipient under `middle_key`, the parent's
    /// separator between the siblings.
    pub async fn move_first_to_end_of<U, S, R>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: K,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        U: AsRef<[u8]> + AsMut<[u8]>,
        S: Storage,
        R: Replacer,
    {
        recipient
            .copy_last_from(middle_key, self.value_at(0), pool)
            .await?;
        self.remove(0);
        Ok(())
    }

    /// Moves the last pair to the front of `recipient` (the right sibling).
    pub async fn move_last_to_front_of<U, S, R>(
        &mut self,
        recipient: &mut InternalPage<U, K>,
        middle_key: K,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        U: AsRef<[u8]> + AsMut<[u8]>,
        S: Storage,
        R: Replacer,
    {
        let last = self.size() - 1;
        recipient
            .copy_first_from(middle_key, self.value_at(last), pool)
            .await?;
        self.remove(last);
        Ok(())
    }

    /// Appends a pair and adopts the child.
    async fn copy_last_from<S, R>(
        &mut self,
        key: K,
        child: PageId,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        S: Storage,
        R: Replacer,
    {
        self.insert_at(self.size(), key, child);
        self.adopt(child, pool).await
    }

    /// Prepends a pair and adopts the child.
    ///
    /// The new child becomes slot 0; the previous first child slides to slot
    /// 1 and takes `middle_key` as its separator, re-establishing the
    /// sentinel invariant.
    async fn copy_first_from<S, R>(
        &mut self,
        middle_key: K,
        child: PageId,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        S: Storage,
        R: Replacer,
    {
        self.insert_at(0, middle_key, child);
        self.set_key_at(1, middle_key);
        self.adopt(child, pool).await
    }

    /// Points `child`'s parent pointer at this page, through the pool.
    async fn adopt<S, R>(
        &self,
        child: PageId,
        pool: &BufferPool<S, R>,
    ) -> Result<(), BufferPoolError>
    where
        S: Storage,
        R: Replacer,
    {
        debug_assert!(self.page_id().is_some());
        let mut guard = pool.fetch_page_mut(child).await?;
        header::set_parent_page_id(&mut guard, self.page_id());
        Ok(())
    }

    fn insert_at(&mut self, index: usize, key: K, value: PageId) {
        let size = self.size();
        debug_assert!(index <= size);
        debug_assert!(size < Self::capacity());

        let start = Self::entry_offset(index);
        let end = Self::entry_offset(size);
        let data = self.data.as_mut();
        data.copy_within(start..end, start + Self::entry_len());
        key.write_to(&mut data[start..]);
        data[start + K::ENCODED_LEN..start + Self::entry_len()]
            .copy_from_slice(&value.page_num().to_le_bytes());
        header::set_size(data, size + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PageId {
        PageId::new(n)
    }

    /// Builds an internal page with children c0..=cN and separators at 10*i:
    /// [(-, c0), (10, c1), (20, c2), ...]
    fn build_internal(buf: &mut Vec<u8>, children: usize) -> InternalPage<&mut [u8], u32> {
        let mut page = InternalPage::new(buf.as_mut_slice());
        page.init(pid(100), None, 16);
        page.populate_new_root(pid(0), 10, pid(1));
        for child in 2..children as u32 {
            page.insert_node_after(pid(child - 1), child * 10, pid(child));
        }
        page
    }

    #[test]
    fn test_init() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page: InternalPage<_, u32> = InternalPage::new(buf.as_mut_slice());
        page.init(pid(7), Some(pid(3)), 16);

        assert_eq!(page.size(), 0);
        assert_eq!(page.max_size(), 16);
        assert_eq!(page.page_id(), Some(pid(7)));
        assert_eq!(page.parent_page_id(), Some(pid(3)));
    }

    #[test]
    fn test_populate_new_root() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page: InternalPage<_, u32> = InternalPage::new(buf.as_mut_slice());
        page.init(pid(100), None, 16);
        page.populate_new_root(pid(1), 50, pid(2));

        assert_eq!(page.size(), 2);
        assert_eq!(page.value_at(0), pid(1));
        assert_eq!(page.key_at(1), 50);
        assert_eq!(page.value_at(1), pid(2));
    }

    #[test]
    fn test_insert_node_after() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page: InternalPage<_, u32> = InternalPage::new(buf.as_mut_slice());
        page.init(pid(100), None, 16);
        page.populate_new_root(pid(0), 20, pid(2));

        // Insert (10, c1) right after child 0.
        assert_eq!(page.insert_node_after(pid(0), 10, pid(1)), 3);
        assert_eq!(page.value_at(0), pid(0));
        assert_eq!(page.key_at(1), 10);
        assert_eq!(page.value_at(1), pid(1));
        assert_eq!(page.key_at(2), 20);
        assert_eq!(page.value_at(2), pid(2));

        // An absent anchor leaves the page unchanged.
        assert_eq!(page.insert_node_after(pid(99), 30, pid(3)), 3);
    }

    #[test]
    fn test_value_index() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let page = build_internal(&mut buf, 4);

        assert_eq!(page.value_index(pid(0)), Some(0));
        assert_eq!(page.value_index(pid(2)), Some(2));
        assert_eq!(page.value_index(pid(3)), Some(3));
        assert_eq!(page.value_index(pid(42)), None);
    }

    #[test]
    fn test_lookup_routes_by_separator() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let page = build_internal(&mut buf, 4);
        // Layout: [(-, c0), (10, c1), (20, c2), (30, c3)]

        assert_eq!(page.lookup(&0), pid(0));
        assert_eq!(page.lookup(&9), pid(0));
        assert_eq!(page.lookup(&10), pid(1)); // Exact separator match.
        assert_eq!(page.lookup(&15), pid(1));
        assert_eq!(page.lookup(&20), pid(2));
        assert_eq!(page.lookup(&29), pid(2));
        assert_eq!(page.lookup(&30), pid(3));
        assert_eq!(page.lookup(&1000), pid(3));
    }

    #[test]
    fn test_lookup_single_child() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page: InternalPage<_, u32> = InternalPage::new(buf.as_mut_slice());
        page.init(pid(100), None, 16);
        page.populate_new_root(pid(5), 10, pid(6));
        page.remove(1);

        assert_eq!(page.size(), 1);
        assert_eq!(page.lookup(&0), pid(5));
        assert_eq!(page.lookup(&99), pid(5));
    }

    #[test]
    fn test_remove_keeps_contiguous() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = build_internal(&mut buf, 4);

        page.remove(2);
        assert_eq!(page.size(), 3);
        assert_eq!(page.value_at(0), pid(0));
        assert_eq!(page.key_at(1), 10);
        assert_eq!(page.key_at(2), 30);
        assert_eq!(page.value_at(2), pid(3));
    }

    #[test]
    fn test_remove_and_return_only_child() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = build_internal(&mut buf, 2);

        // Two children: not collapsible yet.
        assert_eq!(page.remove_and_return_only_child(), None);

        page.remove(1);
        assert_eq!(page.remove_and_return_only_child(), Some(pid(0)));
        assert_eq!(page.size(), 0);
    }

    #[test]
    fn test_set_key_and_value() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = build_internal(&mut buf, 3);

        page.set_key_at(1, 15);
        page.set_value_at(1, pid(77));
        assert_eq!(page.key_at(1), 15);
        assert_eq!(page.value_at(1), pid(77));
    }

    #[test]
    fn test_capacity() {
        // (4096 - 24) / (4 + 4) = 509 pairs for u32 keys.
        assert_eq!(InternalPage::<&[u8], u32>::capacity(), 509);
    }
}
