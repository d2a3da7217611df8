//! Page structure definition
//!
//! A Page is a page id plus exactly `PAGE_SIZE` bytes of payload. The buffer
//! pool never interprets the payload; record and index code above it does.

use crate::types::{INVALID_PAGE_ID, PAGE_SIZE, PageId};
use std::fmt;

/// Core Page structure for the storage engine
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    /// Page ID of this page inside its store
    page_id: PageId,
    /// Heap allocated payload of size PAGE_SIZE
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    /// Creates a zeroed page with the given id
    #[inline]
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Creates a page from raw payload bytes.
    ///
    /// Shorter input is zero padded; bytes past `PAGE_SIZE` are ignored.
    pub fn from_bytes(page_id: PageId, bytes: &[u8]) -> Self {
        let mut page = Self::new(page_id);
        let len = bytes.len().min(PAGE_SIZE);
        page.data[..len].copy_from_slice(&bytes[..len]);
        page
    }

    /// Returns the id of this page
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Reassigns the id of this page
    #[inline]
    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    /// Returns true if the page carries a real id
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.page_id != INVALID_PAGE_ID
    }

    /// Read-only view of the payload
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Mutable view of the payload
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Copies `bytes` into the payload at `offset`.
    ///
    /// Returns false and leaves the page untouched if the range does not fit.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> bool {
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= PAGE_SIZE => {
                self.data[offset..end].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    /// Returns the size of a page payload in bytes
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }
}

impl Default for Page {
    #[inline]
    fn default() -> Self {
        Self::new(INVALID_PAGE_ID)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.page_id)
            .field("checksum", &crc32fast::hash(self.data()))
            .finish()
    }
}
