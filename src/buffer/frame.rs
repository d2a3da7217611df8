//! Frame table
//!
//! Per-frame metadata plus the page content slots, indexed by frame id.
//! Every mutation of frame state goes through `FrameTable`; it never touches
//! the page table or a page store; callers coordinate those.

use crate::page::Page;
use crate::store::PageStore;
use crate::types::{FrameId, PageId, StoreId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to a page store
pub type StoreRef = Arc<dyn PageStore>;

/// BufferTag identifies a page across all stores: (store id, page id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferTag {
    /// Store the page belongs to
    pub store_id: StoreId,
    /// The PageId inside that store
    pub page_id: PageId,
}

impl BufferTag {
    /// Creates a new BufferTag
    #[inline]
    pub fn new(store_id: StoreId, page_id: PageId) -> Self {
        Self { store_id, page_id }
    }

    /// Fixed little-endian encoding used for hashing
    #[inline]
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&self.store_id.to_le_bytes());
        bytes[4..].copy_from_slice(&self.page_id.to_le_bytes());
        bytes
    }
}

/// BufferDesc struct, used to describe frame state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Index of the frame this descriptor describes
    pub(crate) frame_id: FrameId,
    /// Identity of the resident page, None when the frame is free
    pub(crate) tag: Option<BufferTag>,
    /// Number of outstanding pins
    pub(crate) pin_count: u32,
    /// Content differs from the store's copy
    pub(crate) dirty: bool,
    /// Second-chance bit for the clock sweep
    pub(crate) referenced: bool,
    /// Frame holds an assigned page
    pub(crate) valid: bool,
    /// Bumped on every set and clear; handles carry it to detect reuse
    pub(crate) generation: u64,
}

impl BufferDesc {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            tag: None,
            pin_count: 0,
            dirty: false,
            referenced: false,
            valid: false,
            generation: 0,
        }
    }

    /// Index of this frame
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Identity of the resident page
    #[inline]
    pub fn tag(&self) -> Option<BufferTag> {
        self.tag
    }

    /// Current pin count
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Returns true if the frame holds modifications not yet written back
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if the reference bit is set
    #[inline]
    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    /// Returns true if the frame holds an assigned page
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Current generation of the frame
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if the clock sweep may pick this frame as a victim
    #[inline]
    pub fn can_evict(&self) -> bool {
        self.pin_count == 0
    }
}

/// Frame table: descriptors, owning stores and page content, 1:1 by frame id
pub struct FrameTable {
    descs: Vec<BufferDesc>,
    owners: Vec<Option<StoreRef>>,
    pages: Vec<Page>,
}

impl FrameTable {
    /// Creates `num_frames` free frames
    pub fn new(num_frames: usize) -> Self {
        Self {
            descs: (0..num_frames).map(BufferDesc::new).collect(),
            owners: (0..num_frames).map(|_| None).collect(),
            pages: (0..num_frames).map(|_| Page::default()).collect(),
        }
    }

    /// Number of frames
    #[inline]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Returns true if the table has no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Descriptor of a frame
    #[inline]
    pub fn desc(&self, frame_id: FrameId) -> &BufferDesc {
        &self.descs[frame_id]
    }

    #[inline]
    pub(crate) fn desc_mut(&mut self, frame_id: FrameId) -> &mut BufferDesc {
        &mut self.descs[frame_id]
    }

    /// Descriptor of a frame, or None if the id is out of range
    #[inline]
    pub fn get(&self, frame_id: FrameId) -> Option<&BufferDesc> {
        self.descs.get(frame_id)
    }

    /// All descriptors in frame order
    pub fn iter(&self) -> impl Iterator<Item = &BufferDesc> + '_ {
        self.descs.iter()
    }

    /// Store owning the resident page
    #[inline]
    pub fn owner(&self, frame_id: FrameId) -> Option<&StoreRef> {
        self.owners[frame_id].as_ref()
    }

    /// Content of a frame
    #[inline]
    pub fn page(&self, frame_id: FrameId) -> &Page {
        &self.pages[frame_id]
    }

    /// Mutable content of a frame
    #[inline]
    pub fn page_mut(&mut self, frame_id: FrameId) -> &mut Page {
        &mut self.pages[frame_id]
    }

    /// Replaces the content of a frame
    #[inline]
    pub fn install(&mut self, frame_id: FrameId, page: Page) {
        self.pages[frame_id] = page;
    }

    /// Assigns a page to a frame: pinned once, clean, referenced and valid
    pub fn set(&mut self, frame_id: FrameId, store: StoreRef, page_id: PageId) {
        let desc = &mut self.descs[frame_id];
        desc.tag = Some(BufferTag::new(store.store_id(), page_id));
        desc.pin_count = 1;
        desc.dirty = false;
        desc.referenced = true;
        desc.valid = true;
        desc.generation += 1;
        self.owners[frame_id] = Some(store);
    }

    /// Resets a frame to free
    pub fn clear(&mut self, frame_id: FrameId) {
        let desc = &mut self.descs[frame_id];
        desc.tag = None;
        desc.pin_count = 0;
        desc.dirty = false;
        desc.referenced = false;
        desc.valid = false;
        desc.generation += 1;
        self.owners[frame_id] = None;
    }

    /// Adds a pin and marks the frame recently used. Returns the new count.
    pub fn pin(&mut self, frame_id: FrameId) -> u32 {
        let desc = &mut self.descs[frame_id];
        desc.pin_count += 1;
        desc.referenced = true;
        desc.pin_count
    }

    /// Drops a pin. Returns the new count, or None if the frame was not pinned.
    pub fn unpin(&mut self, frame_id: FrameId) -> Option<u32> {
        let desc = &mut self.descs[frame_id];
        desc.pin_count = desc.pin_count.checked_sub(1)?;
        Some(desc.pin_count)
    }

    /// Marks the frame as modified
    #[inline]
    pub fn set_dirty(&mut self, frame_id: FrameId) {
        self.descs[frame_id].dirty = true;
    }

    /// Clears the dirty flag after a successful write back
    #[inline]
    pub fn clear_dirty(&mut self, frame_id: FrameId) {
        self.descs[frame_id].dirty = false;
    }

    /// Sets or clears the reference bit
    #[inline]
    pub fn set_referenced(&mut self, frame_id: FrameId, referenced: bool) {
        self.descs[frame_id].referenced = referenced;
    }

    /// Number of frames holding a page
    pub fn valid_count(&self) -> usize {
        self.descs.iter().filter(|desc| desc.valid).count()
    }
}
