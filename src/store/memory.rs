//! In-memory page store
//!
//! Keeps pages in a hash map and records every call it receives, so the order
//! of reads, writes, allocations and deletions issued by a buffer pool can be
//! inspected afterwards.

use crate::page::Page;
use crate::store::error::{StoreError, StoreResult};
use crate::store::interface::PageStore;
use crate::store::{next_store_id, reserve_store_id};
use crate::types::{PageId, StoreId};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

/// One call observed by a `MemStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// `read_page(id)`
    Read(PageId),
    /// `write_page` of page `id`
    Write(PageId),
    /// `allocate_page` returned `id`
    Allocate(PageId),
    /// `delete_page(id)`
    Delete(PageId),
}

#[derive(Default)]
struct MemState {
    pages: HashMap<PageId, Page>,
    free_ids: BTreeSet<PageId>,
    next_id: PageId,
    journal: Vec<StoreOp>,
}

impl MemState {
    fn take_id(&mut self) -> PageId {
        match self.free_ids.pop_first() {
            Some(page_id) => page_id,
            None => {
                let page_id = self.next_id;
                self.next_id += 1;
                page_id
            }
        }
    }
}

/// In-memory page store
pub struct MemStore {
    store_id: StoreId,
    name: String,
    state: Mutex<MemState>,
}

impl MemStore {
    /// Creates an empty store with a fresh store id
    pub fn new(name: &str) -> Self {
        Self::with_id(next_store_id(), name)
    }

    /// Creates an empty store with the given store id.
    ///
    /// Later calls to `next_store_id` skip `store_id`; the caller must not
    /// open two stores with the same explicit id.
    pub fn with_id(store_id: StoreId, name: &str) -> Self {
        reserve_store_id(store_id);
        MemStore {
            store_id,
            name: name.to_string(),
            state: Mutex::new(MemState::default()),
        }
    }

    /// Creates a store holding pages `0..count`.
    ///
    /// The first eight payload bytes of each page hold its id in little endian.
    pub fn with_pages(name: &str, count: u64) -> Self {
        let store = Self::new(name);
        {
            let mut state = store.state.lock();
            for page_id in 0..count {
                let page = Page::from_bytes(page_id, &page_id.to_le_bytes());
                state.pages.insert(page_id, page);
            }
            state.next_id = count;
        }
        store
    }

    /// Snapshot of the calls received so far
    pub fn journal(&self) -> Vec<StoreOp> {
        self.state.lock().journal.clone()
    }

    /// Forget the calls received so far
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Number of `write_page` calls received for `page_id`
    pub fn writes_of(&self, page_id: PageId) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|op| **op == StoreOp::Write(page_id))
            .count()
    }

    /// Copy of a stored page, bypassing the journal
    pub fn peek(&self, page_id: PageId) -> Option<Page> {
        self.state.lock().pages.get(&page_id).cloned()
    }

    /// Returns true if `page_id` is allocated
    pub fn contains(&self, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&page_id)
    }

    /// Number of allocated pages
    pub fn page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    fn invalid(&self, page_id: PageId) -> StoreError {
        StoreError::InvalidPage {
            store: self.name.clone(),
            page_id,
        }
    }
}

impl PageStore for MemStore {
    fn store_id(&self) -> StoreId {
        self.store_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> StoreResult<Page> {
        let mut state = self.state.lock();
        state.journal.push(StoreOp::Read(page_id));
        state
            .pages
            .get(&page_id)
            .cloned()
            .ok_or_else(|| self.invalid(page_id))
    }

    fn write_page(&self, page: &Page) -> StoreResult<()> {
        let mut state = self.state.lock();
        let page_id = page.page_id();
        state.journal.push(StoreOp::Write(page_id));
        match state.pages.get_mut(&page_id) {
            Some(stored) => {
                stored.clone_from(page);
                Ok(())
            }
            None => Err(self.invalid(page_id)),
        }
    }

    fn allocate_page(&self) -> StoreResult<Page> {
        let mut state = self.state.lock();
        let page_id = state.take_id();
        let page = Page::new(page_id);
        state.pages.insert(page_id, page.clone());
        state.journal.push(StoreOp::Allocate(page_id));
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.journal.push(StoreOp::Delete(page_id));
        if state.pages.remove(&page_id).is_none() {
            return Err(self.invalid(page_id));
        }
        state.free_ids.insert(page_id);
        Ok(())
    }
}
