//! Buffer pool
//!
//! A fixed set of in-memory frames caching pages of one or more page stores.
//! Pages are located through the page table, pinned while a caller uses
//! them, and replaced with the clock (second-chance) policy when a frame is
//! needed. Dirty pages are written back to their store before their frame is
//! reused, when their store is flushed, and when the pool is torn down.
//!
//! Callers receive a [`PageHandle`] instead of a reference into the pool.
//! Content is borrowed through [`BufferPool::page`] and
//! [`BufferPool::page_mut`], which reject handles whose pin has been released
//! or whose frame has since been reassigned.

pub mod clock;
pub mod error;
pub mod frame;
pub mod stats;

pub use clock::{ClockHand, SweepOutcome};
pub use error::{BufferError, BufferResult};
pub use frame::{BufferDesc, BufferTag, FrameTable, StoreRef};
pub use stats::{FrameInfo, PoolSnapshot, PoolStats};

use crate::infrastructure::hash_table::PageTable;
use crate::page::Page;
use crate::types::{BufferPoolConfig, FrameId, INVALID_PAGE_ID, PageId, StoreId};

/// Ticket for a pinned page
///
/// Valid until the matching release; using it afterwards fails with
/// `BufferError::StaleHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    frame_id: FrameId,
    tag: BufferTag,
    generation: u64,
}

impl PageHandle {
    /// Frame holding the page
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Id of the page within its store
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.tag.page_id
    }

    /// Id of the store owning the page
    #[inline]
    pub fn store_id(&self) -> StoreId {
        self.tag.store_id
    }
}

/// Buffer pool manager
pub struct BufferPool {
    /// Configuration the pool was built from
    config: BufferPoolConfig,
    /// Frame metadata and content
    frames: FrameTable,
    /// (store, page) -> frame
    page_table: PageTable,
    /// Replacement state
    clock: ClockHand,
    /// Lifetime counters
    stats: PoolStats,
    /// Set once teardown has run
    closed: bool,
}

impl BufferPool {
    /// Creates a pool of `config.num_frames` free frames
    ///
    /// # Returns
    /// * `Err(BufferError::InvalidConfig)` if the configuration is rejected
    pub fn new(config: BufferPoolConfig) -> BufferResult<Self> {
        config.validate()?;
        let num_frames = config.num_frames;
        let page_table = PageTable::for_pool(num_frames);
        log::info!(
            "buffer pool created: {} frames, {} page table buckets",
            num_frames,
            page_table.bucket_count()
        );
        Ok(Self {
            config,
            frames: FrameTable::new(num_frames),
            page_table,
            clock: ClockHand::new(num_frames),
            stats: PoolStats::default(),
            closed: false,
        })
    }

    /// Creates a pool with the default configuration and `num_frames` frames
    pub fn with_frames(num_frames: usize) -> BufferResult<Self> {
        Self::new(BufferPoolConfig::with_frames(num_frames))
    }

    /// Number of frames in the pool
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Configuration the pool was built from
    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Current clock hand position
    pub fn clock_position(&self) -> FrameId {
        self.clock.position()
    }

    /// Pins a page, reading it from `store` if it is not resident
    ///
    /// # Arguments
    /// * `store` - Store owning the page
    /// * `page_id` - Page to fetch
    ///
    /// # Returns
    /// * `Ok(PageHandle)` - The page is pinned once more
    /// * `Err(BufferError::PoolExhausted)` - Miss and every frame is pinned
    /// * `Err(BufferError::Store)` - Victim writeback or page read failed
    pub fn fetch_page(&mut self, store: &StoreRef, page_id: PageId) -> BufferResult<PageHandle> {
        let tag = BufferTag::new(store.store_id(), page_id);

        if let Some(frame_id) = self.page_table.lookup(&tag) {
            self.frames.pin(frame_id);
            self.stats.hits += 1;
            log::trace!("hit {}:{} in frame {}", store.name(), page_id, frame_id);
            return Ok(self.handle(frame_id));
        }

        let frame_id = self.alloc_frame()?;
        let page = store.read_page(page_id)?;
        self.page_table.insert(tag, frame_id)?;
        self.frames.install(frame_id, page);
        self.frames.set(frame_id, store.clone(), page_id);
        self.stats.misses += 1;
        log::trace!("miss {}:{} read into frame {}", store.name(), page_id, frame_id);
        Ok(self.handle(frame_id))
    }

    /// Drops one pin on a page, marking it dirty if requested.
    ///
    /// Releasing a page that is not resident does nothing.
    pub fn release_page(
        &mut self,
        store: &StoreRef,
        page_id: PageId,
        mark_dirty: bool,
    ) -> BufferResult<()> {
        let tag = BufferTag::new(store.store_id(), page_id);
        let Some(frame_id) = self.page_table.lookup(&tag) else {
            log::trace!("release of non-resident page {}:{}", store.name(), page_id);
            return Ok(());
        };

        if self.frames.unpin(frame_id).is_none() {
            return Err(BufferError::PageNotPinned {
                store: store.name().to_string(),
                page_id,
                frame_id,
            });
        }
        if mark_dirty {
            self.frames.set_dirty(frame_id);
        }
        Ok(())
    }

    /// Allocates a new page in `store` and pins it in a frame
    ///
    /// The frame is chosen, and any dirty victim written back, before the
    /// store is asked for a page.
    ///
    /// # Returns
    /// * `Ok((page_id, handle))` - The new page id and its pinned, zeroed content
    pub fn allocate_page(&mut self, store: &StoreRef) -> BufferResult<(PageId, PageHandle)> {
        let frame_id = self.alloc_frame()?;
        let page = store.allocate_page()?;
        let page_id = page.page_id();

        self.page_table
            .insert(BufferTag::new(store.store_id(), page_id), frame_id)?;
        self.frames.install(frame_id, page);
        self.frames.set(frame_id, store.clone(), page_id);
        self.stats.allocations += 1;
        log::debug!(
            "allocated page {}:{} in frame {}",
            store.name(),
            page_id,
            frame_id
        );
        Ok((page_id, self.handle(frame_id)))
    }

    /// Drops a page from the pool, if resident, and deletes it from `store`
    ///
    /// # Returns
    /// * `Err(BufferError::PagePinned)` - The page is resident and pinned; nothing changed
    pub fn dispose_page(&mut self, store: &StoreRef, page_id: PageId) -> BufferResult<()> {
        let tag = BufferTag::new(store.store_id(), page_id);
        if let Some(frame_id) = self.page_table.lookup(&tag) {
            if self.frames.desc(frame_id).pin_count() > 0 {
                return Err(BufferError::PagePinned {
                    store: store.name().to_string(),
                    page_id,
                    frame_id,
                });
            }
            self.frames.clear(frame_id);
            self.page_table.remove(&tag);
        }

        store.delete_page(page_id)?;
        self.stats.disposals += 1;
        log::debug!("disposed page {}:{}", store.name(), page_id);
        Ok(())
    }

    /// Writes back and evicts every page of `store`, in frame order.
    ///
    /// The first failure stops the flush; frames processed before it stay
    /// evicted.
    pub fn flush_store(&mut self, store: &StoreRef) -> BufferResult<()> {
        let store_id = store.store_id();

        let mut indexed: Vec<Option<BufferTag>> = vec![None; self.frames.len()];
        for (tag, frame_id) in self.page_table.iter() {
            if tag.store_id == store_id {
                indexed[frame_id] = Some(tag);
            }
        }

        let mut flushed = 0usize;
        for frame_id in 0..self.frames.len() {
            let desc = self.frames.desc(frame_id);
            let owned = desc.tag().is_some_and(|tag| tag.store_id == store_id);
            if !owned && indexed[frame_id].is_none() {
                continue;
            }

            let Some(tag) = desc.tag().filter(|_| desc.is_valid()) else {
                return Err(self.inconsistent(frame_id));
            };
            if indexed[frame_id] != Some(tag) {
                return Err(self.inconsistent(frame_id));
            }
            if desc.pin_count() > 0 {
                return Err(BufferError::PagePinned {
                    store: store.name().to_string(),
                    page_id: tag.page_id,
                    frame_id,
                });
            }

            if desc.is_dirty() {
                self.write_back(frame_id)?;
            }
            self.page_table.remove(&tag);
            self.frames.clear(frame_id);
            flushed += 1;
        }

        log::debug!("flushed {} frames of store {}", flushed, store.name());
        Ok(())
    }

    /// Writes back every dirty page without evicting anything.
    ///
    /// Returns the number of pages written.
    pub fn flush_all(&mut self) -> BufferResult<usize> {
        let mut written = 0;
        for frame_id in 0..self.frames.len() {
            let desc = self.frames.desc(frame_id);
            if desc.is_valid() && desc.is_dirty() {
                self.write_back(frame_id)?;
                written += 1;
            }
        }
        log::debug!("flush_all wrote {} pages", written);
        Ok(written)
    }

    /// Tears the pool down, reporting the first writeback failure
    pub fn close(mut self) -> BufferResult<()> {
        self.teardown()
    }

    /// Content of a pinned page
    pub fn page(&self, handle: &PageHandle) -> BufferResult<&Page> {
        self.check_handle(handle)?;
        Ok(self.frames.page(handle.frame_id))
    }

    /// Mutable content of a pinned page.
    ///
    /// Changes reach the store only if the page is marked dirty, on release
    /// or through `mark_dirty`.
    pub fn page_mut(&mut self, handle: &PageHandle) -> BufferResult<&mut Page> {
        self.check_handle(handle)?;
        Ok(self.frames.page_mut(handle.frame_id))
    }

    /// Marks a resident page dirty without releasing it.
    ///
    /// Returns false if the page is not resident.
    pub fn mark_dirty(&mut self, store: &StoreRef, page_id: PageId) -> bool {
        match self.frame_of(store, page_id) {
            Some(frame_id) => {
                self.frames.set_dirty(frame_id);
                true
            }
            None => false,
        }
    }

    /// Returns true if the page is resident
    pub fn contains(&self, store: &StoreRef, page_id: PageId) -> bool {
        self.frame_of(store, page_id).is_some()
    }

    /// Pin count of a resident page
    pub fn pin_count(&self, store: &StoreRef, page_id: PageId) -> Option<u32> {
        self.frame_of(store, page_id)
            .map(|frame_id| self.frames.desc(frame_id).pin_count())
    }

    /// Frame holding a resident page
    pub fn frame_of(&self, store: &StoreRef, page_id: PageId) -> Option<FrameId> {
        self.page_table
            .lookup(&BufferTag::new(store.store_id(), page_id))
    }

    /// Descriptor of a frame
    pub fn frame(&self, frame_id: FrameId) -> Option<&BufferDesc> {
        self.frames.get(frame_id)
    }

    /// Counters since creation or the last reset
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PoolStats::default();
    }

    /// Number of frames holding a page
    pub fn valid_frames(&self) -> usize {
        self.frames.valid_count()
    }

    /// Snapshot of every frame
    pub fn dump(&self) -> PoolSnapshot {
        PoolSnapshot::capture(&self.frames)
    }

    /// Writes the frame dump to the debug log
    pub fn log_dump(&self) {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("buffer pool state:\n{}", self.dump());
        }
    }

    /// Picks a frame with the clock sweep and frees it.
    ///
    /// The returned frame is invalid and absent from the page table. If the
    /// victim's writeback fails it stays resident, dirty and indexed.
    pub(crate) fn alloc_frame(&mut self) -> BufferResult<FrameId> {
        match self.clock.sweep(&mut self.frames) {
            SweepOutcome::Free(frame_id) => Ok(frame_id),
            SweepOutcome::Victim(frame_id) => {
                self.evict(frame_id)?;
                Ok(frame_id)
            }
            SweepOutcome::Exhausted => {
                self.stats.exhausted += 1;
                log::debug!("no unpinned frame among {}", self.frames.len());
                Err(BufferError::PoolExhausted)
            }
        }
    }

    fn evict(&mut self, frame_id: FrameId) -> BufferResult<()> {
        let desc = self.frames.desc(frame_id);
        let tag = desc.tag();
        if desc.is_dirty() {
            self.write_back(frame_id)?;
        }
        if let Some(tag) = tag {
            self.page_table.remove(&tag);
            log::debug!(
                "evicted page {}:{} from frame {}",
                tag.store_id,
                tag.page_id,
                frame_id
            );
        }
        self.frames.clear(frame_id);
        self.stats.evictions += 1;
        Ok(())
    }

    /// Writes a frame to its owning store under the frame's own page id
    fn write_back(&mut self, frame_id: FrameId) -> BufferResult<()> {
        let Some(tag) = self.frames.desc(frame_id).tag() else {
            return Err(self.inconsistent(frame_id));
        };
        self.frames.page_mut(frame_id).set_page_id(tag.page_id);

        let Some(store) = self.frames.owner(frame_id) else {
            return Err(self.inconsistent(frame_id));
        };
        store.write_page(self.frames.page(frame_id))?;
        log::trace!(
            "wrote back page {}:{} from frame {}",
            store.name(),
            tag.page_id,
            frame_id
        );
        self.frames.clear_dirty(frame_id);
        self.stats.writebacks += 1;
        Ok(())
    }

    fn handle(&self, frame_id: FrameId) -> PageHandle {
        let desc = self.frames.desc(frame_id);
        PageHandle {
            frame_id,
            tag: desc.tag().unwrap_or(BufferTag::new(0, INVALID_PAGE_ID)),
            generation: desc.generation(),
        }
    }

    fn check_handle(&self, handle: &PageHandle) -> BufferResult<()> {
        let stale = BufferError::StaleHandle {
            frame_id: handle.frame_id,
        };
        let Some(desc) = self.frames.get(handle.frame_id) else {
            return Err(stale);
        };
        if !desc.is_valid()
            || desc.generation() != handle.generation
            || desc.tag() != Some(handle.tag)
            || desc.pin_count() == 0
        {
            return Err(stale);
        }
        Ok(())
    }

    fn inconsistent(&self, frame_id: FrameId) -> BufferError {
        let desc = self.frames.desc(frame_id);
        log::error!("frame {} disagrees with the page table: {:?}", frame_id, desc);
        BufferError::InconsistentState {
            frame_id,
            dirty: desc.is_dirty(),
            valid: desc.is_valid(),
            referenced: desc.is_referenced(),
        }
    }

    /// Writes back every valid dirty frame regardless of pins, then frees all
    /// frames. Keeps going after a failed write and returns the first error.
    fn teardown(&mut self) -> BufferResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_err = None;
        for frame_id in 0..self.frames.len() {
            let desc = self.frames.desc(frame_id);
            if !(desc.is_valid() && desc.is_dirty()) {
                continue;
            }
            if desc.pin_count() > 0 {
                log::warn!(
                    "frame {} still pinned {} times at teardown",
                    frame_id,
                    desc.pin_count()
                );
            }
            if let Err(err) = self.write_back(frame_id) {
                log::warn!("teardown writeback of frame {} failed: {}", frame_id, err);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        self.page_table.clear();
        for frame_id in 0..self.frames.len() {
            self.frames.clear(frame_id);
        }
        log::info!("buffer pool closed, stats: {:?}", self.stats);

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            log::error!("buffer pool teardown failed: {}", err);
        }
    }
}
