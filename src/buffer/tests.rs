// Buffer pool tests

use super::*;
use crate::page::Page;
use crate::store::{FileStore, MemStore, PageStore, StoreError, StoreOp, StoreResult};
use crate::vfs::LocalFs;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

fn mem_store(name: &str, pages: u64) -> (Arc<MemStore>, StoreRef) {
    let mem = Arc::new(MemStore::with_pages(name, pages));
    let store: StoreRef = mem.clone();
    (mem, store)
}

/// Checks that every valid frame is indexed under its own tag and nothing else is
fn assert_coherent(pool: &BufferPool) {
    for desc in pool.frames.iter() {
        match desc.tag() {
            Some(tag) if desc.is_valid() => {
                assert_eq!(pool.page_table.lookup(&tag), Some(desc.frame_id()));
            }
            _ => {
                assert!(!desc.is_valid(), "frame {} valid without tag", desc.frame_id());
                assert!(desc.tag().is_none());
                assert_eq!(desc.pin_count(), 0);
            }
        }
    }
    for (tag, frame_id) in pool.page_table.iter() {
        assert_eq!(pool.frames.desc(frame_id).tag(), Some(tag));
    }
    assert_eq!(pool.page_table.len(), pool.frames.valid_count());
}

/// Store that records calls from several stores in one shared sequence
struct SharedLogStore {
    inner: MemStore,
    log: Arc<Mutex<Vec<(StoreId, StoreOp)>>>,
}

impl SharedLogStore {
    fn new(name: &str, pages: u64, log: Arc<Mutex<Vec<(StoreId, StoreOp)>>>) -> Self {
        Self {
            inner: MemStore::with_pages(name, pages),
            log,
        }
    }

    fn record(&self, op: StoreOp) {
        self.log.lock().push((self.inner.store_id(), op));
    }
}

impl PageStore for SharedLogStore {
    fn store_id(&self) -> StoreId {
        self.inner.store_id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_page(&self, page_id: PageId) -> StoreResult<Page> {
        self.record(StoreOp::Read(page_id));
        self.inner.read_page(page_id)
    }

    fn write_page(&self, page: &Page) -> StoreResult<()> {
        self.record(StoreOp::Write(page.page_id()));
        self.inner.write_page(page)
    }

    fn allocate_page(&self) -> StoreResult<Page> {
        let page = self.inner.allocate_page()?;
        self.record(StoreOp::Allocate(page.page_id()));
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> StoreResult<()> {
        self.record(StoreOp::Delete(page_id));
        self.inner.delete_page(page_id)
    }
}

/// Store whose writes can be switched to fail
struct FlakyStore {
    inner: MemStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new(pages: u64) -> Self {
        Self {
            inner: MemStore::with_pages("flaky", pages),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

impl PageStore for FlakyStore {
    fn store_id(&self) -> StoreId {
        self.inner.store_id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_page(&self, page_id: PageId) -> StoreResult<Page> {
        self.inner.read_page(page_id)
    }

    fn write_page(&self, page: &Page) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupted {
                store: "flaky".to_string(),
                page_id: page.page_id(),
                reason: "injected write failure".to_string(),
            });
        }
        self.inner.write_page(page)
    }

    fn allocate_page(&self) -> StoreResult<Page> {
        self.inner.allocate_page()
    }

    fn delete_page(&self, page_id: PageId) -> StoreResult<()> {
        self.inner.delete_page(page_id)
    }
}

#[test]
fn test_new_pool() {
    let pool = BufferPool::with_frames(4).unwrap();
    assert_eq!(pool.num_frames(), 4);
    assert_eq!(pool.valid_frames(), 0);
    assert_eq!(pool.clock_position(), 3);
    assert_eq!(pool.page_table.bucket_count(), 5);
    assert_eq!(pool.stats(), PoolStats::default());
    assert_coherent(&pool);
}

#[test]
fn test_zero_frames_rejected() {
    let result = BufferPool::with_frames(0);
    assert!(matches!(result, Err(BufferError::InvalidConfig(_))));
}

#[test]
fn test_fetch_miss_then_hit() {
    let (mem, store) = mem_store("x", 3);
    let mut pool = BufferPool::with_frames(4).unwrap();

    let first = pool.fetch_page(&store, 1).unwrap();
    assert_eq!(first.page_id(), 1);
    assert_eq!(first.store_id(), store.store_id());
    assert_eq!(&pool.page(&first).unwrap().data()[..8], &1u64.to_le_bytes());
    assert_eq!(mem.journal(), vec![StoreOp::Read(1)]);

    let second = pool.fetch_page(&store, 1).unwrap();
    assert_eq!(second.frame_id(), first.frame_id());
    assert_eq!(pool.pin_count(&store, 1), Some(2));
    // No I/O on a hit
    assert_eq!(mem.journal(), vec![StoreOp::Read(1)]);

    let stats = pool.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    assert_coherent(&pool);
}

#[test]
fn test_pin_release_balance() {
    let (_mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, false).unwrap();
    pool.release_page(&store, 0, false).unwrap();
    assert_eq!(pool.pin_count(&store, 0), Some(0));

    let result = pool.release_page(&store, 0, true);
    assert!(matches!(
        result,
        Err(BufferError::PageNotPinned {
            page_id: 0,
            frame_id: 0,
            ..
        })
    ));
    // Rejected before any change
    assert_eq!(pool.pin_count(&store, 0), Some(0));
    assert!(!pool.frames.desc(0).is_dirty());
}

#[test]
fn test_release_of_non_resident_page_is_noop() {
    let (mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    assert!(mem.journal().is_empty());
    assert_coherent(&pool);
}

#[test]
fn test_exhausted_pool_changes_nothing() {
    // Two frames, both pinned, a third page cannot come in
    let (mem, store) = mem_store("x", 3);
    let mut pool = BufferPool::with_frames(2).unwrap();

    let h0 = pool.fetch_page(&store, 0).unwrap();
    let h1 = pool.fetch_page(&store, 1).unwrap();
    assert_eq!((h0.frame_id(), h1.frame_id()), (0, 1));
    assert_eq!(pool.pin_count(&store, 0), Some(1));
    assert_eq!(pool.pin_count(&store, 1), Some(1));
    pool.mark_dirty(&store, 1);

    let before = pool.dump();
    let result = pool.fetch_page(&store, 2);
    assert!(matches!(result, Err(BufferError::PoolExhausted)));

    let after = pool.dump();
    for (old, new) in before.frames.iter().zip(after.frames.iter()) {
        assert_eq!(old.page_id, new.page_id);
        assert_eq!(old.store_id, new.store_id);
        assert_eq!(old.pin_count, new.pin_count);
        assert_eq!(old.dirty, new.dirty);
        assert_eq!(old.valid, new.valid);
    }
    assert!(!pool.contains(&store, 2));
    assert_eq!(mem.journal(), vec![StoreOp::Read(0), StoreOp::Read(1)]);
    assert_eq!(pool.stats().exhausted, 1);
    assert!(pool.page(&h0).is_ok());
    assert_coherent(&pool);
}

#[test]
fn test_dirty_page_written_before_other_store_reads() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let x = Arc::new(SharedLogStore::new("x", 1, log.clone()));
    let y = Arc::new(SharedLogStore::new("y", 1, log.clone()));
    let store_x: StoreRef = x.clone();
    let store_y: StoreRef = y.clone();
    let mut pool = BufferPool::with_frames(1).unwrap();

    let handle = pool.fetch_page(&store_x, 0).unwrap();
    assert!(pool.page_mut(&handle).unwrap().write_at(100, b"dirty"));
    pool.release_page(&store_x, 0, true).unwrap();

    let handle = pool.fetch_page(&store_y, 0).unwrap();
    assert_eq!(handle.store_id(), store_y.store_id());
    assert_eq!(
        *log.lock(),
        vec![
            (store_x.store_id(), StoreOp::Read(0)),
            (store_x.store_id(), StoreOp::Write(0)),
            (store_y.store_id(), StoreOp::Read(0)),
        ]
    );
    let persisted = x.inner.peek(0).unwrap();
    assert_eq!(&persisted.data()[100..105], b"dirty");
    assert!(!pool.contains(&store_x, 0));
    assert_coherent(&pool);
}

#[test]
fn test_dirty_victim_written_once_before_reuse() {
    let (mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(1).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    pool.fetch_page(&store, 1).unwrap();

    assert_eq!(
        mem.journal(),
        vec![StoreOp::Read(0), StoreOp::Write(0), StoreOp::Read(1)]
    );
    let stats = pool.stats();
    assert_eq!((stats.evictions, stats.writebacks), (1, 1));
}

#[test]
fn test_writeback_uses_frame_identity() {
    let (mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(1).unwrap();

    let handle = pool.fetch_page(&store, 0).unwrap();
    let page = pool.page_mut(&handle).unwrap();
    page.set_page_id(1);
    page.data_mut().fill(0xAB);
    pool.release_page(&store, 0, true).unwrap();

    pool.fetch_page(&store, 1).unwrap();
    assert_eq!(
        mem.journal(),
        vec![StoreOp::Read(0), StoreOp::Write(0), StoreOp::Read(1)]
    );
    assert!(mem.peek(0).unwrap().data().iter().all(|b| *b == 0xAB));
    assert_eq!(&mem.peek(1).unwrap().data()[..8], &1u64.to_le_bytes());
    let again = pool.fetch_page(&store, 1).unwrap();
    assert_eq!(pool.page(&again).unwrap().page_id(), 1);
}

#[test]
fn test_allocate_writes_victim_before_store_allocation() {
    let (mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(1).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    let (page_id, _) = pool.allocate_page(&store).unwrap();

    assert_eq!(page_id, 2);
    assert_eq!(
        mem.journal(),
        vec![StoreOp::Read(0), StoreOp::Write(0), StoreOp::Allocate(2)]
    );
}

#[test]
fn test_clean_victim_is_not_written() {
    let (mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(1).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, false).unwrap();
    pool.fetch_page(&store, 1).unwrap();

    assert_eq!(mem.writes_of(0), 0);
    assert_eq!(pool.stats().evictions, 1);
}

#[test]
fn test_dispose_never_fetched_page() {
    let (mem, store) = mem_store("x", 3);
    let mut pool = BufferPool::with_frames(2).unwrap();

    pool.dispose_page(&store, 2).unwrap();
    assert_eq!(mem.journal(), vec![StoreOp::Delete(2)]);
    assert!(!mem.contains(2));
    assert_eq!(pool.stats().disposals, 1);
    assert_coherent(&pool);

    // Unknown to the store as well: the store's error comes through
    let result = pool.dispose_page(&store, 2);
    assert!(matches!(
        result,
        Err(BufferError::Store(StoreError::InvalidPage { page_id: 2, .. }))
    ));
}

#[test]
fn test_dispose_resident_page() {
    let (mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    let result = pool.dispose_page(&store, 0);
    assert!(matches!(
        result,
        Err(BufferError::PagePinned { page_id: 0, .. })
    ));
    assert!(pool.contains(&store, 0));
    assert!(!mem.journal().contains(&StoreOp::Delete(0)));

    // Dirty content of a disposed page is dropped, not written
    pool.release_page(&store, 0, true).unwrap();
    pool.dispose_page(&store, 0).unwrap();
    assert!(!pool.contains(&store, 0));
    assert_eq!(mem.writes_of(0), 0);
    assert!(!mem.contains(0));
    assert_eq!(pool.valid_frames(), 0);
    assert_coherent(&pool);
}

#[test]
fn test_flush_stops_at_pinned_page() {
    let (mem, store) = mem_store("x", 3);
    let mut pool = BufferPool::with_frames(4).unwrap();
    for page_id in 0..3 {
        assert_eq!(pool.fetch_page(&store, page_id).unwrap().frame_id(), page_id as usize);
    }
    pool.release_page(&store, 0, true).unwrap();
    pool.release_page(&store, 2, false).unwrap();

    let result = pool.flush_store(&store);
    assert!(matches!(
        result,
        Err(BufferError::PagePinned {
            page_id: 1,
            frame_id: 1,
            ..
        })
    ));
    // Frames before the pinned one were processed
    assert!(!pool.contains(&store, 0));
    assert_eq!(mem.writes_of(0), 1);
    assert!(pool.contains(&store, 1));
    assert!(pool.contains(&store, 2));
    assert_coherent(&pool);

    pool.release_page(&store, 1, false).unwrap();
    pool.flush_store(&store).unwrap();
    assert_eq!(pool.valid_frames(), 0);
    assert_eq!(mem.writes_of(1), 0);
    assert_coherent(&pool);
}

#[test]
fn test_flush_only_touches_its_store() {
    let (mem_x, store_x) = mem_store("x", 2);
    let (mem_y, store_y) = mem_store("y", 2);
    let mut pool = BufferPool::with_frames(4).unwrap();

    for page_id in 0..2 {
        pool.fetch_page(&store_x, page_id).unwrap();
        pool.release_page(&store_x, page_id, true).unwrap();
        pool.fetch_page(&store_y, page_id).unwrap();
        pool.release_page(&store_y, page_id, true).unwrap();
    }

    pool.flush_store(&store_x).unwrap();
    assert_eq!(mem_x.writes_of(0) + mem_x.writes_of(1), 2);
    assert_eq!(mem_y.writes_of(0) + mem_y.writes_of(1), 0);
    assert!(!pool.contains(&store_x, 0));
    assert!(pool.contains(&store_y, 0));
    assert!(pool.contains(&store_y, 1));
    assert_coherent(&pool);
}

#[test]
fn test_flush_detects_inconsistent_frame() {
    let (_mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();

    let handle = pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    pool.frames.desc_mut(handle.frame_id()).valid = false;

    let result = pool.flush_store(&store);
    assert!(matches!(
        result,
        Err(BufferError::InconsistentState {
            frame_id: 0,
            valid: false,
            dirty: true,
            ..
        })
    ));
}

#[test]
fn test_allocations_fill_frames_in_order() {
    let mem = Arc::new(MemStore::new("fresh"));
    let store: StoreRef = mem.clone();
    let mut pool = BufferPool::with_frames(4).unwrap();

    for expected in 0..4u64 {
        let (page_id, handle) = pool.allocate_page(&store).unwrap();
        assert_eq!(page_id, expected);
        assert_eq!(handle.frame_id(), expected as usize);
        assert!(pool.page(&handle).unwrap().data().iter().all(|b| *b == 0));
    }
    assert_eq!(pool.stats().allocations, 4);

    // Full pool: the store is not asked for a page
    let result = pool.allocate_page(&store);
    assert!(matches!(result, Err(BufferError::PoolExhausted)));
    assert_eq!(mem.page_count(), 4);
    assert!(!mem.journal().contains(&StoreOp::Allocate(4)));
    assert_coherent(&pool);
}

#[test]
fn test_recently_used_page_survives_sweep() {
    let (_mem, store) = mem_store("x", 5);
    let mut pool = BufferPool::with_frames(3).unwrap();
    for page_id in 0..3 {
        pool.fetch_page(&store, page_id).unwrap();
        pool.release_page(&store, page_id, false).unwrap();
    }

    // Every bit is set, so the first full pass clears them and frame 0 goes
    assert_eq!(pool.fetch_page(&store, 3).unwrap().frame_id(), 0);
    assert!(!pool.contains(&store, 0));

    // Touching page 1 gives it a second chance; page 2 is taken instead
    pool.fetch_page(&store, 1).unwrap();
    pool.release_page(&store, 1, false).unwrap();
    pool.release_page(&store, 3, false).unwrap();
    assert_eq!(pool.fetch_page(&store, 4).unwrap().frame_id(), 2);

    assert!(pool.contains(&store, 1));
    assert!(!pool.contains(&store, 2));
    assert!(pool.contains(&store, 3));
    assert!(pool.contains(&store, 4));
    assert_coherent(&pool);
}

#[test]
fn test_stale_handle_rejected() {
    let (_mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(1).unwrap();

    let handle = pool.fetch_page(&store, 0).unwrap();
    assert!(pool.page(&handle).is_ok());
    pool.release_page(&store, 0, false).unwrap();
    assert!(matches!(
        pool.page(&handle),
        Err(BufferError::StaleHandle { frame_id: 0 })
    ));

    // Frame reused for another page
    let other = pool.fetch_page(&store, 1).unwrap();
    assert_eq!(other.frame_id(), handle.frame_id());
    assert!(matches!(
        pool.page_mut(&handle),
        Err(BufferError::StaleHandle { .. })
    ));
    assert_eq!(pool.page(&other).unwrap().page_id(), 1);
}

#[test]
fn test_mark_dirty_and_queries() {
    let (mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();

    assert!(!pool.mark_dirty(&store, 0));
    assert!(!pool.contains(&store, 0));
    assert_eq!(pool.pin_count(&store, 0), None);

    pool.fetch_page(&store, 0).unwrap();
    assert!(pool.mark_dirty(&store, 0));
    assert_eq!(pool.frame_of(&store, 0), Some(0));
    assert!(pool.frame(0).unwrap().is_dirty());

    // Dirty is sticky across a clean release
    pool.release_page(&store, 0, false).unwrap();
    pool.flush_store(&store).unwrap();
    assert_eq!(mem.writes_of(0), 1);
}

#[test]
fn test_flush_all_keeps_pages_resident() {
    let (mem, store) = mem_store("x", 2);
    let mut pool = BufferPool::with_frames(2).unwrap();
    for page_id in 0..2 {
        pool.fetch_page(&store, page_id).unwrap();
    }
    pool.release_page(&store, 0, true).unwrap();
    pool.mark_dirty(&store, 1);

    assert_eq!(pool.flush_all().unwrap(), 2);
    assert!(pool.contains(&store, 0));
    assert!(pool.contains(&store, 1));
    assert!(pool.frames.iter().all(|desc| !desc.is_dirty()));
    assert_eq!(mem.writes_of(0), 1);

    assert_eq!(pool.flush_all().unwrap(), 0);
    assert_coherent(&pool);
}

#[test]
fn test_failed_victim_writeback_keeps_page() {
    let flaky = Arc::new(FlakyStore::new(1));
    let store: StoreRef = flaky.clone();
    let (_mem, other) = mem_store("other", 1);
    let mut pool = BufferPool::with_frames(1).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    flaky.set_failing(true);

    let result = pool.fetch_page(&other, 0);
    assert!(matches!(result, Err(BufferError::Store(_))));
    assert!(pool.contains(&store, 0));
    assert!(pool.frames.desc(0).is_dirty());
    assert!(!pool.contains(&other, 0));
    assert_coherent(&pool);

    flaky.set_failing(false);
    pool.fetch_page(&other, 0).unwrap();
    assert!(!pool.contains(&store, 0));
    assert_eq!(flaky.inner.writes_of(0), 1);
}

#[test]
fn test_failed_read_leaves_frame_free() {
    let (mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(1).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();

    let result = pool.fetch_page(&store, 99);
    assert!(matches!(
        result,
        Err(BufferError::Store(StoreError::InvalidPage { page_id: 99, .. }))
    ));
    // The victim went out cleanly before the read failed
    assert_eq!(mem.writes_of(0), 1);
    assert_eq!(pool.valid_frames(), 0);
    assert_coherent(&pool);
}

#[test]
fn test_close_writes_back_dirty_pages() {
    let (mem, store) = mem_store("x", 3);
    let mut pool = BufferPool::with_frames(3).unwrap();

    pool.fetch_page(&store, 0).unwrap();
    pool.release_page(&store, 0, true).unwrap();
    // Still pinned, written anyway
    pool.fetch_page(&store, 1).unwrap();
    pool.mark_dirty(&store, 1);
    pool.fetch_page(&store, 2).unwrap();

    pool.close().unwrap();
    assert_eq!(mem.writes_of(0), 1);
    assert_eq!(mem.writes_of(1), 1);
    assert_eq!(mem.writes_of(2), 0);
}

#[test]
fn test_drop_writes_back_dirty_pages() {
    let (mem, store) = mem_store("x", 1);
    {
        let mut pool = BufferPool::with_frames(1).unwrap();
        let handle = pool.fetch_page(&store, 0).unwrap();
        pool.page_mut(&handle).unwrap().write_at(0, b"gone");
        pool.release_page(&store, 0, true).unwrap();
    }
    assert_eq!(mem.writes_of(0), 1);
    assert_eq!(&mem.peek(0).unwrap().data()[..4], b"gone");
}

#[test]
fn test_close_reports_failed_writeback() {
    let flaky = Arc::new(FlakyStore::new(2));
    let store: StoreRef = flaky.clone();
    let mut pool = BufferPool::with_frames(2).unwrap();
    for page_id in 0..2 {
        pool.fetch_page(&store, page_id).unwrap();
        pool.release_page(&store, page_id, true).unwrap();
    }
    flaky.set_failing(true);
    assert!(matches!(pool.close(), Err(BufferError::Store(_))));
}

#[test]
fn test_dump_lists_frames() {
    crate::infrastructure::setup_logger();
    let (_mem, store) = mem_store("x", 1);
    let mut pool = BufferPool::with_frames(2).unwrap();
    pool.fetch_page(&store, 0).unwrap();

    let snapshot = pool.dump();
    assert_eq!(snapshot.valid_frames, 1);
    assert_eq!(snapshot.frames.len(), 2);
    assert_eq!(snapshot.frames[0].page_id, Some(0));
    assert_eq!(snapshot.frames[0].pin_count, 1);
    assert!(snapshot.frames[0].referenced);
    assert!(!snapshot.frames[1].valid);
    assert!(snapshot.to_string().ends_with("Total Number of Valid Frames: 1"));
    pool.log_dump();
}

#[test]
fn test_pools_are_independent() {
    let (mem, store) = mem_store("shared", 2);
    let mut a = BufferPool::with_frames(1).unwrap();
    let mut b = BufferPool::with_frames(1).unwrap();

    a.fetch_page(&store, 0).unwrap();
    b.fetch_page(&store, 1).unwrap();
    assert!(a.contains(&store, 0) && !a.contains(&store, 1));
    assert!(b.contains(&store, 1) && !b.contains(&store, 0));
    assert_eq!(mem.journal().len(), 2);
}

#[test]
fn test_random_operations_keep_index_coherent() {
    const PAGES: u64 = 12;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mems = [
        Arc::new(MemStore::with_pages("a", PAGES)),
        Arc::new(MemStore::with_pages("b", PAGES)),
    ];
    let stores: Vec<StoreRef> = mems.iter().map(|mem| mem.clone() as StoreRef).collect();
    let mut pool = BufferPool::with_frames(4).unwrap();
    // (store index, page id) per outstanding pin
    let mut pinned: Vec<(usize, PageId, PageHandle)> = Vec::new();

    for _ in 0..3000 {
        let s = rng.gen_range(0..stores.len());
        let store = &stores[s];
        match rng.gen_range(0..6) {
            0 | 1 => {
                let page_id = rng.gen_range(0..PAGES + 2);
                match pool.fetch_page(store, page_id) {
                    Ok(handle) => pinned.push((s, page_id, handle)),
                    Err(BufferError::PoolExhausted) => {
                        assert!(pool.frames.iter().all(|desc| desc.pin_count() > 0));
                    }
                    Err(BufferError::Store(_)) => assert!(!mems[s].contains(page_id)),
                    Err(err) => panic!("unexpected fetch error: {}", err),
                }
            }
            2 => {
                if !pinned.is_empty() {
                    let (s, page_id, _) = pinned.swap_remove(rng.gen_range(0..pinned.len()));
                    pool.release_page(&stores[s], page_id, rng.gen_bool(0.5))
                        .unwrap();
                }
            }
            3 => match pool.allocate_page(store) {
                Ok((page_id, handle)) => pinned.push((s, page_id, handle)),
                Err(BufferError::PoolExhausted) => {
                    assert!(pool.frames.iter().all(|desc| desc.pin_count() > 0));
                }
                Err(err) => panic!("unexpected allocate error: {}", err),
            },
            4 => {
                let page_id = rng.gen_range(0..PAGES);
                let held = pinned.iter().any(|(ps, pp, _)| *ps == s && *pp == page_id);
                match pool.dispose_page(store, page_id) {
                    Ok(()) => assert!(!held),
                    Err(BufferError::PagePinned { .. }) => assert!(held),
                    Err(BufferError::Store(_)) => assert!(!held),
                    Err(err) => panic!("unexpected dispose error: {}", err),
                }
            }
            _ => {
                let held = pinned.iter().any(|(ps, _, _)| *ps == s);
                match pool.flush_store(store) {
                    Ok(()) => assert!(!held),
                    Err(BufferError::PagePinned { .. }) => assert!(held),
                    Err(err) => panic!("unexpected flush error: {}", err),
                }
            }
        }

        assert_coherent(&pool);
        for (s, page_id, handle) in &pinned {
            let holders = pinned
                .iter()
                .filter(|(os, op, _)| os == s && op == page_id)
                .count() as u32;
            assert_eq!(pool.pin_count(&stores[*s], *page_id), Some(holders));
            assert!(pool.page(handle).is_ok());
        }
    }
}

#[test]
fn test_file_store_round_trip_through_pool() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pool.store").to_str().unwrap().to_string();

    {
        let store: StoreRef = Arc::new(FileStore::create(Arc::new(LocalFs::new()), &path).unwrap());
        let mut pool = BufferPool::with_frames(2).unwrap();
        for fill in 0..3u8 {
            let (page_id, handle) = pool.allocate_page(&store).unwrap();
            assert_eq!(page_id, fill as u64);
            pool.page_mut(&handle).unwrap().data_mut().fill(fill + 1);
            pool.release_page(&store, page_id, true).unwrap();
        }
        // The third allocation pushed page 0 out
        assert!(!pool.contains(&store, 0));
        pool.close().unwrap();
    }

    let store = FileStore::open(Arc::new(LocalFs::new()), &path).unwrap();
    assert_eq!(store.page_count(), 3);
    for page_id in 0..3u64 {
        let page = store.read_page(page_id).unwrap();
        assert!(page.data().iter().all(|b| *b == page_id as u8 + 1));
    }
}
