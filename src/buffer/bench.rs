use criterion::{Criterion, black_box, criterion_group, criterion_main};

use clockpool::buffer::{BufferPool, StoreRef};
use clockpool::store::MemStore;
use std::sync::Arc;

// Test configuration
const POOL_FRAMES: usize = 1024;
const STORE_PAGES: u64 = 4096;

fn store() -> StoreRef {
    Arc::new(MemStore::with_pages("bench", STORE_PAGES))
}

// Benchmark fetch/release of pages that are all resident
pub fn bench_hit(c: &mut Criterion) {
    let store = store();
    let mut pool = BufferPool::with_frames(POOL_FRAMES).unwrap();
    for page_id in 0..POOL_FRAMES as u64 {
        pool.fetch_page(&store, page_id).unwrap();
        pool.release_page(&store, page_id, false).unwrap();
    }
    let mut group = c.benchmark_group("BufferPool");

    group.bench_function("fetch_hit", |b| {
        b.iter(|| {
            for page_id in 0..POOL_FRAMES as u64 {
                let handle = pool.fetch_page(&store, page_id).unwrap();
                black_box(handle.frame_id());
                pool.release_page(&store, page_id, false).unwrap();
            }
        });
    });

    group.finish();
}

// Benchmark a scan four times larger than the pool, every fetch a miss
pub fn bench_sweep(c: &mut Criterion) {
    let store = store();
    let mut pool = BufferPool::with_frames(POOL_FRAMES).unwrap();
    let mut group = c.benchmark_group("BufferPool");

    group.bench_function("scan_evict_clean", |b| {
        b.iter(|| {
            for page_id in 0..STORE_PAGES {
                pool.fetch_page(&store, page_id).unwrap();
                pool.release_page(&store, page_id, false).unwrap();
            }
        });
    });

    group.bench_function("scan_evict_dirty", |b| {
        b.iter(|| {
            for page_id in 0..STORE_PAGES {
                pool.fetch_page(&store, page_id).unwrap();
                pool.release_page(&store, page_id, true).unwrap();
            }
        });
    });

    group.finish();
}

// Benchmark the sweep when most frames stay pinned
pub fn bench_pinned_sweep(c: &mut Criterion) {
    let store = store();
    let mut pool = BufferPool::with_frames(POOL_FRAMES).unwrap();
    // Pin all but the last eight frames for the whole run
    for page_id in 0..(POOL_FRAMES - 8) as u64 {
        pool.fetch_page(&store, page_id).unwrap();
    }
    let mut group = c.benchmark_group("BufferPool");

    group.bench_function("sweep_mostly_pinned", |b| {
        let mut page_id = POOL_FRAMES as u64;
        b.iter(|| {
            pool.fetch_page(&store, page_id).unwrap();
            pool.release_page(&store, page_id, false).unwrap();
            page_id = if page_id + 1 == STORE_PAGES {
                POOL_FRAMES as u64
            } else {
                page_id + 1
            };
        });
    });

    group.finish();
}

criterion_group!(benches, bench_hit, bench_sweep, bench_pinned_sweep);
criterion_main!(benches);
