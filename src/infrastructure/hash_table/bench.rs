use criterion::{Criterion, black_box, criterion_group, criterion_main};

use clockpool::buffer::BufferTag;
use clockpool::infrastructure::hash_table::PageTable;

// Test configuration
const POOL_FRAMES: usize = 4096;
const STORES: u32 = 4;

fn tags() -> Vec<BufferTag> {
    (0..POOL_FRAMES as u64)
        .map(|i| BufferTag::new((i % STORES as u64) as u32 + 1, i / STORES as u64))
        .collect()
}

// Benchmark filling a pool-sized table from empty
pub fn bench_insert(c: &mut Criterion) {
    let tags = tags();
    let mut group = c.benchmark_group("PageTable");

    group.bench_function("insert", |b| {
        b.iter(|| {
            let mut table = PageTable::for_pool(POOL_FRAMES);
            for (frame_id, tag) in tags.iter().enumerate() {
                table.insert(*tag, frame_id).unwrap();
            }
            black_box(table.len())
        });
    });

    group.finish();
}

// Benchmark hit and miss lookups against a full table
pub fn bench_lookup(c: &mut Criterion) {
    let tags = tags();
    let mut table = PageTable::for_pool(POOL_FRAMES);
    for (frame_id, tag) in tags.iter().enumerate() {
        table.insert(*tag, frame_id).unwrap();
    }
    let mut group = c.benchmark_group("PageTable");

    group.bench_function("lookup_hit", |b| {
        b.iter(|| {
            for tag in &tags {
                black_box(table.lookup(tag));
            }
        });
    });

    group.bench_function("lookup_miss", |b| {
        b.iter(|| {
            for tag in &tags {
                black_box(table.lookup(&BufferTag::new(tag.store_id + STORES, tag.page_id)));
            }
        });
    });

    group.finish();
}

// Benchmark the remove/insert pair performed on every eviction
pub fn bench_evict_cycle(c: &mut Criterion) {
    let tags = tags();
    let mut table = PageTable::for_pool(POOL_FRAMES);
    for (frame_id, tag) in tags.iter().enumerate() {
        table.insert(*tag, frame_id).unwrap();
    }
    let mut group = c.benchmark_group("PageTable");

    group.bench_function("remove_insert", |b| {
        b.iter(|| {
            for tag in &tags {
                let frame_id = table.remove(tag).unwrap();
                table.insert(*tag, frame_id).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_evict_cycle);
criterion_main!(benches);
