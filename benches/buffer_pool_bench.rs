//! Buffer pool throughput benchmarks: cache hits, cold faults, and
//! contended reader/writer traffic on a shared page.

use std::sync::Arc;
use std::thread;

use bufferpool::{BufferPool, BufferPoolConfig, PageId};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tempfile::tempdir;

fn bench_cache_hit_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hit_reads");
    group.throughput(Throughput::Elements(1));

    let dir = tempdir().unwrap();
    let pool = BufferPool::open(BufferPoolConfig::new(dir.path().join("heap.db"), 64, 4)).unwrap();
    let page_id = pool.allocate_new_page().unwrap();
    pool.get_for_read(page_id); // bring the page into the cache once

    group.bench_function("get_for_read", |b| {
        b.iter(|| black_box(pool.get_for_read(page_id)));
    });
    group.finish();
}

fn bench_cold_faults(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_faults");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_for_write_new_page", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let pool =
                    BufferPool::open(BufferPoolConfig::new(dir.path().join("heap.db"), 4, 4))
                        .unwrap();
                let page_id = pool.allocate_new_page().unwrap();
                (dir, pool, page_id)
            },
            |(_dir, pool, page_id)| {
                black_box(pool.get_for_write(page_id));
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_contended_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_page");
    group.throughput(Throughput::Elements(1));

    let dir = tempdir().unwrap();
    let pool = Arc::new(
        BufferPool::open(BufferPoolConfig::new(dir.path().join("heap.db"), 16, 4)).unwrap(),
    );
    let page_id = pool.allocate_new_page().unwrap();
    pool.get_for_read(page_id);

    group.bench_function("4_readers_1_writer", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for _ in 0..4 {
                    let pool = pool.clone();
                    scope.spawn(move || {
                        black_box(pool.get_for_read(page_id));
                    });
                }
                let writer_pool = pool.clone();
                scope.spawn(move || {
                    black_box(writer_pool.get_for_write(page_id));
                });
            });
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_cache_hit_reads,
    bench_cold_faults,
    bench_contended_page
);
criterion_main!(benches);
