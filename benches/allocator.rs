//! Allocation benchmarks: multipool vs the system allocator.

use core::alloc::Layout;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use multipool::{Allocator, Multipool, Pool, SystemAllocator};

fn pooled_allocate_deallocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pooled_round_trip");

    for size in [8usize, 64, 512, 4096] {
        group.bench_function(format!("multipool_{size}"), |b| {
            let mp = Multipool::new().unwrap();
            // Warm the pool so steady-state cost is measured, not chunk
            // growth.
            let warm = mp.allocate(size).unwrap();
            unsafe { mp.deallocate(warm) };

            b.iter(|| {
                let ptr = mp.allocate(size).unwrap();
                unsafe { mp.deallocate(ptr) };
            });
        });

        group.bench_function(format!("system_{size}"), |b| {
            let alloc = SystemAllocator::new();
            let layout = Layout::from_size_align(size, 16).unwrap();
            b.iter(|| unsafe {
                let ptr = alloc.allocate(layout).unwrap();
                alloc.deallocate(ptr.cast(), layout);
            });
        });
    }
    group.finish();
}

fn oversized_round_trip(c: &mut Criterion) {
    c.bench_function("oversized_round_trip_16k", |b| {
        let mp = Multipool::new().unwrap();
        b.iter(|| {
            let ptr = mp.allocate(16 * 1024).unwrap();
            unsafe { mp.deallocate(ptr) };
        });
    });
}

fn single_pool_round_trip(c: &mut Criterion) {
    c.bench_function("pool_round_trip_64", |b| {
        let pool = Pool::new(64).unwrap();
        let warm = pool.allocate().unwrap();
        unsafe { pool.deallocate(warm) };

        b.iter(|| {
            let ptr = pool.allocate().unwrap();
            unsafe { pool.deallocate(ptr) };
        });
    });
}

fn bulk_release(c: &mut Criterion) {
    c.bench_function("release_1000_mixed", |b| {
        b.iter_batched(
            || {
                let mp = Multipool::new().unwrap();
                for i in 0..1000usize {
                    mp.allocate((i * 13) % 5000).unwrap();
                }
                mp
            },
            |mp| mp.release(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    pooled_allocate_deallocate,
    oversized_round_trip,
    single_pool_round_trip,
    bulk_release
);
criterion_main!(benches);
