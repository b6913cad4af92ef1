//! Integration tests for the multipool allocator.

use core::alloc::Layout;
use core::ptr::NonNull;

use multipool::{
    Allocator, GrowthStrategy, MemoryUsage, Multipool, MultipoolConfig, SystemAllocator, TrackExt,
    MAX_ALIGN,
};
use proptest::prelude::*;

#[test]
fn round_trip_across_all_size_classes() {
    let mp = Multipool::new().unwrap();

    let sizes: Vec<usize> = (0..=12).map(|i| 1usize << i).chain([3, 100, 4095]).collect();
    let mut ptrs = Vec::new();
    for &size in &sizes {
        let ptr = mp.allocate(size).unwrap();
        assert_eq!(ptr.as_ptr() as usize % MAX_ALIGN, 0, "size {size}");
        unsafe { ptr.as_ptr().write_bytes(0x5A, size) };
        ptrs.push((ptr, size));
    }

    // Contents survive until deallocation.
    for &(ptr, size) in &ptrs {
        for offset in [0, size.saturating_sub(1)] {
            if size > 0 {
                assert_eq!(unsafe { *ptr.as_ptr().add(offset) }, 0x5A);
            }
        }
    }

    for (ptr, _) in ptrs {
        unsafe { mp.deallocate(ptr) };
    }
    assert_eq!(mp.stats().outstanding_blocks(), 0);
    assert_eq!(mp.used_memory(), 0);
}

#[test]
fn requests_route_to_the_smallest_fitting_pool() {
    let mp = Multipool::new().unwrap();

    // (request size, expected pool index)
    for (size, pool) in [(1, 0), (8, 0), (9, 1), (24, 2), (33, 3), (4096, 9)] {
        let ptr = mp.allocate(size).unwrap();
        let stats = mp.stats();
        assert_eq!(
            stats.pools[pool].outstanding_blocks(),
            1,
            "size {size} should land in pool {pool}"
        );
        unsafe { mp.deallocate(ptr) };
        assert_eq!(mp.stats().pools[pool].outstanding_blocks(), 0);
    }
}

#[test]
fn oversized_requests_bypass_the_pools() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();
    let max = mp.max_pooled_block_size();

    let ptr = mp.allocate(max + 1).unwrap();
    let stats = mp.stats();
    assert_eq!(stats.oversized_blocks, 1);
    assert_eq!(stats.oversized_allocations, 1);
    assert!(stats.pools.iter().all(|p| p.total_allocations == 0));
    // Exactly one upstream request, no pooled chunks.
    assert_eq!(upstream.allocation_count(), 1);

    unsafe { mp.deallocate(ptr) };
    assert_eq!(mp.stats().oversized_blocks, 0);
    assert!(!upstream.has_leaks());
}

#[test]
fn oversized_blocks_free_in_any_order() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();
    let max = mp.max_pooled_block_size();

    let a = mp.allocate(max + 1).unwrap();
    let b = mp.allocate(max + 100).unwrap();
    let c = mp.allocate(max * 2).unwrap();

    // Middle, tail, head of the intrusive list.
    unsafe {
        mp.deallocate(b);
        mp.deallocate(a);
        mp.deallocate(c);
    }
    assert_eq!(mp.stats().oversized_blocks, 0);
    assert!(!upstream.has_leaks());
}

#[test]
fn zero_size_requests_never_touch_the_upstream() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();

    let ptr = mp.allocate(0).unwrap();
    assert_eq!(upstream.allocation_count(), 0);
    unsafe { mp.deallocate(ptr) };
    assert_eq!(upstream.deallocation_count(), 0);
    assert_eq!(mp.stats().outstanding_blocks(), 0);
}

#[test]
fn release_returns_all_memory_and_is_idempotent() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();

    for size in [5, 50, 500, 5000, 20_000] {
        mp.allocate(size).unwrap();
    }
    assert!(upstream.allocated_bytes() > 0);

    mp.release();
    assert_eq!(upstream.allocated_bytes(), 0);
    assert!(!upstream.has_leaks());
    assert_eq!(mp.used_memory(), 0);

    // A second release is a no-op.
    mp.release();
    assert!(!upstream.has_leaks());

    // Still usable afterwards.
    let ptr = mp.allocate(64).unwrap();
    unsafe { mp.deallocate(ptr) };
}

#[test]
fn constant_growth_scenario_with_three_pools() {
    let upstream = SystemAllocator::new().with_tracking();
    let config = MultipoolConfig::new(3)
        .with_growth(GrowthStrategy::Constant)
        .with_max_blocks_per_chunk(4);
    let mp = Multipool::with_config_in(config, &upstream).unwrap();

    assert_eq!(mp.num_pools(), 3);
    assert_eq!(mp.max_pooled_block_size(), 32);

    // Twenty bytes lands in the 32-byte pool; four blocks per chunk means
    // the fifth allocation forces a second chunk.
    let ptrs: Vec<_> = (0..5).map(|_| mp.allocate(20).unwrap()).collect();
    assert_eq!(upstream.allocation_count(), 2);
    assert_eq!(mp.stats().pools[2].chunks_allocated, 2);

    mp.release();
    assert!(!upstream.has_leaks());
    drop(ptrs);

    // A fresh allocation needs a fresh chunk.
    mp.allocate(20).unwrap();
    assert_eq!(upstream.allocation_count(), 3);
}

#[test]
fn reserve_capacity_prefills_one_pool() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();

    mp.reserve_capacity(100, 8).unwrap();
    let stats = mp.stats();
    // 100 bytes is served by the 128-byte pool, index 4.
    assert_eq!(stats.pools[4].free_blocks, 8);
    assert_eq!(upstream.allocation_count(), 1);

    for _ in 0..8 {
        mp.allocate(100).unwrap();
    }
    assert_eq!(upstream.allocation_count(), 1);

    // Beyond the largest pooled class there is nothing to reserve into.
    let err = mp.reserve_capacity(mp.max_pooled_block_size() + 1, 1).unwrap_err();
    assert!(matches!(err, multipool::MemoryError::Unsupported { .. }));
}

#[test]
fn invalid_configurations_are_rejected_at_construction() {
    assert!(Multipool::with_pools(0).unwrap_err().is_invalid_config());

    let short = MultipoolConfig::new(4).with_max_blocks_per_chunk(vec![4, 4]);
    assert!(Multipool::with_config(short).unwrap_err().is_invalid_config());

    let zero_cap = MultipoolConfig::new(2).with_max_blocks_per_chunk(0usize);
    assert!(Multipool::with_config(zero_cap).unwrap_err().is_invalid_config());
}

#[test]
fn allocator_trait_enforces_the_alignment_ceiling() {
    let mp = Multipool::new().unwrap();
    let alloc: &dyn Allocator = &mp;

    let ok = Layout::from_size_align(64, 16).unwrap();
    let too_aligned = Layout::from_size_align(64, 32).unwrap();

    unsafe {
        let block = alloc.allocate(ok).unwrap();
        assert_eq!(block.len(), 64);
        alloc.deallocate(block.cast(), ok);

        let err = alloc.allocate(too_aligned).unwrap_err();
        assert!(err.is_invalid_alignment());
    }
}

#[test]
fn interleaved_workload_balances_the_upstream() {
    let upstream = SystemAllocator::new().with_tracking();
    let mp = Multipool::new_in(&upstream).unwrap();

    let mut live: Vec<(NonNull<u8>, usize)> = Vec::new();
    for round in 0..50usize {
        let size = (round * 37) % 6000;
        live.push((mp.allocate(size).unwrap(), size));
        if round % 3 == 0 {
            let (ptr, _) = live.swap_remove(round % live.len());
            unsafe { mp.deallocate(ptr) };
        }
    }
    for (ptr, _) in live {
        unsafe { mp.deallocate(ptr) };
    }

    assert_eq!(mp.stats().outstanding_blocks(), 0);
    mp.release();
    assert!(!upstream.has_leaks());
    assert_eq!(upstream.allocated_bytes(), 0);
}

proptest! {
    #[test]
    fn any_size_round_trips(sizes in prop::collection::vec(0usize..9000, 1..64)) {
        let mp = Multipool::new().unwrap();
        let mut ptrs = Vec::with_capacity(sizes.len());
        for &size in &sizes {
            let ptr = mp.allocate(size).unwrap();
            prop_assert_eq!(ptr.as_ptr() as usize % MAX_ALIGN, 0);
            if size > 0 {
                unsafe { ptr.as_ptr().write_bytes(0xA5, size) };
            }
            ptrs.push(ptr);
        }
        for ptr in ptrs {
            unsafe { mp.deallocate(ptr) };
        }
        prop_assert_eq!(mp.stats().outstanding_blocks(), 0);
        prop_assert_eq!(mp.used_memory(), 0);
    }
}
