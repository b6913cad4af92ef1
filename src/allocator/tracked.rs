//! Statistics-tracking allocator wrapper.
//!
//! [`TrackedAllocator`] wraps any [`Allocator`] and records allocation
//! counts, byte totals, and peak usage. Useful in tests to verify that a
//! pooled allocator returns everything it took from its upstream, and in
//! long-running services to watch for leaks.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::allocator::stats::{AllocatorStats, AtomicAllocatorStats};
use crate::allocator::traits::{Allocator, MemoryUsage, ThreadSafeAllocator};
use crate::error::AllocResult;

/// Wraps an allocator and tracks its usage statistics.
#[derive(Debug, Default)]
pub struct TrackedAllocator<A> {
    inner: A,
    stats: AtomicAllocatorStats,
}

impl<A> TrackedAllocator<A> {
    /// Creates a new tracked allocator around `inner`.
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            stats: AtomicAllocatorStats::new(),
        }
    }

    /// Returns a reference to the wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Consumes the wrapper and returns the wrapped allocator.
    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Bytes currently allocated through this wrapper.
    pub fn allocated_bytes(&self) -> usize {
        self.stats.current_allocated()
    }

    /// Peak bytes allocated through this wrapper.
    pub fn peak_allocated_bytes(&self) -> usize {
        self.stats.peak_allocated()
    }

    /// Number of successful allocations.
    pub fn allocation_count(&self) -> usize {
        self.stats.snapshot().allocation_count
    }

    /// Number of deallocations.
    pub fn deallocation_count(&self) -> usize {
        self.stats.snapshot().deallocation_count
    }

    /// Number of failed allocations.
    pub fn failed_allocations(&self) -> usize {
        self.stats.snapshot().failed_allocations
    }

    /// Checks whether allocations and deallocations are unbalanced.
    pub fn has_leaks(&self) -> bool {
        let snap = self.stats.snapshot();
        snap.allocation_count > snap.deallocation_count
    }

    /// Number of allocations not yet deallocated.
    pub fn potential_leaks(&self) -> usize {
        let snap = self.stats.snapshot();
        snap.allocation_count.saturating_sub(snap.deallocation_count)
    }

    /// Resets the collected statistics to zero.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Returns a snapshot of all collected statistics.
    pub fn detailed_stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }
}

// SAFETY: forwards every call to the wrapped allocator; recording statistics
// does not affect the returned pointers or their contracts.
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: same contract as the wrapped allocator's allocate.
        match unsafe { self.inner.allocate(layout) } {
            Ok(ptr) => {
                self.stats.record_allocation(layout.size());
                Ok(ptr)
            }
            Err(err) => {
                self.stats.record_allocation_failure();
                Err(err)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: same contract as the wrapped allocator's deallocate.
        unsafe { self.inner.deallocate(ptr, layout) };
        self.stats.record_deallocation(layout.size());
    }
}

// SAFETY: statistics are atomic, so thread safety reduces to the wrapped
// allocator's.
unsafe impl<A: ThreadSafeAllocator> ThreadSafeAllocator for TrackedAllocator<A> {}

impl<A> MemoryUsage for TrackedAllocator<A> {
    fn used_memory(&self) -> usize {
        self.stats.current_allocated()
    }
}

/// Extension trait for wrapping any allocator with tracking.
pub trait TrackExt: Allocator + Sized {
    /// Wraps this allocator with statistics tracking.
    fn with_tracking(self) -> TrackedAllocator<Self> {
        TrackedAllocator::new(self)
    }
}

impl<A: Allocator + Sized> TrackExt for A {}
