//! Allocator statistics tracking.
//!
//! Provides a plain snapshot type and an atomic recorder used by
//! [`TrackedAllocator`](crate::allocator::TrackedAllocator).

use core::sync::atomic::{AtomicUsize, Ordering};

/// Statistics snapshot for an allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Total bytes currently allocated.
    pub allocated_bytes: usize,
    /// Peak bytes allocated.
    pub peak_allocated_bytes: usize,
    /// Total number of successful allocations.
    pub allocation_count: usize,
    /// Total number of deallocations.
    pub deallocation_count: usize,
    /// Number of failed allocations.
    pub failed_allocations: usize,
}

impl AllocatorStats {
    /// Creates a new empty stats object.
    pub const fn new() -> Self {
        Self {
            allocated_bytes: 0,
            peak_allocated_bytes: 0,
            allocation_count: 0,
            deallocation_count: 0,
            failed_allocations: 0,
        }
    }

    /// Balance of allocations vs deallocations.
    pub const fn allocation_balance(&self) -> isize {
        self.allocation_count as isize - self.deallocation_count as isize
    }

    /// Checks if there are any active allocations.
    pub const fn has_active_allocations(&self) -> bool {
        self.allocation_count > self.deallocation_count
    }
}

impl core::fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Allocator Statistics:")?;
        writeln!(f, "  Current allocated: {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Peak allocated: {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Allocations: {}", self.allocation_count)?;
        writeln!(f, "  Deallocations: {}", self.deallocation_count)?;
        writeln!(f, "  Failed allocations: {}", self.failed_allocations)
    }
}

/// Thread-safe atomic recorder behind [`AllocatorStats`] snapshots.
#[derive(Debug, Default)]
pub struct AtomicAllocatorStats {
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
    failed_allocations: AtomicUsize,
}

impl AtomicAllocatorStats {
    /// Creates a new empty atomic stats object.
    pub const fn new() -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            deallocation_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
        }
    }

    /// Records a successful allocation of `size` bytes.
    pub fn record_allocation(&self, size: usize) {
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        let current = self.allocated_bytes.fetch_add(size, Ordering::Relaxed) + size;
        // Lock-free max update; races only ever lose to a larger peak.
        let mut peak = self.peak_allocated_bytes.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_allocated_bytes.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    /// Records a deallocation of `size` bytes.
    pub fn record_deallocation(&self, size: usize) {
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
    }

    /// Records a failed allocation.
    pub fn record_allocation_failure(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Current bytes allocated.
    pub fn current_allocated(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Peak bytes allocated.
    pub fn peak_allocated(&self) -> usize {
        self.peak_allocated_bytes.load(Ordering::Relaxed)
    }

    /// Takes a consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
        }
    }

    /// Resets all statistics to zero.
    pub fn reset(&self) {
        self.allocated_bytes.store(0, Ordering::Relaxed);
        self.peak_allocated_bytes.store(0, Ordering::Relaxed);
        self.allocation_count.store(0, Ordering::Relaxed);
        self.deallocation_count.store(0, Ordering::Relaxed);
        self.failed_allocations.store(0, Ordering::Relaxed);
    }
}
