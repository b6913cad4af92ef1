//! Pool statistics snapshot.

/// Point-in-time statistics for a single [`Pool`](crate::allocator::Pool).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Block size served by the pool, in bytes.
    pub block_size: usize,
    /// Blocks currently sitting on the free list.
    pub free_blocks: usize,
    /// Chunks currently held from the upstream allocator.
    pub chunks_allocated: usize,
    /// Blocks the next replenishment will request.
    pub next_chunk_blocks: usize,
    /// Cumulative successful allocations over the pool's lifetime.
    pub total_allocations: usize,
    /// Cumulative deallocations over the pool's lifetime.
    pub total_deallocations: usize,
}

impl PoolStats {
    /// Blocks handed out and not yet returned or released.
    pub const fn outstanding_blocks(&self) -> usize {
        self.total_allocations.saturating_sub(self.total_deallocations)
    }
}
