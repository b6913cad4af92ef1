//! Multipool statistics snapshot.

use crate::allocator::pool::PoolStats;

/// Point-in-time statistics for a [`Multipool`](crate::allocator::Multipool).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipoolStats {
    /// Per-pool statistics, indexed by pool number.
    pub pools: Vec<PoolStats>,
    /// Oversized blocks currently outstanding.
    pub oversized_blocks: usize,
    /// Cumulative oversized allocations over the multipool's lifetime.
    pub oversized_allocations: usize,
    /// Bytes currently held by oversized blocks, including their headers.
    pub oversized_bytes: usize,
}

impl MultipoolStats {
    /// Blocks handed out and not yet returned or released, pooled and
    /// oversized combined.
    pub fn outstanding_blocks(&self) -> usize {
        self.pools
            .iter()
            .map(|p| p.outstanding_blocks())
            .sum::<usize>()
            + self.oversized_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_sums_pools_and_oversized() {
        let stats = MultipoolStats {
            pools: vec![
                PoolStats {
                    total_allocations: 4,
                    total_deallocations: 1,
                    ..PoolStats::default()
                },
                PoolStats {
                    total_allocations: 2,
                    total_deallocations: 2,
                    ..PoolStats::default()
                },
            ],
            oversized_blocks: 2,
            oversized_allocations: 3,
            oversized_bytes: 9000,
        };
        assert_eq!(stats.outstanding_blocks(), 5);
    }
}
