//! Pool growth configuration.

use crate::error::{AllocResult, MemoryError};

/// Default cap on the number of blocks requested in a single chunk.
pub const DEFAULT_MAX_BLOCKS_PER_CHUNK: usize = 32;

/// Chunk growth strategy for a pool.
///
/// Controls how many blocks a pool requests from its upstream each time the
/// free list runs dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Start with one block per chunk and double on every replenishment,
    /// up to the configured cap. Keeps footprint tight for pools that see
    /// little traffic while converging to large chunks for hot pools.
    #[default]
    Geometric,
    /// Always request the configured cap. Predictable footprint from the
    /// first chunk on.
    Constant,
}

/// Configuration for a [`Pool`](crate::allocator::Pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// How chunk sizes evolve as the pool replenishes.
    pub growth: GrowthStrategy,
    /// Largest number of blocks requested in a single chunk.
    pub max_blocks_per_chunk: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            growth: GrowthStrategy::default(),
            max_blocks_per_chunk: DEFAULT_MAX_BLOCKS_PER_CHUNK,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with the given strategy and chunk cap.
    pub const fn new(growth: GrowthStrategy, max_blocks_per_chunk: usize) -> Self {
        Self {
            growth,
            max_blocks_per_chunk,
        }
    }

    /// Sets the growth strategy.
    #[must_use]
    pub const fn with_growth(mut self, growth: GrowthStrategy) -> Self {
        self.growth = growth;
        self
    }

    /// Sets the maximum blocks per chunk.
    #[must_use]
    pub const fn with_max_blocks_per_chunk(mut self, max: usize) -> Self {
        self.max_blocks_per_chunk = max;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if the chunk cap is zero.
    pub const fn validate(&self) -> AllocResult<()> {
        if self.max_blocks_per_chunk == 0 {
            return Err(MemoryError::invalid_config(
                "max_blocks_per_chunk must be at least 1",
            ));
        }
        Ok(())
    }

    /// Number of blocks in the first chunk a fresh pool requests.
    pub const fn initial_chunk_blocks(&self) -> usize {
        match self.growth {
            GrowthStrategy::Geometric => 1,
            GrowthStrategy::Constant => self.max_blocks_per_chunk,
        }
    }

    /// Number of blocks in the chunk after one of `current` blocks.
    pub const fn next_chunk_blocks(&self, current: usize) -> usize {
        match self.growth {
            GrowthStrategy::Geometric => {
                let doubled = current.saturating_mul(2);
                if doubled > self.max_blocks_per_chunk {
                    self.max_blocks_per_chunk
                } else {
                    doubled
                }
            }
            GrowthStrategy::Constant => self.max_blocks_per_chunk,
        }
    }
}
