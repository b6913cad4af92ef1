//! Multipool configuration.
//!
//! A [`MultipoolConfig`] fixes the number of size-class pools and, either
//! uniformly or per pool, their growth behavior. Validation happens at
//! construction time; a [`Multipool`](crate::allocator::Multipool) built
//! from a validated configuration cannot hit a configuration error later.

use crate::allocator::pool::{GrowthStrategy, PoolConfig, DEFAULT_MAX_BLOCKS_PER_CHUNK};
use crate::error::{AllocResult, MemoryError};

/// Default number of size-class pools.
///
/// Ten pools cover block sizes 8 through 4096 bytes.
pub const DEFAULT_NUM_POOLS: usize = 10;

/// A per-pool parameter: one shared value, or one value per pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolParam<T> {
    /// The same value applies to every pool.
    Uniform(T),
    /// One value per pool, indexed by pool number. The vector length must
    /// equal the configured number of pools.
    PerPool(Vec<T>),
}

impl<T: Copy> PoolParam<T> {
    /// Value for pool `index`.
    pub fn for_pool(&self, index: usize) -> T {
        match self {
            PoolParam::Uniform(value) => *value,
            PoolParam::PerPool(values) => values[index],
        }
    }

    /// Checks that a per-pool vector matches the pool count exactly.
    fn validate_len(&self, num_pools: usize, what: &'static str) -> AllocResult<()> {
        match self {
            PoolParam::Uniform(_) => Ok(()),
            PoolParam::PerPool(values) if values.len() == num_pools => Ok(()),
            PoolParam::PerPool(_) => Err(MemoryError::invalid_config(what)),
        }
    }
}

impl<T> From<T> for PoolParam<T> {
    fn from(value: T) -> Self {
        PoolParam::Uniform(value)
    }
}

impl<T> From<Vec<T>> for PoolParam<T> {
    fn from(values: Vec<T>) -> Self {
        PoolParam::PerPool(values)
    }
}

/// Configuration for a [`Multipool`](crate::allocator::Multipool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipoolConfig {
    /// Number of size-class pools. Pool `i` serves blocks of `8 << i` bytes.
    pub num_pools: usize,
    /// Growth strategy, uniform or per pool.
    pub growth: PoolParam<GrowthStrategy>,
    /// Chunk cap in blocks, uniform or per pool.
    pub max_blocks_per_chunk: PoolParam<usize>,
}

impl Default for MultipoolConfig {
    fn default() -> Self {
        Self {
            num_pools: DEFAULT_NUM_POOLS,
            growth: PoolParam::Uniform(GrowthStrategy::default()),
            max_blocks_per_chunk: PoolParam::Uniform(DEFAULT_MAX_BLOCKS_PER_CHUNK),
        }
    }
}

impl MultipoolConfig {
    /// Creates a configuration with `num_pools` pools and defaults for
    /// everything else.
    pub fn new(num_pools: usize) -> Self {
        Self {
            num_pools,
            ..Self::default()
        }
    }

    /// Sets the growth strategy, uniformly or per pool.
    #[must_use]
    pub fn with_growth(mut self, growth: impl Into<PoolParam<GrowthStrategy>>) -> Self {
        self.growth = growth.into();
        self
    }

    /// Sets the chunk cap, uniformly or per pool.
    #[must_use]
    pub fn with_max_blocks_per_chunk(mut self, max: impl Into<PoolParam<usize>>) -> Self {
        self.max_blocks_per_chunk = max.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if the pool count is zero or
    /// large enough that the largest block size would overflow, if a
    /// per-pool vector length does not match the pool count, or if any
    /// per-pool configuration fails its own validation.
    pub fn validate(&self) -> AllocResult<()> {
        if self.num_pools == 0 {
            return Err(MemoryError::invalid_config("num_pools must be at least 1"));
        }
        // Largest class is 8 << (num_pools - 1); keep it well inside usize.
        if self.num_pools > usize::BITS as usize - 4 {
            return Err(MemoryError::invalid_config(
                "num_pools too large: largest block size would overflow",
            ));
        }
        self.growth
            .validate_len(self.num_pools, "growth list length must equal num_pools")?;
        self.max_blocks_per_chunk.validate_len(
            self.num_pools,
            "max_blocks_per_chunk list length must equal num_pools",
        )?;
        for i in 0..self.num_pools {
            self.pool_config(i).validate()?;
        }
        Ok(())
    }

    /// Configuration for pool `index`.
    ///
    /// Callers must validate first; indexes past a short per-pool vector
    /// panic.
    pub fn pool_config(&self, index: usize) -> PoolConfig {
        PoolConfig::new(
            self.growth.for_pool(index),
            self.max_blocks_per_chunk.for_pool(index),
        )
    }
}
