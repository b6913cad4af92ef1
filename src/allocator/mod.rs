//! Allocator implementations and capability traits.
//!
//! The centerpiece is [`Multipool`], a bank of fixed-size [`Pool`]s with
//! oversized fallback and O(1) bulk release. [`SystemAllocator`] adapts the
//! platform heap to the same [`Allocator`] trait, and [`TrackedAllocator`]
//! wraps any allocator with statistics.

pub mod multipool;
pub mod pool;
pub mod stats;
pub mod system;
pub mod tracked;
pub mod traits;

pub use multipool::{
    Multipool, MultipoolConfig, MultipoolStats, PoolParam, DEFAULT_NUM_POOLS, MIN_BLOCK_SIZE,
};
pub use pool::{GrowthStrategy, Pool, PoolConfig, PoolStats, DEFAULT_MAX_BLOCKS_PER_CHUNK};
pub use stats::{AllocatorStats, AtomicAllocatorStats};
pub use system::{default_allocator, SystemAllocator};
pub use tracked::{TrackExt, TrackedAllocator};
pub use traits::{Allocator, MemoryUsage, ThreadSafeAllocator};
