//! Fixed-size block pool with an intrusive free list.
//!
//! The building block underneath [`Multipool`](crate::allocator::Multipool):
//! one pool serves one block size, obtaining chunks of blocks from an
//! upstream allocator according to a configurable growth strategy.

mod allocator;
mod config;
mod stats;

pub use allocator::Pool;
pub use config::{GrowthStrategy, PoolConfig, DEFAULT_MAX_BLOCKS_PER_CHUNK};
pub use stats::PoolStats;
