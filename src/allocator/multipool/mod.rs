//! Bank of size-class pools with oversized fallback.

mod allocator;
mod config;
mod stats;

pub use allocator::{Multipool, MIN_BLOCK_SIZE};
pub use config::{MultipoolConfig, PoolParam, DEFAULT_NUM_POOLS};
pub use stats::MultipoolStats;
