//! Managed multipool memory allocation.
//!
//! This crate provides [`Multipool`], an allocator that maintains a bank of
//! [`Pool`]s over geometrically spaced block sizes and serves each request
//! from the smallest pool whose block fits. Requests beyond the largest
//! pooled size fall through to an upstream allocator. All memory — pooled
//! chunks and oversized blocks alike — can be returned upstream in one
//! [`Multipool::release`] call, which makes the multipool a natural backing
//! store for node-heavy containers that are torn down together.
//!
//! # Example
//!
//! ```
//! use multipool::{Multipool, MemoryUsage};
//!
//! let mp = Multipool::new()?;
//!
//! // Routed to the 32-byte pool.
//! let node = mp.allocate(25)?;
//!
//! // Too big for any pool; served by the upstream allocator.
//! let buffer = mp.allocate(10_000)?;
//!
//! unsafe {
//!     mp.deallocate(node);
//!     mp.deallocate(buffer);
//! }
//! assert_eq!(mp.used_memory(), 0);
//!
//! // Or skip individual deallocation entirely:
//! let _a = mp.allocate(100)?;
//! let _b = mp.allocate(20_000)?;
//! mp.release();
//! # Ok::<(), multipool::MemoryError>(())
//! ```
//!
//! # Design
//!
//! - Pool `i` serves blocks of `8 << i` bytes; the default ten pools cover
//!   8 through 4096 bytes.
//! - Pools grow by requesting chunks of blocks from the upstream, starting
//!   small and doubling per replenishment up to a cap
//!   ([`GrowthStrategy::Geometric`]), or at a constant chunk size
//!   ([`GrowthStrategy::Constant`]).
//! - Every block carries a hidden header identifying its origin, so
//!   deallocation needs only the pointer.
//! - Allocation failures propagate from the upstream untouched and leave
//!   the multipool in a consistent, retryable state.
//!
//! [`Multipool`] is not thread-safe. Allocation and deallocation take
//! `&self` through interior mutability, but the type is deliberately not
//! `Sync`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod allocator;
pub mod error;
pub mod utils;

pub use allocator::{
    default_allocator, Allocator, AllocatorStats, GrowthStrategy, MemoryUsage, Multipool,
    MultipoolConfig, MultipoolStats, Pool, PoolConfig, PoolParam, PoolStats, SystemAllocator,
    ThreadSafeAllocator, TrackExt, TrackedAllocator, DEFAULT_MAX_BLOCKS_PER_CHUNK,
    DEFAULT_NUM_POOLS, MIN_BLOCK_SIZE,
};
pub use error::{AllocResult, MemoryError};
pub use utils::MAX_ALIGN;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
