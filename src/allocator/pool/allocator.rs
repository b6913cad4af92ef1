//! Fixed-size block pool.
//!
//! A [`Pool`] serves blocks of a single size from chunks obtained from an
//! upstream [`Allocator`]. Freed blocks go onto an intrusive free list
//! threaded through the blocks themselves, so allocation and deallocation
//! are both O(1) pointer operations. [`Pool::release_all`] returns every
//! chunk to the upstream at once, invalidating all outstanding blocks.
//!
//! # Safety
//!
//! This module uses unsafe code for the intrusive free list:
//!
//! ## Invariants
//! - every block start is aligned to [`MAX_ALIGN`] and at least
//!   `size_of::<FreeBlock>()` bytes, so a `FreeBlock` header can be written
//!   into any free block
//! - the free list only ever links blocks inside chunks currently owned by
//!   this pool
//! - chunks are deallocated with exactly the layout they were allocated with

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};

use tracing::trace;

use crate::allocator::pool::config::PoolConfig;
use crate::allocator::pool::stats::PoolStats;
use crate::allocator::system::default_allocator;
use crate::allocator::traits::{Allocator, MemoryUsage};
use crate::error::{AllocResult, MemoryError};
use crate::utils::{align_up, MAX_ALIGN};

/// Free list node stored inside a free block.
struct FreeBlock {
    next: *mut FreeBlock,
}

/// A contiguous run of blocks obtained from the upstream allocator.
struct Chunk {
    ptr: NonNull<u8>,
    layout: Layout,
}

/// Memory pool handing out fixed-size, maximally aligned blocks.
///
/// Not thread-safe; uses interior mutability so that allocation takes
/// `&self`, matching the [`Allocator`] trait the rest of the crate builds
/// on.
pub struct Pool<'up> {
    block_size: usize,
    /// Distance between consecutive block starts inside a chunk. At least
    /// `block_size`, at least `size_of::<FreeBlock>()`, and a multiple of
    /// `MAX_ALIGN`.
    stride: usize,
    config: PoolConfig,
    free_head: Cell<*mut FreeBlock>,
    free_blocks: Cell<usize>,
    /// Blocks the next replenishment will request.
    next_chunk_blocks: Cell<usize>,
    chunks: RefCell<Vec<Chunk>>,
    total_allocations: Cell<usize>,
    total_deallocations: Cell<usize>,
    upstream: &'up dyn Allocator,
}

impl<'up> Pool<'up> {
    /// Creates a pool with the default configuration and the system
    /// allocator as upstream.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if `block_size` is zero.
    pub fn new(block_size: usize) -> AllocResult<Self> {
        Self::with_config_in(block_size, PoolConfig::default(), default_allocator())
    }

    /// Creates a pool with the given configuration and the system allocator
    /// as upstream.
    pub fn with_config(block_size: usize, config: PoolConfig) -> AllocResult<Self> {
        Self::with_config_in(block_size, config, default_allocator())
    }

    /// Creates a pool with the default configuration over a caller-supplied
    /// upstream allocator.
    pub fn new_in(block_size: usize, upstream: &'up dyn Allocator) -> AllocResult<Self> {
        Self::with_config_in(block_size, PoolConfig::default(), upstream)
    }

    /// Creates a pool with the given configuration over a caller-supplied
    /// upstream allocator.
    ///
    /// No memory is requested until the first allocation.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if `block_size` is zero or the
    /// configuration fails validation.
    pub fn with_config_in(
        block_size: usize,
        config: PoolConfig,
        upstream: &'up dyn Allocator,
    ) -> AllocResult<Self> {
        if block_size == 0 {
            return Err(MemoryError::invalid_config("block_size must be at least 1"));
        }
        config.validate()?;

        let stride = align_up(block_size.max(mem::size_of::<FreeBlock>()), MAX_ALIGN);

        Ok(Self {
            block_size,
            stride,
            config,
            free_head: Cell::new(ptr::null_mut()),
            free_blocks: Cell::new(0),
            next_chunk_blocks: Cell::new(config.initial_chunk_blocks()),
            chunks: RefCell::new(Vec::new()),
            total_allocations: Cell::new(0),
            total_deallocations: Cell::new(0),
            upstream,
        })
    }

    /// Block size served by this pool, in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Distance between consecutive block starts, in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Allocates one block.
    ///
    /// The returned pointer is valid for `block_size` bytes and aligned to
    /// [`MAX_ALIGN`].
    ///
    /// # Errors
    /// Returns the upstream's error if a needed replenishment fails; the
    /// pool is left unchanged in that case.
    pub fn allocate(&self) -> AllocResult<NonNull<u8>> {
        if self.free_head.get().is_null() {
            self.replenish()?;
        }

        let head = self.free_head.get();
        debug_assert!(!head.is_null());
        // SAFETY: head is non-null after a successful replenish and points
        // into a chunk owned by this pool; reading the embedded FreeBlock is
        // valid because every block is large enough to hold one.
        let next = unsafe { (*head).next };
        self.free_head.set(next);
        self.free_blocks.set(self.free_blocks.get() - 1);
        self.total_allocations.set(self.total_allocations.get() + 1);

        // SAFETY: head came off the free list, which only holds non-null
        // block pointers.
        Ok(unsafe { NonNull::new_unchecked(head.cast::<u8>()) })
    }

    /// Returns a block to the pool.
    ///
    /// # Safety
    /// - `ptr` must have been returned by [`allocate`](Self::allocate) on
    ///   this pool
    /// - the block must not have been deallocated or released already
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        debug_assert!(self.owns(ptr), "pointer does not belong to this pool");

        let block = ptr.as_ptr().cast::<FreeBlock>();
        // SAFETY: caller guarantees `ptr` is a live block from this pool;
        // blocks are large enough and aligned enough to hold a FreeBlock.
        unsafe {
            (*block).next = self.free_head.get();
        }
        self.free_head.set(block);
        self.free_blocks.set(self.free_blocks.get() + 1);
        self.total_deallocations.set(self.total_deallocations.get() + 1);
    }

    /// Ensures at least `additional` blocks are on the free list.
    ///
    /// Requests exactly the deficit in one chunk, without disturbing the
    /// growth schedule of ordinary replenishment.
    ///
    /// # Errors
    /// Returns the upstream's error on failure; the pool is left unchanged.
    pub fn reserve(&self, additional: usize) -> AllocResult<()> {
        let have = self.free_blocks.get();
        if additional <= have {
            return Ok(());
        }
        self.grow(additional - have)
    }

    /// Returns every chunk to the upstream allocator.
    ///
    /// All blocks handed out by this pool become invalid; using one
    /// afterwards is undefined behavior. The growth schedule restarts from
    /// the initial chunk size.
    pub fn release_all(&self) {
        let chunks = self.chunks.take();
        let released = chunks.len();
        for chunk in chunks {
            // SAFETY: every chunk was allocated from `self.upstream` with
            // exactly this layout and has not been deallocated before; the
            // free list that pointed into it is discarded below.
            unsafe { self.upstream.deallocate(chunk.ptr, chunk.layout) };
        }

        // Count everything still outstanding as returned, so the stats
        // stay balanced across a bulk release.
        let outstanding = self
            .total_allocations
            .get()
            .saturating_sub(self.total_deallocations.get());
        self.total_deallocations
            .set(self.total_deallocations.get() + outstanding);

        self.free_head.set(ptr::null_mut());
        self.free_blocks.set(0);
        self.next_chunk_blocks
            .set(self.config.initial_chunk_blocks());

        trace!(
            block_size = self.block_size,
            chunks = released,
            "pool released all chunks"
        );
    }

    /// Checks whether `ptr` points into a chunk owned by this pool.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        self.chunks.borrow().iter().any(|chunk| {
            let start = chunk.ptr.as_ptr() as usize;
            addr >= start && addr < start + chunk.layout.size()
        })
    }

    /// Returns a snapshot of the pool's statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            block_size: self.block_size,
            free_blocks: self.free_blocks.get(),
            chunks_allocated: self.chunks.borrow().len(),
            next_chunk_blocks: self.next_chunk_blocks.get(),
            total_allocations: self.total_allocations.get(),
            total_deallocations: self.total_deallocations.get(),
        }
    }

    /// Requests the next scheduled chunk and advances the growth schedule.
    fn replenish(&self) -> AllocResult<()> {
        let blocks = self.next_chunk_blocks.get();
        self.grow(blocks)?;
        self.next_chunk_blocks
            .set(self.config.next_chunk_blocks(blocks));
        Ok(())
    }

    /// Obtains one chunk of `blocks` blocks from the upstream and threads
    /// them onto the free list.
    fn grow(&self, blocks: usize) -> AllocResult<()> {
        debug_assert!(blocks > 0);
        let chunk_size = self
            .stride
            .checked_mul(blocks)
            .ok_or(MemoryError::SizeOverflow)?;
        let layout = Layout::from_size_align(chunk_size, MAX_ALIGN)
            .map_err(|_| MemoryError::SizeOverflow)?;

        // SAFETY: layout has non-zero size and valid alignment.
        let chunk = unsafe { self.upstream.allocate(layout)? }.cast::<u8>();

        // Thread the blocks in reverse so the free list pops them in
        // address order.
        let mut head = self.free_head.get();
        for i in (0..blocks).rev() {
            // SAFETY: i * stride < chunk_size, so the block start is inside
            // the chunk; it is aligned to MAX_ALIGN and large enough to
            // hold a FreeBlock by construction of `stride`.
            unsafe {
                let block = chunk.as_ptr().add(i * self.stride).cast::<FreeBlock>();
                (*block).next = head;
                head = block;
            }
        }
        self.free_head.set(head);
        self.free_blocks.set(self.free_blocks.get() + blocks);
        self.chunks.borrow_mut().push(Chunk { ptr: chunk, layout });

        trace!(
            block_size = self.block_size,
            blocks,
            chunk_size,
            "pool grew by one chunk"
        );
        Ok(())
    }
}

impl MemoryUsage for Pool<'_> {
    fn used_memory(&self) -> usize {
        let outstanding = self
            .total_allocations
            .get()
            .saturating_sub(self.total_deallocations.get());
        outstanding * self.stride
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.free_blocks.get() * self.stride)
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.chunks.borrow().iter().map(|c| c.layout.size()).sum())
    }
}

impl fmt::Debug for Pool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("block_size", &self.block_size)
            .field("stride", &self.stride)
            .field("config", &self.config)
            .field("free_blocks", &self.free_blocks.get())
            .field("chunks", &self.chunks.borrow().len())
            .field("next_chunk_blocks", &self.next_chunk_blocks.get())
            .finish()
    }
}

impl Drop for Pool<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_block_size() {
        assert!(Pool::new(0).unwrap_err().is_invalid_config());
    }

    #[test]
    fn blocks_are_max_aligned_and_distinct() {
        let pool = Pool::new(24).unwrap();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_ptr() as usize % MAX_ALIGN, 0);
        assert_eq!(b.as_ptr() as usize % MAX_ALIGN, 0);
        assert!(pool.owns(a));
        assert!(pool.owns(b));
        unsafe {
            pool.deallocate(a);
            pool.deallocate(b);
        }
    }

    #[test]
    fn freed_block_is_reused() {
        let pool = Pool::new(16).unwrap();
        let a = pool.allocate().unwrap();
        unsafe { pool.deallocate(a) };
        let b = pool.allocate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stride_covers_free_list_node() {
        let pool = Pool::new(1).unwrap();
        assert_eq!(pool.stride(), MAX_ALIGN);
        assert_eq!(pool.block_size(), 1);
    }
}
