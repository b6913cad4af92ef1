//! Multipool allocator.
//!
//! A [`Multipool`] maintains a bank of [`Pool`]s over geometrically spaced
//! block sizes (8, 16, 32, ... bytes) and routes each request to the
//! smallest pool whose block fits it. Requests larger than the largest
//! pooled size fall through to the upstream allocator and are threaded onto
//! a doubly linked list so [`Multipool::release`] can return them in one
//! sweep together with every pooled chunk.
//!
//! Every block carries a hidden header recording which pool it came from,
//! so `deallocate` needs only the pointer.
//!
//! # Safety
//!
//! ## Invariants
//! - every pointer handed to a caller sits exactly `HEADER_SIZE` bytes past
//!   a live [`BlockHeader`], whether the block is pooled or oversized
//! - `origin` in a header is either a valid pool index or [`UNPOOLED`]
//! - the oversized list only links blocks allocated from `upstream` and not
//!   yet deallocated
//! - the zero-size sentinel is a fixed dangling address that no real
//!   allocation can produce, and is filtered before any header read

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};

use tracing::debug;

use crate::allocator::multipool::config::MultipoolConfig;
use crate::allocator::multipool::stats::MultipoolStats;
use crate::allocator::pool::Pool;
use crate::allocator::system::default_allocator;
use crate::allocator::traits::{validate_layout, Allocator, MemoryUsage};
use crate::error::{AllocResult, MemoryError};
use crate::utils::{MaxAligned, MAX_ALIGN};

/// Smallest pooled block size; pool `i` serves `MIN_BLOCK_SIZE << i` bytes.
pub const MIN_BLOCK_SIZE: usize = 8;

/// Origin value marking a block as oversized rather than pooled.
const UNPOOLED: usize = usize::MAX;

/// Hidden per-block header preceding every pointer handed out.
#[repr(C, align(16))]
struct BlockHeader {
    /// Index of the owning pool, or [`UNPOOLED`].
    origin: usize,
}

const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

// The header's alignment padding keeps user pointers maximally aligned.
const _: () = assert!(HEADER_SIZE == MAX_ALIGN);

/// Bookkeeping node prefixed to each oversized allocation.
///
/// The `header` field must sit flush against the user data so that the
/// "header at `ptr - HEADER_SIZE`" rule holds for oversized blocks too.
#[repr(C, align(16))]
struct OversizedBlock {
    prev: *mut OversizedBlock,
    next: *mut OversizedBlock,
    /// Layout of the whole upstream allocation, node included.
    layout: Layout,
    header: BlockHeader,
}

const OVERSIZED_PREFIX: usize = mem::size_of::<OversizedBlock>();

const _: () = assert!(
    mem::offset_of!(OversizedBlock, header) + HEADER_SIZE == OVERSIZED_PREFIX
);

/// Sentinel returned for zero-size requests.
///
/// Dangling but maximally aligned; no chunk or upstream allocation can
/// ever start this low, so `deallocate` can recognize it by address alone.
fn zero_size_sentinel() -> NonNull<u8> {
    NonNull::<MaxAligned>::dangling().cast()
}

/// Bank of size-class pools with oversized fallback and bulk release.
///
/// Not thread-safe; wrap in a lock for shared use. All pointers handed out
/// are aligned to [`MAX_ALIGN`].
pub struct Multipool<'up> {
    pools: Vec<Pool<'up>>,
    /// Largest request served from a pool; anything bigger goes upstream.
    max_pooled_size: usize,
    oversized_head: Cell<*mut OversizedBlock>,
    oversized_blocks: Cell<usize>,
    oversized_allocations: Cell<usize>,
    oversized_bytes: Cell<usize>,
    upstream: &'up dyn Allocator,
}

impl<'up> Multipool<'up> {
    /// Creates a multipool with the default configuration and the system
    /// allocator as upstream.
    pub fn new() -> AllocResult<Self> {
        Self::with_config_in(MultipoolConfig::default(), default_allocator())
    }

    /// Creates a multipool with `num_pools` pools and defaults for
    /// everything else.
    pub fn with_pools(num_pools: usize) -> AllocResult<Self> {
        Self::with_config_in(MultipoolConfig::new(num_pools), default_allocator())
    }

    /// Creates a multipool from a full configuration.
    pub fn with_config(config: MultipoolConfig) -> AllocResult<Self> {
        Self::with_config_in(config, default_allocator())
    }

    /// Creates a multipool with the default configuration over a
    /// caller-supplied upstream allocator.
    pub fn new_in(upstream: &'up dyn Allocator) -> AllocResult<Self> {
        Self::with_config_in(MultipoolConfig::default(), upstream)
    }

    /// Creates a multipool from a full configuration over a caller-supplied
    /// upstream allocator.
    ///
    /// No memory is requested until the first allocation.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config_in(
        config: MultipoolConfig,
        upstream: &'up dyn Allocator,
    ) -> AllocResult<Self> {
        config.validate()?;

        let mut pools = Vec::with_capacity(config.num_pools);
        for i in 0..config.num_pools {
            let block_size = HEADER_SIZE + (MIN_BLOCK_SIZE << i);
            pools.push(Pool::with_config_in(
                block_size,
                config.pool_config(i),
                upstream,
            )?);
        }
        let max_pooled_size = MIN_BLOCK_SIZE << (config.num_pools - 1);

        Ok(Self {
            pools,
            max_pooled_size,
            oversized_head: Cell::new(ptr::null_mut()),
            oversized_blocks: Cell::new(0),
            oversized_allocations: Cell::new(0),
            oversized_bytes: Cell::new(0),
            upstream,
        })
    }

    /// Number of size-class pools.
    pub fn num_pools(&self) -> usize {
        self.pools.len()
    }

    /// Largest request size served from a pool.
    pub fn max_pooled_block_size(&self) -> usize {
        self.max_pooled_size
    }

    /// Index of the pool serving `size`-byte requests.
    ///
    /// `size` must be in `1..=max_pooled_size`.
    fn pool_index(&self, size: usize) -> usize {
        debug_assert!(size >= 1 && size <= self.max_pooled_size);
        let class = size.next_power_of_two().max(MIN_BLOCK_SIZE);
        (class.trailing_zeros() - MIN_BLOCK_SIZE.trailing_zeros()) as usize
    }

    /// Allocates `size` bytes, aligned to [`MAX_ALIGN`].
    ///
    /// Zero-size requests succeed with a sentinel pointer that must not be
    /// dereferenced. Requests up to [`max_pooled_block_size`](Self::max_pooled_block_size)
    /// come from the matching pool; larger ones go straight upstream.
    ///
    /// # Errors
    /// Returns the upstream's error on exhaustion, or
    /// [`MemoryError::SizeOverflow`] if an oversized request overflows the
    /// layout arithmetic. The multipool is left unchanged on failure.
    pub fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        if size == 0 {
            return Ok(zero_size_sentinel());
        }
        if size <= self.max_pooled_size {
            let index = self.pool_index(size);
            let block = self.pools[index].allocate()?;
            // SAFETY: pool blocks are HEADER_SIZE + class bytes, aligned to
            // MAX_ALIGN; the header fits at the front and the user pointer
            // HEADER_SIZE past it stays inside the block.
            unsafe {
                block.as_ptr().cast::<BlockHeader>().write(BlockHeader { origin: index });
                Ok(NonNull::new_unchecked(block.as_ptr().add(HEADER_SIZE)))
            }
        } else {
            self.allocate_oversized(size)
        }
    }

    fn allocate_oversized(&self, size: usize) -> AllocResult<NonNull<u8>> {
        let total = OVERSIZED_PREFIX
            .checked_add(size)
            .ok_or(MemoryError::SizeOverflow)?;
        let layout =
            Layout::from_size_align(total, MAX_ALIGN).map_err(|_| MemoryError::SizeOverflow)?;

        // SAFETY: layout has non-zero size and valid alignment.
        let base = unsafe { self.upstream.allocate(layout)? }.cast::<u8>();
        let node = base.as_ptr().cast::<OversizedBlock>();
        let head = self.oversized_head.get();

        // SAFETY: base is a fresh allocation of at least OVERSIZED_PREFIX
        // bytes aligned to MAX_ALIGN, so the node write is in bounds; head
        // is either null or a live node on the list.
        unsafe {
            node.write(OversizedBlock {
                prev: ptr::null_mut(),
                next: head,
                layout,
                header: BlockHeader { origin: UNPOOLED },
            });
            if !head.is_null() {
                (*head).prev = node;
            }
        }
        self.oversized_head.set(node);
        self.oversized_blocks.set(self.oversized_blocks.get() + 1);
        self.oversized_allocations
            .set(self.oversized_allocations.get() + 1);
        self.oversized_bytes.set(self.oversized_bytes.get() + total);

        // SAFETY: the user region starts OVERSIZED_PREFIX bytes into the
        // allocation and is `size` bytes long.
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(OVERSIZED_PREFIX)) })
    }

    /// Returns one block.
    ///
    /// Pooled blocks go back onto their pool's free list; oversized blocks
    /// are unlinked and returned upstream immediately. The zero-size
    /// sentinel is accepted and ignored.
    ///
    /// # Safety
    /// - `ptr` must have been returned by [`allocate`](Self::allocate) on
    ///   this multipool
    /// - the block must not have been deallocated or released already
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        if ptr == zero_size_sentinel() {
            return;
        }

        // SAFETY: every non-sentinel pointer handed out sits HEADER_SIZE
        // bytes past its header.
        let header = unsafe { ptr.as_ptr().sub(HEADER_SIZE).cast::<BlockHeader>() };
        // SAFETY: the header is live until the block is freed.
        let origin = unsafe { (*header).origin };

        if origin == UNPOOLED {
            // SAFETY: oversized user pointers sit OVERSIZED_PREFIX bytes
            // past the node written in allocate_oversized.
            unsafe {
                let node = ptr.as_ptr().sub(OVERSIZED_PREFIX).cast::<OversizedBlock>();
                self.unlink_oversized(node);
                let layout = (*node).layout;
                self.oversized_blocks.set(self.oversized_blocks.get() - 1);
                self.oversized_bytes
                    .set(self.oversized_bytes.get() - layout.size());
                self.upstream
                    .deallocate(NonNull::new_unchecked(node.cast::<u8>()), layout);
            }
        } else {
            debug_assert!(origin < self.pools.len(), "corrupt block header");
            // SAFETY: `header` is the start of a block allocated from pool
            // `origin`.
            unsafe {
                self.pools[origin].deallocate(NonNull::new_unchecked(header.cast::<u8>()));
            }
        }
    }

    /// Removes `node` from the oversized list.
    ///
    /// # Safety
    /// `node` must be a live node currently on this multipool's list.
    unsafe fn unlink_oversized(&self, node: *mut OversizedBlock) {
        // SAFETY: caller guarantees node and its neighbors are live.
        unsafe {
            let prev = (*node).prev;
            let next = (*node).next;
            if prev.is_null() {
                self.oversized_head.set(next);
            } else {
                (*prev).next = next;
            }
            if !next.is_null() {
                (*next).prev = prev;
            }
        }
    }

    /// Returns all memory to the upstream allocator in one sweep.
    ///
    /// Every pooled chunk and every oversized block goes back upstream;
    /// all pointers handed out so far become invalid. The multipool itself
    /// stays usable and its growth schedules restart from their initial
    /// chunk sizes.
    pub fn release(&self) {
        for pool in &self.pools {
            pool.release_all();
        }

        let mut node = self.oversized_head.replace(ptr::null_mut());
        let mut freed = 0usize;
        while !node.is_null() {
            // SAFETY: the list only links live oversized nodes; each is
            // deallocated exactly once and `next` is read before the node
            // is returned upstream.
            unsafe {
                let next = (*node).next;
                let layout = (*node).layout;
                self.upstream
                    .deallocate(NonNull::new_unchecked(node.cast::<u8>()), layout);
                node = next;
            }
            freed += 1;
        }
        self.oversized_blocks.set(0);
        self.oversized_bytes.set(0);

        debug!(
            pools = self.pools.len(),
            oversized_freed = freed,
            "multipool released all memory"
        );
    }

    /// Pre-populates the pool serving `size`-byte requests with at least
    /// `additional` free blocks.
    ///
    /// # Errors
    /// Returns [`MemoryError::Unsupported`] for sizes beyond the largest
    /// pooled class, or the upstream's error if the reservation cannot be
    /// satisfied.
    pub fn reserve_capacity(&self, size: usize, additional: usize) -> AllocResult<()> {
        if size == 0 || additional == 0 {
            return Ok(());
        }
        if size > self.max_pooled_size {
            return Err(MemoryError::unsupported(
                "reserve_capacity only covers pooled sizes",
            ));
        }
        self.pools[self.pool_index(size)].reserve(additional)
    }

    /// Returns a snapshot of the multipool's statistics.
    pub fn stats(&self) -> MultipoolStats {
        MultipoolStats {
            pools: self.pools.iter().map(Pool::stats).collect(),
            oversized_blocks: self.oversized_blocks.get(),
            oversized_allocations: self.oversized_allocations.get(),
            oversized_bytes: self.oversized_bytes.get(),
        }
    }
}

// SAFETY: pooled and oversized paths both return pointers valid for
// layout.size() bytes at MAX_ALIGN alignment; alignments above MAX_ALIGN
// are rejected up front rather than served misaligned.
unsafe impl Allocator for Multipool<'_> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        validate_layout(layout)?;
        if layout.align() > MAX_ALIGN {
            return Err(MemoryError::invalid_alignment(layout.align(), MAX_ALIGN));
        }
        let ptr = Multipool::allocate(self, layout.size())?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        // SAFETY: trait contract matches the inherent deallocate contract;
        // the hidden header makes the layout redundant.
        unsafe { Multipool::deallocate(self, ptr) };
    }
}

impl MemoryUsage for Multipool<'_> {
    fn used_memory(&self) -> usize {
        self.pools.iter().map(|p| p.used_memory()).sum::<usize>() + self.oversized_bytes.get()
    }

    fn available_memory(&self) -> Option<usize> {
        self.pools.iter().map(|p| p.available_memory()).sum()
    }

    fn total_memory(&self) -> Option<usize> {
        let pooled: Option<usize> = self.pools.iter().map(|p| p.total_memory()).sum();
        Some(pooled? + self.oversized_bytes.get())
    }
}

impl fmt::Debug for Multipool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multipool")
            .field("num_pools", &self.pools.len())
            .field("max_pooled_size", &self.max_pooled_size)
            .field("oversized_blocks", &self.oversized_blocks.get())
            .finish()
    }
}

impl Drop for Multipool<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_index_matches_size_classes() {
        let mp = Multipool::new().unwrap();
        assert_eq!(mp.pool_index(1), 0);
        assert_eq!(mp.pool_index(8), 0);
        assert_eq!(mp.pool_index(9), 1);
        assert_eq!(mp.pool_index(16), 1);
        assert_eq!(mp.pool_index(17), 2);
        assert_eq!(mp.pool_index(4096), 9);
    }

    #[test]
    fn defaults_cover_8_to_4096() {
        let mp = Multipool::new().unwrap();
        assert_eq!(mp.num_pools(), 10);
        assert_eq!(mp.max_pooled_block_size(), 4096);
    }

    #[test]
    fn zero_size_round_trip() {
        let mp = Multipool::new().unwrap();
        let a = mp.allocate(0).unwrap();
        let b = mp.allocate(0).unwrap();
        assert_eq!(a, b);
        unsafe {
            mp.deallocate(a);
            mp.deallocate(b);
        }
        assert_eq!(mp.stats().outstanding_blocks(), 0);
    }

    #[test]
    fn pointers_are_max_aligned() {
        let mp = Multipool::new().unwrap();
        for size in [1, 8, 100, 4096, 5000] {
            let ptr = mp.allocate(size).unwrap();
            assert_eq!(ptr.as_ptr() as usize % MAX_ALIGN, 0, "size {size}");
            unsafe { mp.deallocate(ptr) };
        }
    }
}
