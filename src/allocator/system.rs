//! System allocator backed by the platform's `malloc`/`free`.
//!
//! [`SystemAllocator`] adapts [`std::alloc::System`] to this crate's
//! [`Allocator`] trait. It is the default upstream for every pooled
//! allocator and the baseline every benchmark compares against.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc::{GlobalAlloc, System};

use crate::allocator::traits::{Allocator, ThreadSafeAllocator};
use crate::error::{AllocResult, MemoryError};

/// Allocator that delegates to the operating system.
///
/// Zero-sized; carries no state of its own. Zero-size requests are served
/// with a dangling, well-aligned pointer and never touch the system heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new system allocator.
    pub const fn new() -> Self {
        SystemAllocator
    }
}

// SAFETY: delegates to std::alloc::System, which satisfies every Allocator
// contract; zero-size requests are handled with dangling pointers that are
// never passed to the system heap.
unsafe impl Allocator for SystemAllocator {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            // Dangling but aligned; matched by the zero-size branch in
            // deallocate below.
            let dangling = layout.align() as *mut u8;
            // SAFETY: alignments are non-zero, so the pointer is non-null.
            let ptr = unsafe { NonNull::new_unchecked(dangling) };
            return Ok(NonNull::slice_from_raw_parts(ptr, 0));
        }

        // SAFETY: layout has non-zero size, as required by GlobalAlloc.
        let raw = unsafe { System.alloc(layout) };
        match NonNull::new(raw) {
            Some(ptr) => Ok(NonNull::slice_from_raw_parts(ptr, layout.size())),
            None => Err(MemoryError::out_of_memory(layout)),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: caller guarantees `ptr` came from `allocate` with this
        // layout, and the zero-size case never reaches the system heap.
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }
}

// SAFETY: the system allocator is stateless and the platform heap is
// inherently thread-safe.
unsafe impl ThreadSafeAllocator for SystemAllocator {}

static SYSTEM: SystemAllocator = SystemAllocator::new();

/// Returns a reference to the process-wide system allocator.
///
/// This is the upstream used by [`Multipool::new`](crate::allocator::Multipool::new)
/// and friends when no explicit upstream is supplied.
pub fn default_allocator() -> &'static SystemAllocator {
    &SYSTEM
}
