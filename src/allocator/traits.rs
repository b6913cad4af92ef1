//! Allocator capability traits.
//!
//! The pooled allocators in this crate both consume and provide the same
//! minimal capability: [`Allocator`], an object-safe pair of
//! `allocate`/`deallocate` operations over raw [`Layout`]s. A
//! [`Multipool`](crate::allocator::Multipool) depends on `&dyn Allocator`
//! for its upstream, so any conforming allocator — the system allocator, a
//! tracked wrapper, another multipool — can be substituted.
//!
//! # Safety
//!
//! All unsafe traits in this module impose strict contracts on implementors:
//! - **Allocator**: returned pointers must be valid, aligned, and exclusive
//!   until deallocated
//! - **ThreadSafeAllocator**: all operations must be safe across threads
//!
//! Blanket impls for `&T` are safe because they forward every call to the
//! underlying `T: Allocator`, preserving its contracts through delegation.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{AllocResult, MemoryError};

/// Validation of layout parameters.
///
/// Catches the two layout-level errors — non-power-of-two alignment and
/// size overflow — before they reach an implementation.
#[inline]
pub(crate) fn validate_layout(layout: Layout) -> AllocResult<()> {
    if !layout.align().is_power_of_two() {
        return Err(MemoryError::invalid_alignment(layout.align(), usize::MAX));
    }
    if layout.size() > isize::MAX as usize - (layout.align() - 1) {
        return Err(MemoryError::SizeOverflow);
    }
    Ok(())
}

/// Minimal memory allocation capability.
///
/// # Safety Requirements
///
/// Implementors must ensure that:
/// - returned pointers are valid for reads and writes of `layout.size()`
///   bytes and aligned to `layout.align()`
/// - a returned block remains valid and exclusive until it is deallocated
/// - `deallocate` accepts exactly the pointers this allocator produced, with
///   the layout they were produced for
pub unsafe trait Allocator {
    /// Allocates memory with the given layout.
    ///
    /// # Safety
    /// The returned memory is uninitialized and must be initialized before
    /// use. The caller must not use the pointer after deallocation.
    ///
    /// # Errors
    /// Returns an error if memory cannot be allocated or the layout is
    /// invalid.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout.
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator
    /// - `layout` must match the original allocation layout exactly
    /// - after this call `ptr` becomes invalid; double-free is undefined
    ///   behavior
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

// SAFETY: forwards all calls to the underlying `T: Allocator`; no new unsafe
// operations are introduced and all contracts are preserved by delegation.
unsafe impl<T: Allocator + ?Sized> Allocator for &T {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: same contract as T::allocate; `**self` dereference of a
        // shared reference is always valid.
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: same contract as T::deallocate.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// Marker for allocators that can be shared between threads.
///
/// # Safety
/// Implementors must ensure concurrent `allocate`/`deallocate` calls from
/// different threads are safe, with internal state properly synchronized.
pub unsafe trait ThreadSafeAllocator: Allocator + Send + Sync {}

/// Memory tracking capabilities.
pub trait MemoryUsage {
    /// Bytes currently handed out to clients.
    fn used_memory(&self) -> usize;

    /// Bytes available without another upstream request, if known.
    fn available_memory(&self) -> Option<usize> {
        None
    }

    /// Total bytes owned, if known.
    fn total_memory(&self) -> Option<usize> {
        None
    }
}

impl<T: MemoryUsage + ?Sized> MemoryUsage for &T {
    fn used_memory(&self) -> usize {
        (**self).used_memory()
    }

    fn available_memory(&self) -> Option<usize> {
        (**self).available_memory()
    }

    fn total_memory(&self) -> Option<usize> {
        (**self).total_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_layout_accepts_ordinary_layouts() {
        assert!(validate_layout(Layout::new::<u64>()).is_ok());
        assert!(validate_layout(Layout::from_size_align(0, 1).unwrap()).is_ok());
    }

    #[test]
    fn allocator_trait_is_object_safe() {
        fn _takes_dyn(_a: &dyn Allocator) {}
    }
}
