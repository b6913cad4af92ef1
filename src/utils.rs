//! Alignment helpers shared by the allocators in this crate.

/// Maximum fundamental alignment served by the pooled allocators.
///
/// Every address handed out by a [`Pool`](crate::allocator::Pool) or a
/// [`Multipool`](crate::allocator::Multipool) is aligned to this value, so
/// any object with a fundamental alignment requirement fits without the
/// caller specifying one.
pub const MAX_ALIGN: usize = 16;

/// Zero-sized type carrying the maximum fundamental alignment.
///
/// `NonNull::<MaxAligned>::dangling()` yields a well-known, maximally aligned
/// non-null address that can never collide with a real allocation; the
/// multipool uses it as the zero-size sentinel.
#[repr(align(16))]
pub(crate) struct MaxAligned;

/// Aligns a value up to the nearest multiple of `alignment`.
///
/// # Examples
/// ```
/// use multipool::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Aligns a value down to the nearest multiple of `alignment`.
#[inline(always)]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Checks if a value is aligned to the given alignment.
///
/// # Examples
/// ```
/// use multipool::utils::is_aligned;
///
/// assert!(is_aligned(16, 8));
/// assert!(!is_aligned(17, 8));
/// ```
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Checks if a pointer is aligned to the given alignment.
#[inline(always)]
pub fn is_aligned_ptr<T>(ptr: *const T, alignment: usize) -> bool {
    is_aligned(ptr as usize, alignment)
}
