//! Memory allocation error types.
//!
//! A single [`MemoryError`] enum covers every failure the allocators in this
//! crate can report: upstream out-of-memory, layout validation failures, and
//! rejected configurations. Misuse of `deallocate` (foreign pointers, double
//! frees) is undefined behavior behind `unsafe` and is deliberately not
//! represented here; the zero-overhead contract leaves it to `debug_assert!`
//! guards in debug builds.

use core::alloc::Layout;

/// Result type for allocation operations.
pub type AllocResult<T> = Result<T, MemoryError>;

/// Error raised by the allocators in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The upstream allocator could not satisfy a request.
    ///
    /// Never masked or retried internally; propagates synchronously to the
    /// caller of `allocate`, leaving the pool state unchanged so a retried
    /// allocation can still succeed once memory is available again.
    #[error("out of memory: failed to allocate {size} bytes (alignment {align})")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// A size calculation overflowed `usize` (or exceeded `isize::MAX`).
    #[error("allocation size calculation overflowed")]
    SizeOverflow,

    /// The requested alignment is not a power of two, or exceeds the maximum
    /// alignment this allocator serves.
    #[error("invalid alignment {align}: must be a power of two not exceeding {max}")]
    InvalidAlignment {
        /// Requested alignment.
        align: usize,
        /// Largest alignment the allocator can guarantee.
        max: usize,
    },

    /// A construction-time parameter was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human-readable rejection reason.
        reason: &'static str,
    },

    /// The request is valid in general but not supported by this allocator.
    #[error("unsupported request: {reason}")]
    Unsupported {
        /// Human-readable reason.
        reason: &'static str,
    },
}

impl MemoryError {
    /// Creates an out-of-memory error for the given layout.
    pub const fn out_of_memory(layout: Layout) -> Self {
        MemoryError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Creates an invalid-alignment error.
    pub const fn invalid_alignment(align: usize, max: usize) -> Self {
        MemoryError::InvalidAlignment { align, max }
    }

    /// Creates a configuration error.
    pub const fn invalid_config(reason: &'static str) -> Self {
        MemoryError::InvalidConfig { reason }
    }

    /// Creates an unsupported-request error.
    pub const fn unsupported(reason: &'static str) -> Self {
        MemoryError::Unsupported { reason }
    }

    /// Checks whether this is an out-of-memory error.
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self, MemoryError::OutOfMemory { .. })
    }

    /// Checks whether this is a size overflow error.
    pub const fn is_size_overflow(&self) -> bool {
        matches!(self, MemoryError::SizeOverflow)
    }

    /// Checks whether this is an invalid-alignment error.
    pub const fn is_invalid_alignment(&self) -> bool {
        matches!(self, MemoryError::InvalidAlignment { .. })
    }

    /// Checks whether this is a configuration error.
    pub const fn is_invalid_config(&self) -> bool {
        matches!(self, MemoryError::InvalidConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_and_predicates() {
        let layout = Layout::new::<u64>();
        let oom = MemoryError::out_of_memory(layout);
        assert!(oom.is_out_of_memory());
        assert_eq!(oom, MemoryError::OutOfMemory { size: 8, align: 8 });

        let cfg = MemoryError::invalid_config("zero pools");
        assert!(cfg.is_invalid_config());
        assert!(!cfg.is_out_of_memory());

        assert!(MemoryError::SizeOverflow.is_size_overflow());
        assert!(MemoryError::invalid_alignment(3, 16).is_invalid_alignment());
    }

    #[test]
    fn display_mentions_sizes() {
        let msg = MemoryError::OutOfMemory { size: 64, align: 16 }.to_string();
        assert!(msg.contains("64"));
        assert!(msg.contains("16"));
    }
}
