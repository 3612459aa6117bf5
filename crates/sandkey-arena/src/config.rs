//! Memory profiles for execution contexts.
//!
//! A constrained sandbox gets a fixed pool that scripts cannot grow; a trusted
//! host uses the system allocator with the same interface and no bound.

/// Pool size used when no explicit size is configured (1 MiB).
pub const DEFAULT_HEAP_SIZE: usize = 1 << 20;

/// Smallest pool accepted by [`crate::Arena::init`].
pub const MIN_HEAP_SIZE: usize = 64;

/// Deployment profile selecting the allocator behind an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryProfile {
    /// Fixed pool of `heap_size` bytes, failing with out-of-memory when full
    Sandbox {
        /// Total pool size in bytes, rounded down to the block alignment
        heap_size: usize,
    },
    /// System allocator, unbounded
    Host,
}

impl MemoryProfile {
    /// Sandbox profile with the given pool size.
    pub fn sandbox(heap_size: usize) -> Self {
        Self::Sandbox { heap_size }
    }

    /// Pool size, or `None` for the unbounded host profile.
    pub fn heap_size(&self) -> Option<usize> {
        match self {
            Self::Sandbox { heap_size } => Some(*heap_size),
            Self::Host => None,
        }
    }
}

impl Default for MemoryProfile {
    fn default() -> Self {
        Self::Sandbox { heap_size: DEFAULT_HEAP_SIZE }
    }
}
