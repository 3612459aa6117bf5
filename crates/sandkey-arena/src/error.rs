//! Error types for arena allocation and byte buffers

use thiserror::Error;

/// Errors from arena operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The pool has no free region large enough for the request
    #[error("out of memory: requested {requested} bytes, largest free block is {available}")]
    OutOfMemory {
        /// Bytes requested by the caller
        requested: usize,
        /// Largest contiguous free region at the time of the request
        available: usize,
    },

    /// The configured heap cannot hold a single block
    #[error("heap size {requested} is below the minimum of {minimum} bytes")]
    HeapTooSmall {
        /// Heap size from the memory profile
        requested: usize,
        /// Smallest accepted heap size
        minimum: usize,
    },

    /// The handle does not name a live allocation
    #[error("pointer does not refer to a live allocation")]
    UnknownPointer,
}

/// Errors from converting or allocating byte buffers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OctetError {
    /// A script value that cannot be read as bytes
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Accepted value kinds
        expected: &'static str,
        /// Kind of the value that was passed
        found: &'static str,
    },

    /// Backing storage could not be allocated
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl OctetError {
    /// Returns true if this error means the arena is exhausted.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::Arena(ArenaError::OutOfMemory { .. }))
    }
}
