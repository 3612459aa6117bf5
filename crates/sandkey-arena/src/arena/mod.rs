//! Arena allocator backing every script object and byte buffer.
//!
//! An [`Arena`] is a cheap, clonable handle to one heap. Each execution
//! context creates its own arena and threads the handle through every
//! allocation; nothing here is process-global. The handle is `!Send`, so an
//! arena cannot leak across concurrently running sandboxes.
//!
//! Two allocators implement the same contract:
//!
//! - [`MemoryProfile::Sandbox`]: a fixed pool with first-fit placement, 8-byte
//!   aligned blocks and coalescing of adjacent free regions
//! - [`MemoryProfile::Host`]: the system allocator, one vector per block
//!
//! # Invariants
//!
//! - Live allocations never overlap
//! - Freeing an unknown or already-freed handle is a no-op
//! - Growing an allocation preserves `min(old, new)` bytes of content; a grow
//!   that fails leaves the original block untouched
//! - Freed memory is zeroed before it can be handed out again

mod pool;
mod system;

use std::{cell::RefCell, fmt, rc::Rc};

use tracing::{debug, trace, warn};

use self::{pool::Pool, system::SystemHeap};
use crate::{config::MemoryProfile, error::ArenaError};

/// Alignment of every block in a sandbox pool.
pub const ALIGNMENT: usize = 8;

/// Opaque handle to a live allocation.
///
/// Handles are only meaningful for the arena that produced them. A handle
/// stays dead once freed, even after its storage is handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptr {
    /// Pool offset, or block id on the system heap
    pub(crate) slot: usize,
    /// Distinguishes successive blocks placed at the same slot
    pub(crate) generation: u64,
}

/// Usage snapshot of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Pool size, `None` for the host profile
    pub heap_size: Option<usize>,
    /// Bytes currently reserved by live allocations (including alignment)
    pub in_use: usize,
    /// Highest value `in_use` has reached
    pub peak: usize,
    /// Number of live allocations
    pub live_allocations: usize,
}

/// Allocation contract shared by the sandbox pool and the system heap.
trait Allocator {
    fn alloc(&mut self, size: usize) -> Result<Ptr, ArenaError>;

    fn realloc(&mut self, ptr: Ptr, size: usize) -> Result<Ptr, ArenaError>;

    /// Releases a block. Returns false if `ptr` was not live.
    fn free(&mut self, ptr: Ptr) -> bool;

    /// Bytes of a live block, sized as last requested.
    fn block(&self, ptr: Ptr) -> Option<&[u8]>;

    fn block_mut(&mut self, ptr: Ptr) -> Option<&mut [u8]>;

    fn stats(&self) -> ArenaStats;
}

/// Handle to one execution context's heap.
///
/// Cloning the handle shares the heap; the heap is torn down when the last
/// handle (including those held by live [`crate::Octet`]s) is dropped.
#[derive(Clone)]
pub struct Arena {
    heap: Rc<RefCell<Box<dyn Allocator>>>,
}

impl Arena {
    /// Create the heap for a new execution context.
    pub fn init(profile: MemoryProfile) -> Result<Self, ArenaError> {
        let heap: Box<dyn Allocator> = match profile {
            MemoryProfile::Sandbox { heap_size } => Box::new(Pool::new(heap_size)?),
            MemoryProfile::Host => Box::new(SystemHeap::new()),
        };
        debug!(?profile, "arena initialised");
        Ok(Self { heap: Rc::new(RefCell::new(heap)) })
    }

    /// Bounded arena of `heap_size` bytes.
    pub fn sandbox(heap_size: usize) -> Result<Self, ArenaError> {
        Self::init(MemoryProfile::Sandbox { heap_size })
    }

    /// Unbounded arena on the system allocator.
    pub fn host() -> Self {
        debug!("arena initialised on system allocator");
        let heap: Box<dyn Allocator> = Box::new(SystemHeap::new());
        Self { heap: Rc::new(RefCell::new(heap)) }
    }

    /// Allocate `size` zeroed bytes.
    pub fn alloc(&self, size: usize) -> Result<Ptr, ArenaError> {
        let ptr = self.heap.borrow_mut().alloc(size)?;
        trace!(?ptr, size, "alloc");
        Ok(ptr)
    }

    /// Resize a live allocation, possibly moving it.
    ///
    /// On failure the original allocation is still live and unchanged.
    pub fn realloc(&self, ptr: Ptr, size: usize) -> Result<Ptr, ArenaError> {
        let moved = self.heap.borrow_mut().realloc(ptr, size)?;
        trace!(from = ?ptr, to = ?moved, size, "realloc");
        Ok(moved)
    }

    /// Release an allocation. Unknown and already-freed handles are ignored.
    pub fn free(&self, ptr: Ptr) {
        if self.heap.borrow_mut().free(ptr) {
            trace!(?ptr, "free");
        }
    }

    /// Allocator entry point in the embedded interpreter's convention.
    ///
    /// `None` plays the role of the null pointer:
    ///
    /// - `(None, _, 0)`: nothing to do, returns `None`
    /// - `(None, _, n)`: allocate `n` bytes
    /// - `(Some(p), _, 0)`: free `p`, returns `None`
    /// - `(Some(p), old, n)`: resize `p` from `old` to `n` bytes
    ///
    /// Shrinking never fails. When `ptr` is `None` the interpreter uses
    /// `old_size` to tag the kind of object being created; it is ignored.
    pub fn manage(
        &self,
        ptr: Option<Ptr>,
        old_size: usize,
        new_size: usize,
    ) -> Result<Option<Ptr>, ArenaError> {
        match (ptr, new_size) {
            (None, 0) => Ok(None),
            (None, size) => self.alloc(size).map(Some),
            (Some(ptr), 0) => {
                self.free(ptr);
                Ok(None)
            },
            (Some(ptr), size) => {
                debug_assert!(
                    self.size_of(ptr).is_none_or(|current| current == old_size),
                    "interpreter and arena disagree on block size"
                );
                self.realloc(ptr, size).map(Some)
            },
        }
    }

    /// Size last requested for a live allocation.
    pub fn size_of(&self, ptr: Ptr) -> Option<usize> {
        self.heap.borrow().block(ptr).map(<[u8]>::len)
    }

    /// Run `f` over the bytes of an allocation.
    ///
    /// An unknown handle yields an empty slice.
    ///
    /// # Panics
    ///
    /// Panics if `f` allocates from, or writes to, this same arena.
    pub fn with_block<R>(&self, ptr: Ptr, f: impl FnOnce(&[u8]) -> R) -> R {
        let heap = self.heap.borrow();
        f(heap.block(ptr).unwrap_or_default())
    }

    /// Run `f` over the mutable bytes of an allocation.
    ///
    /// An unknown handle yields an empty slice.
    ///
    /// # Panics
    ///
    /// Panics if `f` touches this same arena.
    pub fn with_block_mut<R>(&self, ptr: Ptr, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut heap = self.heap.borrow_mut();
        f(heap.block_mut(ptr).unwrap_or_default())
    }

    /// Current usage.
    pub fn stats(&self) -> ArenaStats {
        self.heap.borrow().stats()
    }

    /// True for sandbox arenas, false for the host profile.
    pub fn is_bounded(&self) -> bool {
        self.stats().heap_size.is_some()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.heap.try_borrow() {
            Ok(heap) => f.debug_struct("Arena").field("stats", &heap.stats()).finish(),
            Err(_) => f.debug_struct("Arena").finish_non_exhaustive(),
        }
    }
}

/// Logs the final state of a heap being torn down.
fn report_teardown(stats: &ArenaStats) {
    if stats.live_allocations > 0 {
        warn!(
            live = stats.live_allocations,
            in_use = stats.in_use,
            "arena torn down with live allocations"
        );
    }
    debug!(peak = stats.peak, heap_size = ?stats.heap_size, "arena torn down");
}
