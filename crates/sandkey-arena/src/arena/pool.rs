//! Fixed-size pool for the sandbox profile.
//!
//! First-fit placement over a free list keyed by offset. Adjacent free regions
//! are merged on release so the free list never holds two neighbours.

use std::collections::BTreeMap;

use zeroize::Zeroize;

use super::{ALIGNMENT, Allocator, ArenaStats, Ptr, report_teardown};
use crate::{config::MIN_HEAP_SIZE, error::ArenaError};

#[derive(Debug, Clone, Copy)]
struct Block {
    /// Reserved bytes, a multiple of `ALIGNMENT`
    size: usize,
    /// Bytes the caller asked for (`requested <= size`)
    requested: usize,
    /// Generation the block was handed out with
    generation: u64,
}

pub(super) struct Pool {
    memory: Vec<u8>,
    /// Free regions: offset -> length
    free: BTreeMap<usize, usize>,
    /// Live blocks by offset
    live: BTreeMap<usize, Block>,
    in_use: usize,
    peak: usize,
    next_generation: u64,
}

impl Pool {
    pub(super) fn new(heap_size: usize) -> Result<Self, ArenaError> {
        if heap_size < MIN_HEAP_SIZE {
            return Err(ArenaError::HeapTooSmall { requested: heap_size, minimum: MIN_HEAP_SIZE });
        }
        let size = heap_size - heap_size % ALIGNMENT;

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(size)
            .map_err(|_| ArenaError::OutOfMemory { requested: size, available: 0 })?;
        memory.resize(size, 0);

        let mut free = BTreeMap::new();
        free.insert(0, size);

        Ok(Self { memory, free, live: BTreeMap::new(), in_use: 0, peak: 0, next_generation: 0 })
    }

    /// Block behind `ptr`, if `ptr` is the handle it was handed out with.
    fn live_block(&self, ptr: Ptr) -> Option<Block> {
        self.live.get(&ptr.slot).copied().filter(|block| block.generation == ptr.generation)
    }

    fn largest_free(&self) -> usize {
        self.free.values().copied().max().unwrap_or(0)
    }

    /// Return a region to the free list, merging with its neighbours.
    fn release(&mut self, offset: usize, len: usize) {
        let mut start = offset;
        let mut total = len;

        let previous = self.free.range(..offset).next_back().map(|(&o, &l)| (o, l));
        if let Some((prev_offset, prev_len)) = previous
            && prev_offset + prev_len == offset
        {
            self.free.remove(&prev_offset);
            start = prev_offset;
            total += prev_len;
        }

        if let Some(next_len) = self.free.remove(&(offset + len)) {
            total += next_len;
        }

        self.free.insert(start, total);
    }
}

/// Bytes reserved for a request: at least one aligned unit.
fn block_size(requested: usize) -> Result<usize, ArenaError> {
    requested
        .max(1)
        .checked_next_multiple_of(ALIGNMENT)
        .ok_or(ArenaError::OutOfMemory { requested, available: 0 })
}

impl Allocator for Pool {
    fn alloc(&mut self, requested: usize) -> Result<Ptr, ArenaError> {
        let size = block_size(requested)?;

        let fit = self.free.iter().find(|&(_, &len)| len >= size).map(|(&o, &l)| (o, l));
        let Some((offset, len)) = fit else {
            return Err(ArenaError::OutOfMemory { requested, available: self.largest_free() });
        };

        self.free.remove(&offset);
        if len > size {
            self.free.insert(offset + size, len - size);
        }
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.live.insert(offset, Block { size, requested, generation });

        self.in_use += size;
        self.peak = self.peak.max(self.in_use);

        Ok(Ptr { slot: offset, generation })
    }

    fn realloc(&mut self, ptr: Ptr, requested: usize) -> Result<Ptr, ArenaError> {
        let Some(block) = self.live_block(ptr) else {
            return Err(ArenaError::UnknownPointer);
        };
        let size = block_size(requested)?;
        let offset = ptr.slot;

        if size <= block.size {
            // Fits in the current reservation: shrink in place
            let kept = block.requested.min(size);
            if requested < kept {
                self.memory[offset + requested..offset + kept].zeroize();
            }

            let tail = block.size - size;
            if tail > 0 {
                self.memory[offset + size..offset + block.size].zeroize();
                self.in_use -= tail;
                self.release(offset + size, tail);
            }

            self.live.insert(offset, Block { size, requested, ..block });
            return Ok(ptr);
        }

        let moved = self.alloc(requested)?;
        let keep = block.requested.min(requested);
        self.memory.copy_within(offset..offset + keep, moved.slot);
        self.free(ptr);

        Ok(moved)
    }

    fn free(&mut self, ptr: Ptr) -> bool {
        let Some(block) = self.live_block(ptr) else {
            return false;
        };
        self.live.remove(&ptr.slot);

        self.memory[ptr.slot..ptr.slot + block.size].zeroize();
        self.in_use -= block.size;
        self.release(ptr.slot, block.size);
        true
    }

    fn block(&self, ptr: Ptr) -> Option<&[u8]> {
        let block = self.live_block(ptr)?;
        self.memory.get(ptr.slot..ptr.slot + block.requested)
    }

    fn block_mut(&mut self, ptr: Ptr) -> Option<&mut [u8]> {
        let block = self.live_block(ptr)?;
        self.memory.get_mut(ptr.slot..ptr.slot + block.requested)
    }

    fn stats(&self) -> ArenaStats {
        ArenaStats {
            heap_size: Some(self.memory.len()),
            in_use: self.in_use,
            peak: self.peak,
            live_allocations: self.live.len(),
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        report_teardown(&self.stats());
        self.memory.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_tiny_heap() {
        assert!(matches!(Pool::new(MIN_HEAP_SIZE - 1), Err(ArenaError::HeapTooSmall { .. })));
    }

    #[test]
    fn heap_size_rounds_down_to_alignment() {
        let pool = Pool::new(MIN_HEAP_SIZE + 5).unwrap();
        assert_eq!(pool.stats().heap_size, Some(MIN_HEAP_SIZE));
    }

    #[test]
    fn blocks_are_aligned_and_disjoint() {
        let mut pool = Pool::new(256).unwrap();

        let a = pool.alloc(3).unwrap();
        let b = pool.alloc(9).unwrap();
        let c = pool.alloc(0).unwrap();

        assert_eq!(a.slot % ALIGNMENT, 0);
        assert_eq!(b.slot % ALIGNMENT, 0);
        assert_eq!(c.slot % ALIGNMENT, 0);
        assert_eq!(b.slot, a.slot + 8);
        assert_eq!(c.slot, b.slot + 16);
        assert_eq!(pool.stats().in_use, 32);
    }

    #[test]
    fn out_of_memory_reports_largest_free_block() {
        let mut pool = Pool::new(64).unwrap();
        let _a = pool.alloc(40).unwrap();

        let err = pool.alloc(32).unwrap_err();
        assert_eq!(err, ArenaError::OutOfMemory { requested: 32, available: 24 });
    }

    #[test]
    fn freed_neighbours_coalesce() {
        let mut pool = Pool::new(64).unwrap();
        let a = pool.alloc(16).unwrap();
        let b = pool.alloc(16).unwrap();
        let c = pool.alloc(32).unwrap();

        assert!(pool.free(a));
        assert!(pool.free(c));
        assert!(pool.free(b));

        assert_eq!(pool.free.len(), 1);
        assert_eq!(pool.largest_free(), 64);
        assert!(pool.alloc(64).is_ok());
    }

    #[test]
    fn free_zeroes_memory_before_reuse() {
        let mut pool = Pool::new(64).unwrap();
        let a = pool.alloc(16).unwrap();
        pool.block_mut(a).unwrap().fill(0x5A);
        pool.free(a);

        let b = pool.alloc(16).unwrap();
        assert_eq!(a.slot, b.slot);
        assert!(pool.block(b).unwrap().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn reused_offset_gets_new_generation() {
        let mut pool = Pool::new(64).unwrap();
        let stale = pool.alloc(16).unwrap();
        assert!(pool.free(stale));
        let live = pool.alloc(16).unwrap();

        assert_eq!(stale.slot, live.slot);
        assert_ne!(stale, live);
        assert!(!pool.free(stale));
        assert!(pool.block(stale).is_none());
        assert!(pool.block(live).is_some());
        assert_eq!(pool.stats().live_allocations, 1);
    }

    #[test]
    fn shrink_stays_in_place_and_releases_tail() {
        let mut pool = Pool::new(128).unwrap();
        let a = pool.alloc(64).unwrap();
        pool.block_mut(a).unwrap().copy_from_slice(&[7u8; 64]);

        let shrunk = pool.realloc(a, 10).unwrap();
        assert_eq!(shrunk, a);
        assert_eq!(pool.block(a).unwrap(), &[7u8; 10]);
        assert_eq!(pool.stats().in_use, 16);
        assert_eq!(pool.largest_free(), 112);
    }

    #[test]
    fn grow_moves_and_preserves_content() {
        let mut pool = Pool::new(128).unwrap();
        let a = pool.alloc(8).unwrap();
        let _fence = pool.alloc(8).unwrap();
        pool.block_mut(a).unwrap().copy_from_slice(b"abcdefgh");

        let grown = pool.realloc(a, 32).unwrap();
        assert_ne!(grown, a);

        let bytes = pool.block(grown).unwrap();
        assert_eq!(&bytes[..8], b"abcdefgh");
        assert!(bytes[8..].iter().all(|&byte| byte == 0));
        assert!(pool.block(a).is_none());
    }

    #[test]
    fn failed_grow_keeps_original_block() {
        let mut pool = Pool::new(64).unwrap();
        let a = pool.alloc(32).unwrap();
        pool.block_mut(a).unwrap().fill(1);

        assert!(matches!(pool.realloc(a, 48), Err(ArenaError::OutOfMemory { .. })));
        assert_eq!(pool.block(a).unwrap(), &[1u8; 32]);
    }
}
