//! System allocator backing for the host profile.

use std::collections::HashMap;

use zeroize::Zeroize;

use super::{Allocator, ArenaStats, Ptr, report_teardown};
use crate::error::ArenaError;

/// One heap vector per allocation, addressed by a monotonically increasing id.
pub(super) struct SystemHeap {
    blocks: HashMap<usize, Vec<u8>>,
    next_id: usize,
    in_use: usize,
    peak: usize,
}

impl SystemHeap {
    pub(super) fn new() -> Self {
        Self { blocks: HashMap::new(), next_id: 0, in_use: 0, peak: 0 }
    }
}

/// Zero-filled vector of `len` bytes, reporting allocation failure.
fn zeroed(len: usize) -> Result<Vec<u8>, ArenaError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| ArenaError::OutOfMemory { requested: len, available: 0 })?;
    bytes.resize(len, 0);
    Ok(bytes)
}

impl Allocator for SystemHeap {
    fn alloc(&mut self, size: usize) -> Result<Ptr, ArenaError> {
        let bytes = zeroed(size)?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.blocks.insert(id, bytes);
        self.in_use += size;
        self.peak = self.peak.max(self.in_use);
        Ok(Ptr { slot: id, generation: 0 })
    }

    fn realloc(&mut self, ptr: Ptr, size: usize) -> Result<Ptr, ArenaError> {
        let Some(bytes) = self.blocks.get_mut(&ptr.slot) else {
            return Err(ArenaError::UnknownPointer);
        };
        let old = bytes.len();

        if size > old {
            let mut grown = zeroed(size)?;
            grown[..old].copy_from_slice(&bytes[..]);
            bytes.zeroize();
            *bytes = grown;
            self.in_use += size - old;
            self.peak = self.peak.max(self.in_use);
        } else {
            bytes[size..].zeroize();
            bytes.truncate(size);
            self.in_use -= old - size;
        }

        Ok(ptr)
    }

    fn free(&mut self, ptr: Ptr) -> bool {
        let Some(mut bytes) = self.blocks.remove(&ptr.slot) else {
            return false;
        };
        self.in_use -= bytes.len();
        bytes.zeroize();
        true
    }

    fn block(&self, ptr: Ptr) -> Option<&[u8]> {
        self.blocks.get(&ptr.slot).map(Vec::as_slice)
    }

    fn block_mut(&mut self, ptr: Ptr) -> Option<&mut [u8]> {
        self.blocks.get_mut(&ptr.slot).map(Vec::as_mut_slice)
    }

    fn stats(&self) -> ArenaStats {
        ArenaStats {
            heap_size: None,
            in_use: self.in_use,
            peak: self.peak,
            live_allocations: self.blocks.len(),
        }
    }
}

impl Drop for SystemHeap {
    fn drop(&mut self) {
        report_teardown(&self.stats());
        for bytes in self.blocks.values_mut() {
            bytes.zeroize();
        }
    }
}
