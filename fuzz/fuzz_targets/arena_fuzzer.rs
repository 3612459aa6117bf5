//! Fuzz target for the sandbox pool allocator
//!
//! # Strategy
//!
//! - Interpreter protocol: drive the arena only through `manage`, the way the
//!   embedded interpreter does
//! - Sizes: zero, tiny, and larger than the whole pool
//! - Handles: freed handles are kept around and freed again after their
//!   storage has been handed out anew
//!
//! # Invariants
//!
//! - Reserved bytes never exceed the pool size
//! - A failed resize leaves the original block intact
//! - Freeing a stale handle never releases a live block
//! - Once everything is freed the whole pool is allocatable again

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sandkey_arena::Arena;

const HEAP_SIZE: usize = 4096;

#[derive(Debug, Arbitrary)]
enum ArenaOp {
    Alloc { size: u16 },
    Resize { slot: u8, size: u16 },
    Free { slot: u8 },
    StaleFree { slot: u8 },
    Write { slot: u8, byte: u8 },
}

fuzz_target!(|ops: Vec<ArenaOp>| {
    let Ok(arena) = Arena::sandbox(HEAP_SIZE) else {
        return;
    };
    let mut live = Vec::new();
    let mut freed = Vec::new();

    for op in ops {
        match op {
            ArenaOp::Alloc { size } => {
                if let Ok(Some(ptr)) = arena.manage(None, 0, usize::from(size)) {
                    live.push((ptr, usize::from(size)));
                }
            },
            ArenaOp::Resize { slot, size } => {
                if live.is_empty() {
                    continue;
                }
                let index = usize::from(slot) % live.len();
                let (ptr, old) = live[index];
                let before = arena.with_block(ptr, <[u8]>::to_vec);

                match arena.manage(Some(ptr), old, usize::from(size)) {
                    Ok(Some(moved)) => {
                        let kept = old.min(usize::from(size));
                        let after = arena.with_block(moved, <[u8]>::to_vec);
                        assert_eq!(after[..kept], before[..kept], "resize lost contents");
                        live[index] = (moved, usize::from(size));
                        if moved != ptr {
                            freed.push(ptr);
                        }
                    },
                    Ok(None) => {
                        live.swap_remove(index);
                        freed.push(ptr);
                    },
                    Err(_) => {
                        let after = arena.with_block(ptr, <[u8]>::to_vec);
                        assert_eq!(after, before, "failed resize modified block");
                    },
                }
            },
            ArenaOp::Free { slot } => {
                if live.is_empty() {
                    continue;
                }
                let (ptr, old) = live.swap_remove(usize::from(slot) % live.len());
                assert!(matches!(arena.manage(Some(ptr), old, 0), Ok(None)));
                freed.push(ptr);
            },
            ArenaOp::StaleFree { slot } => {
                if freed.is_empty() {
                    continue;
                }
                let ptr = freed[usize::from(slot) % freed.len()];
                let snapshot: Vec<_> =
                    live.iter().map(|&(p, _)| arena.with_block(p, <[u8]>::to_vec)).collect();

                assert!(matches!(arena.manage(Some(ptr), 0, 0), Ok(None)));
                for (&(p, _), before) in live.iter().zip(&snapshot) {
                    let after = arena.with_block(p, <[u8]>::to_vec);
                    assert_eq!(&after, before, "stale free hit a live block");
                }
            },
            ArenaOp::Write { slot, byte } => {
                if live.is_empty() {
                    continue;
                }
                let (ptr, _) = live[usize::from(slot) % live.len()];
                arena.with_block_mut(ptr, |block| block.fill(byte));
            },
        }

        let stats = arena.stats();
        assert!(stats.in_use <= HEAP_SIZE, "pool over-committed: {stats:?}");
        assert_eq!(stats.live_allocations, live.len());
    }

    for (ptr, _) in live.drain(..) {
        arena.free(ptr);
    }
    assert_eq!(arena.stats().in_use, 0);
    assert!(arena.alloc(HEAP_SIZE).is_ok(), "pool fragmented after full release");
});
