//! Property-based tests for the arena allocator
//!
//! Random alloc/realloc/free sequences are replayed against a sandbox pool
//! and a host heap. Each live block is stamped with its own byte pattern, so
//! any overlap between live allocations shows up as a corrupted stamp.
//!
//! 1. **Disjointness**: live blocks never share bytes
//! 2. **Preservation**: realloc keeps `min(old, new)` bytes
//! 3. **Accounting**: stats match the set of live blocks
//! 4. **Recovery**: freeing everything restores one contiguous pool

use proptest::prelude::*;
use sandkey_arena::{ALIGNMENT, Arena, ArenaError, Ptr};

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Realloc(usize, usize),
    Free(usize),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..300).prop_map(Op::Alloc),
        2 => (any::<usize>(), 0usize..300).prop_map(|(i, n)| Op::Realloc(i, n)),
        3 => any::<usize>().prop_map(Op::Free),
    ]
}

struct Live {
    ptr: Ptr,
    size: usize,
    stamp: u8,
}

fn stamp(arena: &Arena, live: &Live) {
    arena.with_block_mut(live.ptr, |bytes| bytes.fill(live.stamp));
}

fn check_stamp(arena: &Arena, live: &Live) -> bool {
    arena.with_block(live.ptr, |bytes| {
        bytes.len() == live.size && bytes.iter().all(|&b| b == live.stamp)
    })
}

fn reserved(size: usize) -> usize {
    size.max(1).next_multiple_of(ALIGNMENT)
}

/// Replays `ops`, checking every invariant after each step.
fn replay(arena: &Arena, ops: &[Op]) -> Result<Vec<Live>, TestCaseError> {
    let mut live: Vec<Live> = Vec::new();
    let mut next_stamp = 1u8;

    for op in ops {
        match *op {
            Op::Alloc(size) => match arena.alloc(size) {
                Ok(ptr) => {
                    let block = Live { ptr, size, stamp: next_stamp };
                    next_stamp = next_stamp.wrapping_add(1).max(1);
                    stamp(arena, &block);
                    live.push(block);
                },
                Err(ArenaError::OutOfMemory { requested, .. }) => {
                    prop_assert_eq!(requested, size);
                },
                Err(other) => return Err(TestCaseError::fail(format!("{other}"))),
            },
            Op::Realloc(index, size) if !live.is_empty() => {
                let index = index % live.len();
                let old = live[index].size;
                match arena.realloc(live[index].ptr, size) {
                    Ok(ptr) => {
                        let keep = old.min(size);
                        let intact = arena.with_block(ptr, |bytes| {
                            bytes.len() == size
                                && bytes[..keep].iter().all(|&b| b == live[index].stamp)
                        });
                        prop_assert!(intact, "realloc lost content");
                        live[index].ptr = ptr;
                        live[index].size = size;
                        stamp(arena, &live[index]);
                    },
                    Err(ArenaError::OutOfMemory { .. }) => {
                        prop_assert!(check_stamp(arena, &live[index]), "failed grow touched block");
                    },
                    Err(other) => return Err(TestCaseError::fail(format!("{other}"))),
                }
            },
            Op::Free(index) if !live.is_empty() => {
                let block = live.swap_remove(index % live.len());
                arena.free(block.ptr);
                arena.free(block.ptr);
            },
            Op::Realloc(..) | Op::Free(_) => {},
        }

        for block in &live {
            prop_assert!(check_stamp(arena, block), "live block corrupted");
        }
        let stats = arena.stats();
        prop_assert_eq!(stats.live_allocations, live.len());
        prop_assert!(stats.peak >= stats.in_use);
    }

    Ok(live)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_sandbox_blocks_stay_disjoint(ops in prop::collection::vec(arbitrary_op(), 1..80)) {
        let arena = Arena::sandbox(2048).unwrap();
        let live = replay(&arena, &ops)?;

        let expected: usize = live.iter().map(|block| reserved(block.size)).sum();
        prop_assert_eq!(arena.stats().in_use, expected);

        for block in live {
            arena.free(block.ptr);
        }
        prop_assert_eq!(arena.stats().in_use, 0);

        // All free regions must have merged back into one
        let whole = arena.alloc(2048);
        prop_assert!(whole.is_ok());
    }

    #[test]
    fn prop_host_blocks_stay_disjoint(ops in prop::collection::vec(arbitrary_op(), 1..80)) {
        let arena = Arena::host();
        let live = replay(&arena, &ops)?;

        let expected: usize = live.iter().map(|block| block.size).sum();
        prop_assert_eq!(arena.stats().in_use, expected);
    }

    #[test]
    fn prop_manage_matches_direct_calls(sizes in prop::collection::vec(1usize..200, 1..20)) {
        let arena = Arena::sandbox(8192).unwrap();
        let mut ptr = None;
        let mut old = 0;

        for &size in &sizes {
            ptr = arena.manage(ptr, old, size).unwrap();
            prop_assert_eq!(ptr.and_then(|p| arena.size_of(p)), Some(size));
            old = size;
        }

        prop_assert_eq!(arena.manage(ptr, old, 0).unwrap(), None);
        prop_assert_eq!(arena.stats().live_allocations, 0);
    }
}
