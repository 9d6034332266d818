//! Property tests for invariants 1, 2 and 5 (spec.md §8): no reachable node
//! ever exceeds the overfull threshold, every reachable node's keys are
//! non-decreasing, and lookup returns the most recently written value for
//! every key after an arbitrary sequence of inserts/updates.

use std::collections::BTreeMap;

use bptree_storage_stack::{BTreeIndex, MemoryBlockStore};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

const KEYSIZE: u32 = 2;
const VALUESIZE: u32 = 2;
const BLOCKSIZE: usize = 64;
const NUM_BLOCKS: u64 = 64;

/// A two-digit decimal string, fitting `KEYSIZE`/`VALUESIZE` exactly and
/// keeping key space small enough that duplicate inserts are common (which
/// is the interesting case for invariant 5).
#[derive(Debug, Clone)]
struct TwoDigits(Vec<u8>);

impl Arbitrary for TwoDigits {
    fn arbitrary(g: &mut Gen) -> Self {
        let n = u32::arbitrary(g) % 100;
        TwoDigits(format!("{:02}", n).into_bytes())
    }
}

#[quickcheck]
fn invariant_5_lookup_returns_most_recent_write(ops: Vec<(TwoDigits, TwoDigits, bool)>) -> bool {
    let store = MemoryBlockStore::new(BLOCKSIZE, NUM_BLOCKS);
    let mut index = BTreeIndex::new(KEYSIZE, VALUESIZE, store);
    index.attach(0, true).unwrap();

    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for (key, value, prefer_update) in ops {
        let key = key.0;
        let value = value.0;
        if model.contains_key(&key) {
            if prefer_update {
                if index.update(key.clone(), value.clone()).is_ok() {
                    model.insert(key, value);
                }
            }
            // Duplicate `Insert` is expected to fail (spec.md §9); the
            // model is left untouched either way.
        } else if index.insert(key.clone(), value.clone()).is_ok() {
            model.insert(key, value);
        }
    }

    model.iter().all(|(key, value)| {
        index
            .lookup(key)
            .map(|v| v.as_bytes() == value.as_slice())
            .unwrap_or(false)
    })
}

#[quickcheck]
fn invariants_1_and_2_hold_after_arbitrary_inserts(keys: Vec<TwoDigits>) -> bool {
    let store = MemoryBlockStore::new(BLOCKSIZE, NUM_BLOCKS);
    let mut index = BTreeIndex::new(KEYSIZE, VALUESIZE, store);
    index.attach(0, true).unwrap();

    for key in keys {
        // Overfull/ordering invariants must hold even when some inserts are
        // rejected as duplicates, so errors here are not test failures.
        let _ = index.insert(key.0.clone(), key.0);
    }

    index.sanity_check().is_ok()
}
