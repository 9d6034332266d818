use std::cell::RefCell;
use std::collections::HashSet;

use super::BlockStore;
use crate::errors::*;
use crate::BlockId;

/// A reference `BlockStore` backed by a flat in-process buffer of blocks.
///
/// The engine's concurrency model is single-threaded and synchronous
/// (spec.md §5), so plain `RefCell` interior mutability is enough here —
/// there is no need for the lock-guarded, multi-reader cache that
/// `betree_storage_stack::data_management` builds around its own block
/// store, since this crate has exactly one caller by design.
pub struct MemoryBlockStore {
    block_size: usize,
    blocks: RefCell<Vec<Box<[u8]>>>,
    /// Blocks the engine has told us are live, via the `Notify*` hooks.
    /// Purely diagnostic bookkeeping: nothing in the engine depends on this
    /// set for correctness, but tests use it to cross-check the free list.
    live: RefCell<HashSet<BlockId>>,
}

impl MemoryBlockStore {
    /// Allocates `num_blocks` zero-filled blocks of `block_size` bytes each.
    pub fn new(block_size: usize, num_blocks: u64) -> Self {
        let blocks = (0..num_blocks)
            .map(|_| vec![0u8; block_size].into_boxed_slice())
            .collect();
        MemoryBlockStore {
            block_size,
            blocks: RefCell::new(blocks),
            live: RefCell::new(HashSet::new()),
        }
    }

    /// Blocks the store currently believes are allocated, for test
    /// assertions against the free-list manager's own accounting.
    pub fn live_blocks(&self) -> HashSet<BlockId> {
        self.live.borrow().clone()
    }
}

impl BlockStore for MemoryBlockStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> u64 {
        self.blocks.borrow().len() as u64
    }

    fn read_block(&self, block: BlockId) -> Result<Vec<u8>> {
        let blocks = self.blocks.borrow();
        let slot = blocks
            .get(block as usize)
            .ok_or_else(|| Error::from(format!("block {} out of range", block)))?;
        Ok(slot.to_vec())
    }

    fn write_block(&self, block: BlockId, data: &[u8]) -> Result<()> {
        let mut blocks = self.blocks.borrow_mut();
        let slot = blocks
            .get_mut(block as usize)
            .ok_or_else(|| Error::from(format!("block {} out of range", block)))?;
        assert_eq!(data.len(), self.block_size, "write_block: size mismatch");
        slot.copy_from_slice(data);
        Ok(())
    }

    fn notify_allocate_block(&self, block: BlockId) {
        self.live.borrow_mut().insert(block);
    }

    fn notify_deallocate_block(&self, block: BlockId) {
        self.live.borrow_mut().remove(&block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_block_contents() {
        let store = MemoryBlockStore::new(64, 4);
        let mut data = vec![0u8; 64];
        data[0] = 0xAB;
        store.write_block(2, &data).unwrap();
        assert_eq!(store.read_block(2).unwrap(), data);
        assert_eq!(store.read_block(0).unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn tracks_notified_liveness() {
        let store = MemoryBlockStore::new(64, 4);
        store.notify_allocate_block(1);
        store.notify_allocate_block(2);
        store.notify_deallocate_block(1);
        assert_eq!(store.live_blocks(), HashSet::from([2]));
    }
}
