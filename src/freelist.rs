//! Free List Manager (C3, spec.md §4.3).
//!
//! Maintains the superblock's `freelist` head and each unallocated node's
//! `freelist` successor pointer. Every allocate/deallocate is paired with a
//! `Notify*` call on the block store, and rewrites the superblock so the
//! head stays consistent from the caller's perspective.

use crate::block_store::BlockStore;
use crate::errors::*;
use crate::node::{Node, NodeType};
use crate::{BlockId, SUPERBLOCK_BLOCK};

pub(crate) fn write_superblock<B: BlockStore>(store: &B, superblock: &Node) -> Result<()> {
    store.write_block(SUPERBLOCK_BLOCK, &superblock.pack()?)
}

/// Pops the head of the free chain. Fails with `NoSpace` if the chain is
/// empty.
pub(crate) fn allocate_node<B: BlockStore>(store: &B, superblock: &mut Node) -> Result<BlockId> {
    let head = superblock.header.freelist;
    if head == crate::NIL {
        bail!(ErrorKind::NoSpace);
    }

    let popped = Node::unpack(&store.read_block(head)?)?;
    assert_eq!(
        popped.header.node_type,
        NodeType::Unallocated,
        "AllocateNode: block {} popped off the free chain is not typed unallocated",
        head
    );

    superblock.header.freelist = popped.header.freelist;
    write_superblock(store, superblock)?;
    store.notify_allocate_block(head);

    trace!("allocate_node: popped block {}", head);
    Ok(head)
}

/// Retypes `block` as unallocated and threads it at the head of the free
/// chain.
pub(crate) fn deallocate_node<B: BlockStore>(
    store: &B,
    superblock: &mut Node,
    block: BlockId,
) -> Result<()> {
    let current = Node::unpack(&store.read_block(block)?)?;
    assert_ne!(
        current.header.node_type,
        NodeType::Unallocated,
        "DeallocateNode: block {} is already unallocated",
        block
    );

    let freed = Node::unallocated(&current.header, superblock.header.freelist);
    store.write_block(block, &freed.pack()?)?;

    superblock.header.freelist = block;
    write_superblock(store, superblock)?;
    store.notify_deallocate_block(block);

    trace!("deallocate_node: freed block {}", block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::MemoryBlockStore;
    use crate::node::{Header, NodeType};

    fn attached(store: &MemoryBlockStore) -> Node {
        // Mirrors BTreeIndex::attach's bootstrap, kept minimal for
        // freelist-only unit tests.
        let header_template = Header {
            node_type: NodeType::Unallocated,
            keysize: 2,
            valuesize: 2,
            blocksize: 64,
            rootnode: 1,
            freelist: 0,
            numkeys: 0,
        };
        for i in 2..store.num_blocks() {
            let next = if i + 1 == store.num_blocks() { 0 } else { i + 1 };
            let node = Node::unallocated(&header_template, next);
            store.write_block(i, &node.pack().unwrap()).unwrap();
        }
        Node::superblock(2, 2, 64, 1, 2, 0)
    }

    #[test]
    fn allocate_then_deallocate_round_trips_the_chain() {
        let store = MemoryBlockStore::new(64, 8);
        let mut superblock = attached(&store);

        let a = allocate_node(&store, &mut superblock).unwrap();
        assert_eq!(a, 2);
        let b = allocate_node(&store, &mut superblock).unwrap();
        assert_eq!(b, 3);

        // deallocate must see a non-unallocated block: fake one up as a leaf
        let leaf = Node::empty_leaf(&Header {
            node_type: NodeType::Leaf,
            keysize: 2,
            valuesize: 2,
            blocksize: 64,
            rootnode: 1,
            freelist: 0,
            numkeys: 0,
        });
        store.write_block(a, &leaf.pack().unwrap()).unwrap();

        deallocate_node(&store, &mut superblock, a).unwrap();
        assert_eq!(superblock.header.freelist, a);

        let c = allocate_node(&store, &mut superblock).unwrap();
        assert_eq!(c, a, "most recently freed block should be reallocated first");
    }

    #[test]
    fn exhausting_the_chain_returns_no_space() {
        let store = MemoryBlockStore::new(64, 3);
        let mut superblock = attached(&store);
        assert_eq!(allocate_node(&store, &mut superblock).unwrap(), 2);
        assert!(allocate_node(&store, &mut superblock).is_err());
    }
}
