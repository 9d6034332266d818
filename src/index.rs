//! The public library API (spec.md §6): `BTreeIndex` wires the block store
//! collaborator, the descent/mutation engines, the free list manager and
//! diagnostics together behind `Attach`/`Detach`/`Lookup`/`Insert`/`Update`/
//! `Delete`/`Display`/`SanityCheck`.

use std::io::Write;

use crate::block_store::BlockStore;
use crate::descent::{self, Mode};
use crate::diagnostics::{self, DisplayMode};
use crate::errors::*;
use crate::freelist;
use crate::key_value::{Key, Value};
use crate::mutation;
use crate::node::{Node, NodeBody, NodeType, SlotArray};
use crate::{BlockId, INITIAL_ROOT_BLOCK, NIL, SUPERBLOCK_BLOCK};

/// A disk-resident B+ tree index over a fixed-size block store.
///
/// Owns its `S` directly rather than through a lock-guarded handle, since
/// the engine is single-threaded and synchronous by design (spec.md §5).
pub struct BTreeIndex<S: BlockStore> {
    store: S,
    keysize: u32,
    valuesize: u32,
    superblock: Option<Node>,
}

impl<S: BlockStore> BTreeIndex<S> {
    /// Creates a handle over `store`. The index is unusable until
    /// [`attach`](Self::attach) succeeds.
    pub fn new(keysize: u32, valuesize: u32, store: S) -> Self {
        BTreeIndex {
            store,
            keysize,
            valuesize,
            superblock: None,
        }
    }

    fn require_attached(&self) -> Result<&Node> {
        self.superblock
            .as_ref()
            .ok_or_else(|| Error::from("BTreeIndex: not attached".to_string()))
    }

    /// `Attach(initblock, create)` (spec.md §6). `initblock` must be the
    /// superblock location; `create=true` lays down a fresh superblock, a
    /// degenerate empty root at block 1, and free-chains the remaining
    /// blocks ascending. `create=false` reads back an existing superblock.
    pub fn attach(&mut self, initblock: BlockId, create: bool) -> Result<()> {
        if initblock != SUPERBLOCK_BLOCK {
            bail!(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("attach: initblock must be {}", SUPERBLOCK_BLOCK),
            ));
        }

        let superblock = if create {
            self.initialize(initblock)?
        } else {
            let existing = Node::unpack(&self.store.read_block(initblock)?)?;
            if existing.header.node_type != NodeType::Superblock {
                bail!(ErrorKind::Structural(format!(
                    "block {} is not typed as a superblock",
                    initblock
                )));
            }
            existing
        };

        debug!(
            "attach: rootnode={} freelist={} numkeys={}",
            superblock.header.rootnode, superblock.header.freelist, superblock.header.numkeys
        );
        self.superblock = Some(superblock);
        Ok(())
    }

    fn initialize(&self, initblock: BlockId) -> Result<Node> {
        let blocksize = self.store.block_size() as u32;
        let num_blocks = self.store.num_blocks();

        let template = crate::node::Header {
            node_type: NodeType::Unallocated,
            keysize: self.keysize,
            valuesize: self.valuesize,
            blocksize,
            rootnode: INITIAL_ROOT_BLOCK,
            freelist: NIL,
            numkeys: 0,
        };

        let root = Node {
            header: crate::node::Header {
                node_type: NodeType::Root,
                ..template.clone()
            },
            body: NodeBody::Branch {
                keys: SlotArray::new(),
                children: SlotArray::new(),
            },
        };
        self.store
            .write_block(INITIAL_ROOT_BLOCK, &root.pack()?)?;
        self.store.notify_allocate_block(INITIAL_ROOT_BLOCK);

        let first_free = if num_blocks > 2 { 2 } else { NIL };
        for block in 2..num_blocks {
            let next = if block + 1 == num_blocks { NIL } else { block + 1 };
            let unallocated = Node::unallocated(&template, next);
            self.store.write_block(block, &unallocated.pack()?)?;
        }

        let superblock = Node::superblock(
            self.keysize,
            self.valuesize,
            blocksize,
            INITIAL_ROOT_BLOCK,
            first_free,
            0,
        );
        self.store.write_block(initblock, &superblock.pack()?)?;
        self.store.notify_allocate_block(initblock);
        Ok(superblock)
    }

    /// `Detach` (spec.md §6): flushes the in-memory superblock handle.
    /// Every mutation already rewrites the superblock block as it happens,
    /// so this exists to mark the index as no longer attached.
    pub fn detach(&mut self) -> Result<()> {
        if let Some(superblock) = &self.superblock {
            freelist::write_superblock(&self.store, superblock)?;
        }
        self.superblock = None;
        Ok(())
    }

    pub fn lookup(&self, key: &[u8]) -> Result<Value> {
        let superblock = self.require_attached()?;
        let key = Key::new(key.to_vec());
        descent::lookup_or_update(&self.store, superblock.header.rootnode, &key, Mode::Lookup, None)
    }

    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let key = Key::new(key);
        let value = Value::new(value);
        let superblock = self
            .superblock
            .as_mut()
            .ok_or_else(|| Error::from("BTreeIndex: not attached".to_string()))?;
        mutation::insert(&self.store, superblock, key, value)
    }

    pub fn update(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let superblock = self.require_attached()?;
        mutation::update(&self.store, superblock, Key::new(key), Value::new(value))
    }

    /// `Delete` is explicitly unimplemented (spec.md §4.5).
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.require_attached()?;
        mutation::delete(&Key::new(key.to_vec()))
    }

    pub fn display<W: Write>(&self, mode: DisplayMode, out: &mut W) -> Result<()> {
        let superblock = self.require_attached()?;
        diagnostics::display(&self.store, superblock.header.rootnode, mode, out)
    }

    pub fn sanity_check(&self) -> Result<Vec<String>> {
        let superblock = self.require_attached()?;
        diagnostics::sanity_check(&self.store, superblock)
    }
}
