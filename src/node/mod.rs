//! Node representation and codec (C2, spec.md §3, §4.2).
//!
//! A block holds exactly one node, which is one of four variants plus the
//! unique superblock. All variants share one header layout; the payload
//! that follows is interpreted according to `node_type`. This mirrors how
//! `betree_storage_stack::data_management::Object` draws the line between a
//! shared pointer/metadata shape and a variant-specific payload.

mod codec;
mod slot_array;

pub use slot_array::SlotArray;

use crate::errors::*;
use crate::key_value::{Key, Value};
use crate::BlockId;

/// The tagged variant of a node (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Superblock,
    Root,
    Interior,
    Leaf,
    Unallocated,
}

impl NodeType {
    fn to_tag(self) -> u8 {
        match self {
            NodeType::Superblock => 0,
            NodeType::Root => 1,
            NodeType::Interior => 2,
            NodeType::Leaf => 3,
            NodeType::Unallocated => 4,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => NodeType::Superblock,
            1 => NodeType::Root,
            2 => NodeType::Interior,
            3 => NodeType::Leaf,
            4 => NodeType::Unallocated,
            other => bail!(ErrorKind::Insane(format!("unknown node type tag {}", other))),
        })
    }

    pub fn is_branch(self) -> bool {
        matches!(self, NodeType::Root | NodeType::Interior)
    }
}

/// The shared header layout (spec.md §3, "Node header"). Unused fields are
/// ignored per variant, but every variant carries the same bytes so the
/// codec never has to guess what it's looking at before reading the tag.
#[derive(Debug, Clone)]
pub struct Header {
    pub node_type: NodeType,
    pub keysize: u32,
    pub valuesize: u32,
    pub blocksize: u32,
    /// Redundant pointer to the tree root, carried on every node for
    /// convenience (spec.md §3).
    pub rootnode: BlockId,
    /// Next free block, meaningful only when `node_type == Unallocated`
    /// (or for the superblock, the head of the free chain).
    pub freelist: BlockId,
    pub numkeys: u32,
}

/// `nodetype(1) + keysize(4) + valuesize(4) + blocksize(4) + rootnode(8) +
/// freelist(8) + numkeys(4)`.
pub const HEADER_LEN: usize = 1 + 4 + 4 + 4 + 8 + 8 + 4;

impl Header {
    /// `maxNumKeys = floor(blocksize / (keysize + valuesize))` (spec.md §3).
    pub fn max_num_keys(&self) -> usize {
        let entry = self.keysize as usize + self.valuesize as usize;
        if entry == 0 {
            0
        } else {
            self.blocksize as usize / entry
        }
    }

    /// A node is overfull once it holds more than `floor(2*maxNumKeys/3)`
    /// keys; that's the split threshold.
    pub fn overfull_threshold(&self) -> usize {
        (2 * self.max_num_keys()) / 3
    }

    /// Target (not enforced) minimum key count after a split:
    /// `ceil(maxNumKeys/3)`.
    pub fn min_keys_after_split(&self) -> usize {
        let max = self.max_num_keys();
        (max + 2) / 3
    }
}

/// Variant-specific payload. `Branch` backs both `Root` and `Interior`
/// nodes, since they share the same `n` keys / `n+1` children shape.
#[derive(Debug, Clone)]
pub enum NodeBody {
    Superblock,
    Branch {
        keys: SlotArray<Key>,
        children: SlotArray<BlockId>,
    },
    Leaf {
        keys: SlotArray<Key>,
        values: SlotArray<Value>,
    },
    Unallocated,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub header: Header,
    pub body: NodeBody,
}

impl Node {
    pub fn empty_leaf(template: &Header) -> Node {
        Node {
            header: Header {
                node_type: NodeType::Leaf,
                numkeys: 0,
                ..template.clone()
            },
            body: NodeBody::Leaf {
                keys: SlotArray::new(),
                values: SlotArray::new(),
            },
        }
    }

    pub fn empty_branch(node_type: NodeType, template: &Header) -> Node {
        assert!(node_type.is_branch());
        Node {
            header: Header {
                node_type,
                numkeys: 0,
                ..template.clone()
            },
            body: NodeBody::Branch {
                keys: SlotArray::new(),
                children: SlotArray::new(),
            },
        }
    }

    pub fn unallocated(template: &Header, next_free: BlockId) -> Node {
        Node {
            header: Header {
                node_type: NodeType::Unallocated,
                numkeys: 0,
                freelist: next_free,
                ..template.clone()
            },
            body: NodeBody::Unallocated,
        }
    }

    pub fn superblock(
        keysize: u32,
        valuesize: u32,
        blocksize: u32,
        rootnode: BlockId,
        freelist: BlockId,
        numkeys: u32,
    ) -> Node {
        Node {
            header: Header {
                node_type: NodeType::Superblock,
                keysize,
                valuesize,
                blocksize,
                rootnode,
                freelist,
                numkeys,
            },
            body: NodeBody::Superblock,
        }
    }

    fn invalid_slot(&self, slot: usize) -> Error {
        ErrorKind::InvalidSlot(slot, self.header.numkeys).into()
    }

    pub fn get_key(&self, slot: usize) -> Result<&Key> {
        match &self.body {
            NodeBody::Branch { keys, .. } | NodeBody::Leaf { keys, .. } => {
                keys.get(slot).ok_or_else(|| self.invalid_slot(slot))
            }
            _ => bail!(ErrorKind::Insane(
                "get_key on a node with no keys".to_string()
            )),
        }
    }

    pub fn set_key(&mut self, slot: usize, key: Key) -> Result<()> {
        let numkeys = self.header.numkeys;
        match &mut self.body {
            NodeBody::Branch { keys, .. } | NodeBody::Leaf { keys, .. } => {
                let slot_ref = keys
                    .get_mut(slot)
                    .ok_or_else(|| ErrorKind::InvalidSlot(slot, numkeys))?;
                *slot_ref = key;
                Ok(())
            }
            _ => bail!(ErrorKind::Insane(
                "set_key on a node with no keys".to_string()
            )),
        }
    }

    pub fn get_value(&self, slot: usize) -> Result<&Value> {
        match &self.body {
            NodeBody::Leaf { values, .. } => {
                values.get(slot).ok_or_else(|| self.invalid_slot(slot))
            }
            _ => bail!(ErrorKind::Insane("get_value on a non-leaf node".to_string())),
        }
    }

    pub fn set_value(&mut self, slot: usize, value: Value) -> Result<()> {
        let numkeys = self.header.numkeys;
        match &mut self.body {
            NodeBody::Leaf { values, .. } => {
                let slot_ref = values
                    .get_mut(slot)
                    .ok_or_else(|| ErrorKind::InvalidSlot(slot, numkeys))?;
                *slot_ref = value;
                Ok(())
            }
            _ => bail!(ErrorKind::Insane("set_value on a non-leaf node".to_string())),
        }
    }

    pub fn get_child(&self, slot: usize) -> Result<BlockId> {
        match &self.body {
            NodeBody::Branch { children, .. } => {
                children.get(slot).copied().ok_or_else(|| self.invalid_slot(slot))
            }
            _ => bail!(ErrorKind::Insane("get_child on a non-branch node".to_string())),
        }
    }

    pub fn set_child(&mut self, slot: usize, child: BlockId) -> Result<()> {
        let numkeys = self.header.numkeys;
        match &mut self.body {
            NodeBody::Branch { children, .. } => {
                let slot_ref = children
                    .get_mut(slot)
                    .ok_or_else(|| ErrorKind::InvalidSlot(slot, numkeys))?;
                *slot_ref = child;
                Ok(())
            }
            _ => bail!(ErrorKind::Insane("set_child on a non-branch node".to_string())),
        }
    }

    /// The child to descend to for probe key `key` on the lookup/update
    /// path (spec.md §4.4): `i = min{j : key <= k[j]}`, else the last
    /// child. Returns `None` only for the degenerate empty root, which has
    /// no children at all yet.
    ///
    /// This is *not* the rule the insert path's path-recording descent
    /// uses — see [`Node::child_index_for_insert`].
    pub fn child_index_for(&self, key: &Key) -> Option<usize> {
        match &self.body {
            NodeBody::Branch { keys, children } => {
                if children.is_empty() {
                    None
                } else {
                    Some(keys.find(key))
                }
            }
            _ => None,
        }
    }

    /// The child to descend to for probe key `key` on the path-recording
    /// (insert) descent (spec.md §4.4): `i = min{j : key < k[j]}`, else the
    /// last child. Strict `<`, unlike [`Node::child_index_for`]'s `<=` —
    /// the spec calls out this asymmetry explicitly so that a key equal to
    /// an existing separator still descends past it, keeping duplicates
    /// physically contiguous within one leaf. Returns `None` only for the
    /// degenerate empty root.
    pub fn child_index_for_insert(&self, key: &Key) -> Option<usize> {
        match &self.body {
            NodeBody::Branch { keys, children } => {
                if children.is_empty() {
                    None
                } else {
                    Some(
                        keys.iter()
                            .position(|k| key < k)
                            .unwrap_or(children.len() - 1),
                    )
                }
            }
            _ => None,
        }
    }

    /// The slot a new key should occupy in a leaf: the first slot whose key
    /// is `>= key`, or one past the end if every existing key is smaller.
    pub fn leaf_insert_slot(&self, key: &Key) -> Result<usize> {
        match &self.body {
            NodeBody::Leaf { keys, .. } => Ok(keys.find(key)),
            _ => bail!(ErrorKind::Insane(
                "leaf_insert_slot on a non-leaf node".to_string()
            )),
        }
    }

    pub fn numkeys(&self) -> usize {
        self.header.numkeys as usize
    }
}
