//! Mutation Engine (C5, spec.md §4.5).
//!
//! `Insert` attempts an update first (so a hit returns `DuplicateKey`
//! rather than silently overwriting — see spec.md §9's resolution of the
//! update-on-insert open question), bootstraps an empty tree into two
//! leaves under the degenerate root, and otherwise inserts into the target
//! leaf and rebalances it if it became overfull. `Rebalance` is one
//! function that works uniformly for leaf and interior splits.

use crate::descent::{self, Mode};
use crate::errors::*;
use crate::freelist;
use crate::key_value::{Key, Value};
use crate::node::{Node, NodeBody, NodeType, SlotArray};
use crate::BlockId;

use super::block_store::BlockStore;

pub(crate) fn insert<B: BlockStore>(
    store: &B,
    superblock: &mut Node,
    key: Key,
    value: Value,
) -> Result<()> {
    // 1. Attempt update first.
    match descent::lookup_or_update(store, superblock.header.rootnode, &key, Mode::Lookup, None) {
        Ok(_) => bail!(ErrorKind::DuplicateKey),
        Err(ref e) if matches!(e.kind(), ErrorKind::NotFound) => {}
        Err(e) => return Err(e),
    }

    let root_block = superblock.header.rootnode;
    let root = Node::unpack(&store.read_block(root_block)?)?;

    if root.numkeys() == 0 {
        bootstrap_empty_tree(store, superblock, root, root_block, key, value)?;
        return Ok(());
    }

    // 3. Ordinary insert.
    let path = descent::lookup_leaf_with_path(store, root_block, &key)?;
    let leaf_block = *path.last().expect("path always has at least one entry");
    let mut leaf = Node::unpack(&store.read_block(leaf_block)?)?;

    let slot = leaf.leaf_insert_slot(&key)?;
    match &mut leaf.body {
        NodeBody::Leaf { keys, values } => {
            keys.insert(slot, key);
            values.insert(slot, value);
        }
        _ => bail!(ErrorKind::Insane("insert target was not a leaf".to_string())),
    }
    leaf.header.numkeys += 1;
    store.write_block(leaf_block, &leaf.pack()?)?;

    superblock.header.numkeys += 1;
    freelist::write_superblock(store, superblock)?;

    // 4. Check overfull.
    if leaf.numkeys() > leaf.header.overfull_threshold() {
        let parent_path = path[..path.len() - 1].to_vec();
        debug!(
            "insert: leaf {} overfull ({} keys), rebalancing",
            leaf_block,
            leaf.numkeys()
        );
        rebalance(store, superblock, leaf_block, parent_path)?;
    }

    Ok(())
}

fn bootstrap_empty_tree<B: BlockStore>(
    store: &B,
    superblock: &mut Node,
    root: Node,
    root_block: BlockId,
    key: Key,
    value: Value,
) -> Result<()> {
    debug!("insert: bootstrapping empty tree at root block {}", root_block);
    let left_block = freelist::allocate_node(store, superblock)?;
    let right_block = freelist::allocate_node(store, superblock)?;

    let mut left_header = root.header.clone();
    left_header.node_type = NodeType::Leaf;
    left_header.numkeys = 1;
    let left = Node {
        header: left_header,
        body: NodeBody::Leaf {
            keys: SlotArray::from_vec(vec![key.clone()]),
            values: SlotArray::from_vec(vec![value]),
        },
    };
    store.write_block(left_block, &left.pack()?)?;

    let right_header = {
        let mut h = root.header.clone();
        h.node_type = NodeType::Leaf;
        h.numkeys = 0;
        h
    };
    let right = Node::empty_leaf(&right_header);
    store.write_block(right_block, &right.pack()?)?;

    let mut new_root = root;
    new_root.header.numkeys = 1;
    new_root.body = NodeBody::Branch {
        keys: SlotArray::from_vec(vec![key]),
        children: SlotArray::from_vec(vec![left_block, right_block]),
    };
    store.write_block(root_block, &new_root.pack()?)?;

    superblock.header.numkeys += 1;
    freelist::write_superblock(store, superblock)?;
    Ok(())
}

/// Splits `node_block` and propagates the separator up `parent_path`
/// (spec.md §4.5's `Rebalance`). Works uniformly for leaf and interior
/// splits; a splitting root always yields two interior children.
pub(crate) fn rebalance<B: BlockStore>(
    store: &B,
    superblock: &mut Node,
    node_block: BlockId,
    mut parent_path: Vec<BlockId>,
) -> Result<()> {
    let node = Node::unpack(&store.read_block(node_block)?)?;
    let was_root = node.header.node_type == NodeType::Root;
    let midpoint = (node.numkeys() + 1) / 2; // ceil(n/2), per spec.md §9

    let left_block = freelist::allocate_node(store, superblock)?;
    let right_block = freelist::allocate_node(store, superblock)?;

    let (separator, left, right) = split_node(node, midpoint)?;

    store.write_block(left_block, &left.pack()?)?;
    store.write_block(right_block, &right.pack()?)?;

    if was_root {
        let new_root_block = freelist::allocate_node(store, superblock)?;
        let mut root_header = left.header.clone();
        root_header.node_type = NodeType::Root;
        root_header.numkeys = 1;
        let new_root = Node {
            header: root_header,
            body: NodeBody::Branch {
                keys: SlotArray::from_vec(vec![separator]),
                children: SlotArray::from_vec(vec![left_block, right_block]),
            },
        };
        store.write_block(new_root_block, &new_root.pack()?)?;

        superblock.header.rootnode = new_root_block;
        freelist::write_superblock(store, superblock)?;
        freelist::deallocate_node(store, superblock, node_block)?;
        debug!(
            "rebalance: split root {} into new root {} with children {}, {}",
            node_block, new_root_block, left_block, right_block
        );
        return Ok(());
    }

    let parent_block = parent_path.pop().ok_or_else(|| {
        Error::from(ErrorKind::Insane(
            "rebalance: non-root split with no recorded parent".to_string(),
        ))
    })?;
    let mut parent = Node::unpack(&store.read_block(parent_block)?)?;
    let child_slot = match &parent.body {
        NodeBody::Branch { children, .. } => {
            children.iter().position(|&c| c == node_block).ok_or_else(|| {
                Error::from(ErrorKind::Insane(format!(
                    "rebalance: parent {} has no child pointer to {}",
                    parent_block, node_block
                )))
            })?
        }
        _ => bail!(ErrorKind::Insane("rebalance: parent is not a branch node".to_string())),
    };

    match &mut parent.body {
        NodeBody::Branch { keys, children } => {
            keys.insert(child_slot, separator);
            children.remove(child_slot);
            children.insert(child_slot, right_block);
            children.insert(child_slot, left_block);
        }
        _ => unreachable!("checked above"),
    }
    parent.header.numkeys += 1;
    store.write_block(parent_block, &parent.pack()?)?;

    freelist::deallocate_node(store, superblock, node_block)?;
    debug!(
        "rebalance: split node {} into {}, {} under parent {}",
        node_block, left_block, right_block, parent_block
    );

    if parent.numkeys() > parent.header.overfull_threshold() {
        rebalance(store, superblock, parent_block, parent_path)?;
    }
    Ok(())
}

/// Splits `node` into a left/right pair at `midpoint`, returning the
/// promoted separator key alongside them.
fn split_node(node: Node, midpoint: usize) -> Result<(Key, Node, Node)> {
    match node.body {
        NodeBody::Leaf { mut keys, mut values } => {
            let right_keys = keys.split_off(midpoint);
            let right_values = values.split_off(midpoint);
            let separator = keys.last().expect("left half is never empty").clone();

            let mut left_header = node.header.clone();
            left_header.numkeys = keys.len() as u32;
            let mut right_header = node.header.clone();
            right_header.numkeys = right_keys.len() as u32;

            let left = Node {
                header: left_header,
                body: NodeBody::Leaf { keys, values },
            };
            let right = Node {
                header: right_header,
                body: NodeBody::Leaf {
                    keys: right_keys,
                    values: right_values,
                },
            };
            Ok((separator, left, right))
        }
        NodeBody::Branch { mut keys, mut children } => {
            let right_keys = keys.split_off(midpoint);
            let right_children = children.split_off(midpoint);
            let separator = keys.last().expect("left half is never empty").clone();

            // A splitting root yields interior children, never two roots
            // (spec.md §9); a splitting interior node stays interior.
            let mut left_header = node.header.clone();
            left_header.node_type = NodeType::Interior;
            left_header.numkeys = keys.len() as u32;
            let mut right_header = node.header.clone();
            right_header.node_type = NodeType::Interior;
            right_header.numkeys = right_keys.len() as u32;

            let left = Node {
                header: left_header,
                body: NodeBody::Branch { keys, children },
            };
            let right = Node {
                header: right_header,
                body: NodeBody::Branch {
                    keys: right_keys,
                    children: right_children,
                },
            };
            Ok((separator, left, right))
        }
        _ => bail!(ErrorKind::Insane(
            "rebalance target is neither a leaf nor a branch node".to_string()
        )),
    }
}

pub(crate) fn update<B: BlockStore>(
    store: &B,
    superblock: &Node,
    key: Key,
    value: Value,
) -> Result<()> {
    descent::lookup_or_update(store, superblock.header.rootnode, &key, Mode::Update, Some(&value))
        .map(|_| ())
}

/// Delete is explicitly unimplemented (spec.md §4.5).
pub(crate) fn delete(_key: &Key) -> Result<()> {
    bail!(ErrorKind::Unimplemented("Delete"))
}
