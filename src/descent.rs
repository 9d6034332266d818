//! Descent Engine (C4, spec.md §4.4).
//!
//! Two traversal operations, two distinct routing rules: the lookup/update
//! path locates an existing key under `key <= k[j]` (`Node::child_index_for`),
//! while the path-recording descent chooses the insertion subtree under the
//! strictly-less-than `key < k[j]` (`Node::child_index_for_insert`) and
//! records the ancestors visited along the way for the mutation engine to
//! walk back up. Both route a tie towards the left child overall, but the
//! insert path's strict rule additionally steps past every existing copy of
//! a repeated key, keeping duplicates of one key physically contiguous
//! within a single subtree rather than splitting them across a boundary.

use crate::block_store::BlockStore;
use crate::errors::*;
use crate::key_value::{Key, Value};
use crate::node::{Node, NodeType};
use crate::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Lookup,
    Update,
}

/// Recursive descent from `node_block` for `key`. Under `Mode::Update`,
/// rewrites the leaf block in place with `new_value` on a hit.
pub(crate) fn lookup_or_update<B: BlockStore>(
    store: &B,
    node_block: BlockId,
    key: &Key,
    mode: Mode,
    new_value: Option<&Value>,
) -> Result<Value> {
    trace!("lookup_or_update: visiting block {}", node_block);
    let node = Node::unpack(&store.read_block(node_block)?)?;

    match node.header.node_type {
        NodeType::Root | NodeType::Interior => match node.child_index_for(key) {
            Some(idx) => {
                let child = node.get_child(idx)?;
                lookup_or_update(store, child, key, mode, new_value)
            }
            // The degenerate empty root has nowhere to route to.
            None => Err(ErrorKind::NotFound.into()),
        },
        NodeType::Leaf => {
            for slot in 0..node.numkeys() {
                if node.get_key(slot)? == key {
                    return match mode {
                        Mode::Lookup => Ok(node.get_value(slot)?.clone()),
                        Mode::Update => {
                            let value = new_value
                                .expect("Mode::Update always carries a replacement value")
                                .clone();
                            let mut node = node;
                            node.set_value(slot, value.clone())?;
                            store.write_block(node_block, &node.pack()?)?;
                            Ok(value)
                        }
                    };
                }
            }
            Err(ErrorKind::NotFound.into())
        }
        other => bail!(ErrorKind::Insane(format!(
            "lookup_or_update encountered node type {:?} at block {}",
            other, node_block
        ))),
    }
}

/// Descends from `root_block` to the leaf that should contain `key`,
/// recording every block visited. `path[0]` is `root_block`; `path`'s last
/// entry is the target leaf.
pub(crate) fn lookup_leaf_with_path<B: BlockStore>(
    store: &B,
    root_block: BlockId,
    key: &Key,
) -> Result<Vec<BlockId>> {
    let mut path = vec![root_block];
    let mut current = root_block;

    loop {
        let node = Node::unpack(&store.read_block(current)?)?;
        match node.header.node_type {
            NodeType::Leaf => return Ok(path),
            NodeType::Root | NodeType::Interior => {
                let idx = node.child_index_for_insert(key).ok_or_else(|| {
                    Error::from(ErrorKind::Insane(
                        "descended into a degenerate root while recording an insert path"
                            .to_string(),
                    ))
                })?;
                let child = node.get_child(idx)?;
                trace!("lookup_leaf_with_path: {} -> {}", current, child);
                path.push(child);
                current = child;
            }
            other => bail!(ErrorKind::Insane(format!(
                "lookup_leaf_with_path encountered node type {:?} at block {}",
                other, current
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_store::MemoryBlockStore;
    use crate::node::{Header, Node, NodeBody, NodeType, SlotArray};

    fn key(s: &[u8]) -> Key {
        Key::new(s.to_vec())
    }

    /// A real interior node with a repeated separator key: at the `Node`
    /// level, `child_index_for` and `child_index_for_insert` must disagree
    /// on which child a probe equal to that separator routes to.
    fn branch_with_duplicate_separator() -> Node {
        Node {
            header: Header {
                node_type: NodeType::Root,
                keysize: 2,
                valuesize: 2,
                blocksize: 64,
                rootnode: 1,
                freelist: 0,
                numkeys: 3,
            },
            body: NodeBody::Branch {
                keys: SlotArray::from_vec(vec![key(b"AA"), key(b"AA"), key(b"CC")]),
                children: SlotArray::from_vec(vec![2, 3, 4, 5]),
            },
        }
    }

    #[test]
    fn child_index_for_routes_duplicate_keys_left() {
        let node = branch_with_duplicate_separator();
        assert_eq!(node.child_index_for(&key(b"AA")), Some(0));
        assert_eq!(node.child_index_for(&key(b"BB")), Some(2));
        assert_eq!(node.child_index_for(&key(b"ZZ")), Some(3));
    }

    #[test]
    fn child_index_for_insert_steps_past_every_duplicate() {
        let node = branch_with_duplicate_separator();
        // Strict `<`: both copies of "AA" are skipped, landing on the
        // child past them rather than the leftmost one.
        assert_eq!(node.child_index_for_insert(&key(b"AA")), Some(2));
        assert_eq!(node.child_index_for_insert(&key(b"BB")), Some(2));
        assert_eq!(node.child_index_for_insert(&key(b"ZZ")), Some(3));
    }

    /// End-to-end: the lookup path and the path-recording descent reach
    /// different leaves for the same duplicated probe key, exactly because
    /// they apply different comparison rules (spec.md §4.4).
    #[test]
    fn lookup_and_path_recording_descent_diverge_on_duplicate_keys() {
        let store = MemoryBlockStore::new(64, 8);
        let root = branch_with_duplicate_separator();
        store.write_block(1, &root.pack().unwrap()).unwrap();

        let leaf_template = Header {
            node_type: NodeType::Leaf,
            keysize: 2,
            valuesize: 2,
            blocksize: 64,
            rootnode: 1,
            freelist: 0,
            numkeys: 1,
        };
        let left_leaf = Node {
            header: leaf_template.clone(),
            body: NodeBody::Leaf {
                keys: SlotArray::from_vec(vec![key(b"AA")]),
                values: SlotArray::from_vec(vec![Value::new(b"00".to_vec())]),
            },
        };
        store.write_block(2, &left_leaf.pack().unwrap()).unwrap();

        let right_leaf = Node {
            header: leaf_template,
            body: NodeBody::Leaf {
                keys: SlotArray::from_vec(vec![key(b"AA")]),
                values: SlotArray::from_vec(vec![Value::new(b"22".to_vec())]),
            },
        };
        store.write_block(4, &right_leaf.pack().unwrap()).unwrap();

        let found = lookup_or_update(&store, 1, &key(b"AA"), Mode::Lookup, None).unwrap();
        assert_eq!(found.as_bytes(), b"00", "lookup uses <=, routing left");

        let path = lookup_leaf_with_path(&store, 1, &key(b"AA")).unwrap();
        assert_eq!(
            path,
            vec![1, 4],
            "insert-path descent uses strict <, stepping past both duplicates"
        );
    }
}
