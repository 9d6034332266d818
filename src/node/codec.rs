//! Fixed-layout (de)serialization of a [`super::Node`] to/from one block's
//! bytes (spec.md §6): header, then keys packed contiguously, then either
//! values (leaf) or child pointers (interior/root).
//!
//! `pack`/`unpack` mirror the signature shape of
//! `betree_storage_stack::data_management::Object::pack`/`unpack_at` — a
//! hand-rolled layout over `io::Write`/raw bytes rather than a generic
//! `serde` structure, since precise control over byte widths is the entire
//! point of an on-disk node format.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{Header, Node, NodeBody, NodeType, SlotArray};
use crate::errors::*;
use crate::key_value::{Key, Value};
use crate::BlockId;

impl Node {
    /// Serializes this node into a buffer of exactly `blocksize` bytes,
    /// zero-padding unused tail bytes.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let blocksize = self.header.blocksize as usize;
        let mut buf = Vec::with_capacity(blocksize);
        self.pack_into(&mut buf)?;
        if buf.len() > blocksize {
            bail!(ErrorKind::Structural(format!(
                "packed node ({} bytes) exceeds blocksize ({} bytes)",
                buf.len(),
                blocksize
            )));
        }
        buf.resize(blocksize, 0);
        Ok(buf)
    }

    fn pack_into<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_u8(self.header.node_type.to_tag())?;
        w.write_u32::<LittleEndian>(self.header.keysize)?;
        w.write_u32::<LittleEndian>(self.header.valuesize)?;
        w.write_u32::<LittleEndian>(self.header.blocksize)?;
        w.write_u64::<LittleEndian>(self.header.rootnode)?;
        w.write_u64::<LittleEndian>(self.header.freelist)?;
        w.write_u32::<LittleEndian>(self.header.numkeys)?;

        match &self.body {
            NodeBody::Leaf { keys, values } => {
                for key in keys.iter() {
                    w.write_all(key.as_bytes())?;
                }
                for value in values.iter() {
                    w.write_all(value.as_bytes())?;
                }
            }
            NodeBody::Branch { keys, children } => {
                for key in keys.iter() {
                    w.write_all(key.as_bytes())?;
                }
                for child in children.iter() {
                    w.write_u64::<LittleEndian>(*child)?;
                }
            }
            NodeBody::Superblock | NodeBody::Unallocated => {}
        }
        Ok(())
    }

    /// Parses a node out of a block's raw bytes. `data` must be at least
    /// `HEADER_LEN` bytes; trailing bytes beyond the used payload are
    /// ignored.
    pub fn unpack(data: &[u8]) -> Result<Node> {
        let mut cursor = Cursor::new(data);
        let tag = cursor.read_u8()?;
        let node_type = NodeType::from_tag(tag)?;
        let keysize = cursor.read_u32::<LittleEndian>()?;
        let valuesize = cursor.read_u32::<LittleEndian>()?;
        let blocksize = cursor.read_u32::<LittleEndian>()?;
        let rootnode = cursor.read_u64::<LittleEndian>()?;
        let freelist = cursor.read_u64::<LittleEndian>()?;
        let numkeys = cursor.read_u32::<LittleEndian>()?;

        let header = Header {
            node_type,
            keysize,
            valuesize,
            blocksize,
            rootnode,
            freelist,
            numkeys,
        };

        let body = match node_type {
            NodeType::Leaf => {
                let keys = read_keys(&mut cursor, numkeys as usize, keysize as usize)?;
                let values = read_values(&mut cursor, numkeys as usize, valuesize as usize)?;
                NodeBody::Leaf {
                    keys: SlotArray::from_vec(keys),
                    values: SlotArray::from_vec(values),
                }
            }
            NodeType::Root | NodeType::Interior => {
                let keys = read_keys(&mut cursor, numkeys as usize, keysize as usize)?;
                // The degenerate empty root (spec.md §3) has zero children
                // rather than the usual `numkeys + 1`.
                let num_children = if numkeys == 0 { 0 } else { numkeys as usize + 1 };
                let children = read_children(&mut cursor, num_children)?;
                NodeBody::Branch {
                    keys: SlotArray::from_vec(keys),
                    children: SlotArray::from_vec(children),
                }
            }
            NodeType::Superblock => NodeBody::Superblock,
            NodeType::Unallocated => NodeBody::Unallocated,
        };

        Ok(Node { header, body })
    }
}

fn read_keys(cursor: &mut Cursor<&[u8]>, count: usize, keysize: usize) -> Result<Vec<Key>> {
    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        let mut buf = vec![0u8; keysize];
        cursor.read_exact(&mut buf)?;
        keys.push(Key::new(buf));
    }
    Ok(keys)
}

fn read_values(cursor: &mut Cursor<&[u8]>, count: usize, valuesize: usize) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let mut buf = vec![0u8; valuesize];
        cursor.read_exact(&mut buf)?;
        values.push(Value::new(buf));
    }
    Ok(values)
}

fn read_children(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<BlockId>> {
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        children.push(cursor.read_u64::<LittleEndian>()?);
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn template(blocksize: u32) -> Header {
        Header {
            node_type: NodeType::Leaf,
            keysize: 2,
            valuesize: 2,
            blocksize,
            rootnode: 1,
            freelist: 0,
            numkeys: 0,
        }
    }

    #[test]
    fn leaf_round_trips() {
        let mut node = Node::empty_leaf(&template(64));
        node.header.numkeys = 2;
        node.body = NodeBody::Leaf {
            keys: SlotArray::from_vec(vec![Key::new(b"A0".to_vec()), Key::new(b"A1".to_vec())]),
            values: SlotArray::from_vec(vec![
                Value::new(b"00".to_vec()),
                Value::new(b"11".to_vec()),
            ]),
        };
        let bytes = node.pack().unwrap();
        assert_eq!(bytes.len(), 64);
        let back = Node::unpack(&bytes).unwrap();
        assert_eq!(back.header.numkeys, 2);
        assert_eq!(back.get_key(0).unwrap().as_bytes(), b"A0");
        assert_eq!(back.get_value(1).unwrap().as_bytes(), b"11");
    }

    #[test]
    fn branch_round_trips_with_one_more_child_than_keys() {
        let mut header = template(64);
        header.node_type = NodeType::Interior;
        header.numkeys = 1;
        let node = Node {
            header,
            body: NodeBody::Branch {
                keys: SlotArray::from_vec(vec![Key::new(b"A4".to_vec())]),
                children: SlotArray::from_vec(vec![2, 3]),
            },
        };
        let bytes = node.pack().unwrap();
        let back = Node::unpack(&bytes).unwrap();
        assert_eq!(back.get_child(0).unwrap(), 2);
        assert_eq!(back.get_child(1).unwrap(), 3);
    }

    #[test]
    fn degenerate_root_has_no_children() {
        let mut header = template(64);
        header.node_type = NodeType::Root;
        header.numkeys = 0;
        let node = Node::empty_branch(NodeType::Root, &header);
        let bytes = node.pack().unwrap();
        let back = Node::unpack(&bytes).unwrap();
        assert!(back.child_index_for(&Key::new(b"AA".to_vec())).is_none());
    }
}
