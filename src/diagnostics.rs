//! Diagnostics (C6, spec.md §4.6): depth-first pretty-printing in three
//! formats, and a read-only structural sanity audit.

use std::collections::HashSet;
use std::io::{self, Write};

use itertools::Itertools;

use crate::block_store::BlockStore;
use crate::errors::*;
use crate::node::{Node, NodeBody, NodeType};
use crate::BlockId;

/// The three output formats `Display` supports (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// One node per line, depth-first.
    Depth,
    /// GraphViz DOT, wrapped in `digraph tree { ... }`.
    DepthDot,
    /// Leaf key/value pairs only, in ascending key order.
    SortedKeyVal,
}

pub(crate) fn display<B: BlockStore, W: Write>(
    store: &B,
    root_block: BlockId,
    mode: DisplayMode,
    out: &mut W,
) -> Result<()> {
    if mode == DisplayMode::DepthDot {
        writeln!(out, "digraph tree {{")?;
    }
    display_internal(store, root_block, mode, out)?;
    if mode == DisplayMode::DepthDot {
        writeln!(out, "}}")?;
    }
    Ok(())
}

fn display_internal<B: BlockStore, W: Write>(
    store: &B,
    block: BlockId,
    mode: DisplayMode,
    out: &mut W,
) -> Result<()> {
    let node = Node::unpack(&store.read_block(block)?)?;
    print_node(block, &node, mode, out)?;

    match &node.body {
        NodeBody::Branch { children, .. } => {
            for (idx, &child) in children.iter().enumerate() {
                if mode == DisplayMode::DepthDot {
                    writeln!(out, "{} -> {};", block, child)?;
                }
                let _ = idx;
                display_internal(store, child, mode, out)?;
            }
        }
        NodeBody::Leaf { .. } => {}
        other => bail!(ErrorKind::Insane(format!(
            "display encountered non-tree node {:?} at block {}",
            std::mem::discriminant(other),
            block
        ))),
    }
    Ok(())
}

fn print_node<W: Write>(block: BlockId, node: &Node, mode: DisplayMode, out: &mut W) -> io::Result<()> {
    match mode {
        DisplayMode::SortedKeyVal => {
            if let NodeBody::Leaf { keys, values } = &node.body {
                for (key, value) in keys.iter().zip(values.iter()) {
                    writeln!(out, "({},{})", key.render(), value.render())?;
                }
            }
        }
        DisplayMode::Depth => {
            write!(out, "{}: ", block)?;
            write_summary(node, out)?;
            writeln!(out)?;
        }
        DisplayMode::DepthDot => {
            write!(out, "{} [ label=\"{}: ", block, block)?;
            write_summary(node, out)?;
            writeln!(out, "\" ];")?;
        }
    }
    Ok(())
}

fn write_summary<W: Write>(node: &Node, out: &mut W) -> io::Result<()> {
    match &node.body {
        NodeBody::Branch { keys, children } => {
            write!(out, "Interior: ")?;
            for (idx, child) in children.iter().enumerate() {
                write!(out, "*{} ", child)?;
                if let Some(key) = keys.get(idx) {
                    write!(out, "{} ", key.render())?;
                }
            }
        }
        NodeBody::Leaf { keys, values } => {
            write!(out, "Leaf: ")?;
            for (key, value) in keys.iter().zip(values.iter()) {
                write!(out, "({},{}) ", key.render(), value.render())?;
            }
        }
        NodeBody::Superblock => write!(out, "Superblock")?,
        NodeBody::Unallocated => write!(out, "Unallocated")?,
    }
    Ok(())
}

/// Read-only structural audit (spec.md §4.6, §8 invariants 1-4). Fatal
/// violations short-circuit with the first `Structural` error found;
/// richer accounting checks spec.md explicitly allows reporting as
/// warnings are logged via `log::warn!` and returned alongside success.
pub(crate) fn sanity_check<B: BlockStore>(store: &B, superblock: &Node) -> Result<Vec<String>> {
    let mut reachable = HashSet::new();
    let mut leaf_key_count: u64 = 0;
    audit_reachable(
        store,
        superblock.header.rootnode,
        &mut reachable,
        &mut leaf_key_count,
    )?;

    let mut warnings = Vec::new();

    let mut free_chain = HashSet::new();
    let mut cursor = superblock.header.freelist;
    while cursor != crate::NIL {
        if !free_chain.insert(cursor) {
            warnings.push(format!("free chain cycles back to block {}", cursor));
            break;
        }
        let node = Node::unpack(&store.read_block(cursor)?)?;
        if node.header.node_type != NodeType::Unallocated {
            bail!(ErrorKind::Structural(format!(
                "free chain entry {} is not typed unallocated",
                cursor
            )));
        }
        cursor = node.header.freelist;
    }

    let overlap: Vec<_> = reachable.intersection(&free_chain).collect();
    if !overlap.is_empty() {
        bail!(ErrorKind::Structural(format!(
            "blocks {:?} are both reachable tree nodes and on the free chain",
            overlap
        )));
    }

    let total = store.num_blocks();
    let accounted = reachable.len() as u64 + free_chain.len() as u64 + 1; // + superblock
    if accounted != total {
        warnings.push(format!(
            "{} of {} blocks are neither reachable, free-chained, nor the superblock",
            total.saturating_sub(accounted),
            total
        ));
    }

    if u64::from(superblock.header.numkeys) != leaf_key_count {
        warnings.push(format!(
            "superblock numkeys ({}) disagrees with the {} keys actually reachable in leaves",
            superblock.header.numkeys, leaf_key_count
        ));
    }

    for warning in &warnings {
        warn!("sanity_check: {}", warning);
    }

    Ok(warnings)
}

fn audit_reachable<B: BlockStore>(
    store: &B,
    block: BlockId,
    reachable: &mut HashSet<BlockId>,
    leaf_key_count: &mut u64,
) -> Result<()> {
    if !reachable.insert(block) {
        bail!(ErrorKind::Structural(format!(
            "block {} is reachable via more than one path (cycle or shared ownership)",
            block
        )));
    }

    let node = Node::unpack(&store.read_block(block)?)?;
    match node.header.node_type {
        NodeType::Root | NodeType::Interior | NodeType::Leaf => {}
        other => bail!(ErrorKind::Structural(format!(
            "block {} reachable from the root is typed {:?}, not root/interior/leaf",
            block, other
        ))),
    }

    if node.numkeys() > node.header.overfull_threshold() {
        bail!(ErrorKind::Structural(format!(
            "block {} holds {} keys, exceeding the overfull threshold of {}",
            block,
            node.numkeys(),
            node.header.overfull_threshold()
        )));
    }

    match &node.body {
        NodeBody::Branch { keys, children } => {
            if keys
                .iter()
                .tuple_windows()
                .any(|(a, b)| a > b)
            {
                bail!(ErrorKind::Structural(format!(
                    "block {} has out-of-order keys",
                    block
                )));
            }
            if !children.is_empty() && children.len() != keys.len() + 1 {
                bail!(ErrorKind::Structural(format!(
                    "block {} has {} keys but {} children (expected {})",
                    block,
                    keys.len(),
                    children.len(),
                    keys.len() + 1
                )));
            }
            for &child in children.iter() {
                audit_reachable(store, child, reachable, leaf_key_count)?;
            }
        }
        NodeBody::Leaf { keys, values } => {
            if keys.iter().tuple_windows().any(|(a, b)| a > b) {
                bail!(ErrorKind::Structural(format!(
                    "block {} has out-of-order keys",
                    block
                )));
            }
            if keys.len() != values.len() {
                bail!(ErrorKind::Structural(format!(
                    "block {} has {} keys but {} values",
                    block,
                    keys.len(),
                    values.len()
                )));
            }
            *leaf_key_count += keys.len() as u64;
        }
        _ => unreachable!("node type already checked above"),
    }

    Ok(())
}
