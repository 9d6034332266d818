//! A disk-resident B+ tree index: a persistent, ordered mapping from
//! fixed-width binary keys to fixed-width binary values, stored across
//! fixed-size blocks backed by an external block store.
//!
//! The entry point is [`BTreeIndex`]. It is generic over any
//! [`BlockStore`] implementation; [`MemoryBlockStore`] is provided as a
//! reference implementation to build and test against.
//!
//! ```
//! use bptree_storage_stack::{BTreeIndex, MemoryBlockStore};
//!
//! let store = MemoryBlockStore::new(64, 32);
//! let mut index = BTreeIndex::new(2, 2, store);
//! index.attach(0, true).unwrap();
//! index.insert(b"AA".to_vec(), b"11".to_vec()).unwrap();
//! assert_eq!(index.lookup(b"AA").unwrap().as_bytes(), b"11");
//! ```

#[macro_use]
extern crate log;

pub mod block_store;
mod descent;
pub mod diagnostics;
pub mod errors;
mod freelist;
mod index;
pub mod key_value;
mod mutation;
pub mod node;

pub use block_store::{BlockStore, MemoryBlockStore};
pub use diagnostics::DisplayMode;
pub use index::BTreeIndex;
pub use key_value::{Key, Value};

/// Initializes `env_logger` from `RUST_LOG`. Call once, e.g. at the start
/// of a binary or test harness that embeds this crate; the engine itself
/// never calls this, since a library must not install a global logger on
/// a caller's behalf.
#[cfg(feature = "init_env_logger")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// An index into the block store. `0` is the sentinel ("nil") value used to
/// terminate the free chain (spec.md §3).
pub type BlockId = u64;

/// The sentinel block number; never a valid node.
pub const NIL: BlockId = 0;

/// The superblock always lives at block 0.
pub const SUPERBLOCK_BLOCK: BlockId = 0;

/// The initial root node lives at block 1, right after the superblock.
pub const INITIAL_ROOT_BLOCK: BlockId = 1;
