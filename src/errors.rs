//! Centralized error type for the engine.
//!
//! A single `Error`/`ErrorKind` pair covers every public operation, the way
//! `betree_storage_stack::data_management::errors` centralizes its own
//! engine-wide error rather than scattering one error enum per module.

pub use error_chain::bail;

error_chain::error_chain! {
    errors {
        /// Probe key absent from the tree.
        NotFound {
            description("key not found")
            display("key not found")
        }
        /// `Insert` of a key that already exists. The design does not update
        /// on insert; callers wanting that must call `Update` explicitly.
        DuplicateKey {
            description("key already exists")
            display("key already exists")
        }
        /// The free chain is exhausted; no block is available to allocate.
        NoSpace {
            description("free list exhausted, no block available")
            display("free list exhausted, no block available")
        }
        /// A codec accessor was asked for a slot outside the node's range.
        /// This is a programmer error, never a user-triggerable one.
        InvalidSlot(slot: usize, numkeys: u32) {
            description("slot index out of range for node")
            display("slot {} out of range (numkeys = {})", slot, numkeys)
        }
        /// The sanity audit found a structural invariant violation.
        Structural(detail: String) {
            description("structural invariant violated")
            display("structural invariant violated: {}", detail)
        }
        /// `Delete`, which this design leaves unimplemented.
        Unimplemented(op: &'static str) {
            description("operation not implemented")
            display("operation not implemented: {}", op)
        }
        /// A block was typed as something other than root/interior/leaf
        /// where one of those was required. Should be unreachable.
        Insane(detail: String) {
            description("encountered an impossible node variant")
            display("insane: {}", detail)
        }
    }

    foreign_links {
        Io(::std::io::Error);
    }
}
