//! Fixed-width key and value buffers (spec.md §3).
//!
//! Both are immutable, owned byte buffers of a length fixed for the
//! lifetime of an index (`keysize`/`valuesize`). Ordering on `Key` is
//! strict lexicographic byte comparison — `Vec<u8>`'s derived `Ord` already
//! is byte-lexicographic, so no custom comparator is needed; `Value` is
//! opaque to the engine and carries no ordering at all.

use std::fmt;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(bytes: Vec<u8>) -> Self {
        Key(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the key for diagnostics output (spec.md §4.6). Keys are
    /// opaque fixed-width buffers; lossy UTF-8 is a reasonable default
    /// since every scenario in spec.md §8 uses printable ASCII keys.
    pub fn render(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", String::from_utf8_lossy(&self.0))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Value(Vec<u8>);

impl Value {
    pub fn new(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn render(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_lexicographically() {
        assert!(Key::new(b"AA".to_vec()) < Key::new(b"AB".to_vec()));
        assert!(Key::new(b"Z0".to_vec()) > Key::new(b"A9".to_vec()));
        assert_eq!(Key::new(b"AA".to_vec()), Key::new(b"AA".to_vec()));
    }
}
