//! Content hashing for structural-sharing equality.
//!
//! §3 Lifecycle promises that "a stage returning an unchanged branch must
//! return the same object identity for that branch, enabling cheap
//! equality between revisions." Rust's ownership model makes literal
//! pointer-identity sharing awkward across a `serde`-transparent value
//! type, so the pipeline instead hashes the canonical JSON encoding of a
//! branch and compares digests — two branches with the same content
//! always compare equal in O(digest length) regardless of tree size, and
//! a cache keyed on the digest reuses an unchanged branch's prior output.

use serde::Serialize;

/// A BLAKE3 digest of a value's canonical JSON serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash any serde-serializable value.
    ///
    /// Panics only if `value` cannot be serialized at all (a programmer
    /// error — every type in this crate is serializable by construction).
    pub fn of<T: Serialize>(value: &T) -> Self {
        let bytes = serde_json::to_vec(value).expect("contract types are always serializable");
        Self(*blake3::hash(&bytes).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_hashes_equal() {
        let a = vec![1, 2, 3];
        let b = vec![1, 2, 3];
        assert_eq!(ContentHash::of(&a), ContentHash::of(&b));
    }

    #[test]
    fn different_content_hashes_differ() {
        let a = vec![1, 2, 3];
        let b = vec![1, 2, 4];
        assert_ne!(ContentHash::of(&a), ContentHash::of(&b));
    }
}
