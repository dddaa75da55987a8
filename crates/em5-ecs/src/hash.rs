//! Name hashes.
//!
//! State and activity identifiers are 32-bit hashes of their names. The hash
//! is the first four bytes (little endian) of the BLAKE3 digest of the UTF-8
//! name, so it is stable across platforms and runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit hash of a name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StringHash(u32);

impl StringHash {
    /// Hash `name`.
    pub fn new(name: &str) -> Self {
        let digest = blake3::hash(name.as_bytes());
        let bytes = digest.as_bytes();
        Self(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Wrap an already computed hash.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<&str> for StringHash {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({:#010x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_distinguishes_names() {
        assert_eq!(StringHash::new("IDLE"), StringHash::new("IDLE"));
        assert_ne!(StringHash::new("IDLE"), StringHash::new("FLEE"));
        assert_eq!(StringHash::from("IDLE"), StringHash::new("IDLE"));
    }

    #[test]
    fn raw_roundtrip() {
        let h = StringHash::new("walk");
        assert_eq!(StringHash::from_raw(h.raw()), h);
    }
}
