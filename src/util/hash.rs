//! Hashing utilities for package fingerprints and derived names.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256, Sha512};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// A SHA-512 digest over named content buffers.
///
/// Buffers are fed to the hasher in name order, so the result does not depend
/// on the order in which they were collected. Names themselves are not hashed.
#[derive(Debug, Default)]
pub struct Fingerprint {
    contents: BTreeMap<String, Vec<u8>>,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint::default()
    }

    /// Register a named buffer, replacing any previous buffer of that name.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.contents.insert(name.into(), data);
        self
    }

    /// Append bytes to a named buffer, creating it if needed.
    pub fn append(&mut self, name: &str, data: &[u8]) -> &mut Self {
        self.contents
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(data);
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(&self) -> String {
        let mut hasher = Sha512::new();
        for data in self.contents.values() {
            hasher.update(data);
        }
        hex::encode(hasher.finalize())
    }
}
