//! Cache key fingerprints.
//!
//! A fingerprint is a stable digest of an operation name and its named
//! parameters: same operation and semantically-equal parameters (after
//! case/whitespace normalization) always produce the same key, regardless of
//! the order parameters were added in.

use std::fmt;

use sha2::{Digest, Sha256};

/// Deterministic string identifier of a cacheable operation instance.
///
/// Carries the operation name it was built for, so store-level admin
/// operations (clear, report) can be scoped to one policy's entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    operation: &'static str,
    digest: String,
}

impl Fingerprint {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn as_str(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

/// Builds a [`Fingerprint`] from an operation name and named parameters.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    operation: &'static str,
    params: Vec<(&'static str, String)>,
}

impl KeyBuilder {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            params: Vec::new(),
        }
    }

    /// Adds a normalized (trimmed, lowercased) string parameter.
    pub fn param(mut self, name: &'static str, value: &str) -> Self {
        self.params.push((name, value.trim().to_lowercase()));
        self
    }

    /// Digest of `operation:name1=value1:name2=value2:...` with parameters
    /// sorted by name, truncated to 128 bits and hex-encoded. Truncation
    /// bounds key length; collisions remain overwhelmingly improbable.
    pub fn build(mut self) -> Fingerprint {
        self.params.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        hasher.update(self.operation.as_bytes());
        for (name, value) in &self.params {
            hasher.update(b":");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        let digest = hasher.finalize();
        Fingerprint {
            operation: self.operation,
            digest: hex::encode(&digest[..16]),
        }
    }
}
