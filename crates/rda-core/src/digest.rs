//! # Content Digest — Content-Addressed Identifiers
//!
//! Defines `ContentDigest` and `DigestAlgorithm`. Digests identify claims,
//! derive deterministic deployment addresses, and key revocation entries.
//!
//! ## Security Invariant
//!
//! A `ContentDigest` can only be computed from `CanonicalBytes`, enforced by
//! the signature of [`sha256_digest()`]. There is no digest path over raw
//! bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// The hash algorithm used to produce a content digest.
///
/// SHA-256 is the only algorithm in use; the tag exists so stored digests
/// remain self-describing if a second algorithm is ever introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 content addressing.
    Sha256,
}

impl DigestAlgorithm {
    /// The algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    ///
    /// Prefer [`sha256_digest()`] for computing digests from data.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The signature accepts only `&CanonicalBytes`, so every digest in the
/// system is over canonicalized input.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let cb = CanonicalBytes::new(&serde_json::json!({"salt": "alpha"})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn different_inputs_different_digests() {
        let a = CanonicalBytes::new(&serde_json::json!({"salt": "alpha"})).unwrap();
        let b = CanonicalBytes::new(&serde_json::json!({"salt": "beta"})).unwrap();
        assert_ne!(sha256_digest(&a), sha256_digest(&b));
    }

    #[test]
    fn hex_is_64_lowercase_chars() {
        let cb = CanonicalBytes::new(&serde_json::json!({"x": 1})).unwrap();
        let hex = sha256_hex(&cb);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn display_carries_algorithm_tag() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        let digest = sha256_digest(&cb);
        let s = digest.to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn empty_object_known_vector() {
        // SHA-256 of the two bytes "{}", cross-checked against sha256sum.
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
