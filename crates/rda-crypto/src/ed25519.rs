//! # Ed25519 Signing and Verification
//!
//! Key generation, signing, and verification for claim issuance.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`; there is no way to sign raw
//!   bytes, so a signature can only cover one deterministic encoding.
//! - Private keys are never serialized or logged. [`SigningKey`] does not
//!   implement `Serialize` and its `Debug` output is redacted.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings.

use ed25519_dalek::{Signer, Verifier};
use rda_core::CanonicalBytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;

/// An Ed25519 key pair for signing operations.
///
/// Does not implement `Serialize`; private keys must not leak into logs,
/// artifacts, or responses.
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// An Ed25519 public key (32 bytes) for signature verification.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VerifyingKey([u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

// ---------------------------------------------------------------------------
// SigningKey
// ---------------------------------------------------------------------------

impl SigningKey {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Construct from a raw 32-byte seed. Deterministic: the same seed
    /// yields the same key pair.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this key pair.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.inner.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.inner.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<private>)")
    }
}

// ---------------------------------------------------------------------------
// VerifyingKey
// ---------------------------------------------------------------------------

impl VerifyingKey {
    /// Create from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_decode(hex, 32).map_err(CryptoError::KeyError)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Verify a signature over canonical bytes.
    pub fn verify(
        &self,
        data: &CanonicalBytes,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(data.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(format!("ed25519: {e}")))
    }
}

impl Serialize for VerifyingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VerifyingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({}...)", hex_encode(&self.0[..4]))
    }
}

impl std::fmt::Display for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw 64 bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Parse from a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_decode(hex, 64).map_err(CryptoError::VerificationFailed)?;
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_encode(&self.0[..4]))
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(hex: &str, expected_len: usize) -> Result<Vec<u8>, String> {
    let hex = hex.trim().to_lowercase();
    if hex.len() != expected_len * 2 {
        return Err(format!(
            "expected {} hex chars, got {}",
            expected_len * 2,
            hex.len()
        ));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(value: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&value).expect("test value canonicalizes")
    }

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let data = canonical(serde_json::json!({"topic": 42, "kyc": true}));
        let sig = sk.sign(&data);
        sk.verifying_key()
            .verify(&data, &sig)
            .expect("valid signature verifies");
    }

    #[test]
    fn wrong_key_fails() {
        let sk = SigningKey::generate();
        let other = SigningKey::generate();
        let data = canonical(serde_json::json!({"x": 1}));
        let sig = sk.sign(&data);
        assert!(other.verifying_key().verify(&data, &sig).is_err());
    }

    #[test]
    fn tampered_message_fails() {
        let sk = SigningKey::generate();
        let original = canonical(serde_json::json!({"amount": 100}));
        let tampered = canonical(serde_json::json!({"amount": 101}));
        let sig = sk.sign(&original);
        assert!(sk.verifying_key().verify(&tampered, &sig).is_err());
    }

    #[test]
    fn seeded_keys_are_deterministic() {
        let seed = [7u8; 32];
        let a = SigningKey::from_seed(&seed);
        let b = SigningKey::from_seed(&seed);
        assert_eq!(a.verifying_key(), b.verifying_key());
        let data = canonical(serde_json::json!({"n": 1}));
        assert_eq!(a.sign(&data), b.sign(&data));
    }

    #[test]
    fn verifying_key_hex_roundtrip() {
        let vk = SigningKey::generate().verifying_key();
        let hex = vk.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(VerifyingKey::from_hex(&hex).unwrap(), vk);
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sk = SigningKey::generate();
        let sig = sk.sign(&canonical(serde_json::json!({"y": 2})));
        let hex = sig.to_hex();
        assert_eq!(hex.len(), 128);
        assert_eq!(Ed25519Signature::from_hex(&hex).unwrap(), sig);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let vk = SigningKey::generate().verifying_key();
        let json = serde_json::to_string(&vk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: VerifyingKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vk);
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(VerifyingKey::from_hex("abcd").is_err());
        assert!(VerifyingKey::from_hex(&"zz".repeat(32)).is_err());
        assert!(Ed25519Signature::from_hex("not-hex").is_err());
    }

    #[test]
    fn debug_never_leaks_private_key() {
        let sk = SigningKey::generate();
        assert_eq!(format!("{sk:?}"), "SigningKey(<private>)");
    }
}
