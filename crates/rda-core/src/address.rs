//! # Domain Identifier Newtypes
//!
//! Newtype wrappers for the identifiers of the RDA Stack. Each identifier
//! is a distinct type, so an `Address` cannot be passed where a `ClaimTopic`
//! is expected and vice versa.
//!
//! ## Determinism
//!
//! None of these identifiers is random. Addresses derive from content
//! digests of their provenance (factory address, salt, component tag),
//! claim topics derive from label digests. Replaying a deployment from
//! genesis therefore reproduces the same identifiers, which downstream
//! systems rely on to precompute addresses.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::ValidationError;

/// Implements `Deserialize` for validated string newtypes by routing the
/// raw string through the type's checked parser, so invalid values are
/// rejected at deserialization time rather than silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident, $parse:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::$parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or component address.
///
/// Serializes as a 0x-prefixed lowercase hex string. The zero address is
/// the mint source and burn sink; it can never hold a registered identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used as the `from` of a mint and the `to` of a burn.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive an address from a content digest, taking the trailing 20 bytes.
    ///
    /// This is the deterministic-deployment primitive: component addresses
    /// are digests of `(factory, salt, component)` and participant identity
    /// addresses are digests of their provenance.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.bytes[12..32]);
        Self(bytes)
    }

    /// Parse an address from a 0x-prefixed 40-char hex string.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| ValidationError::InvalidAddress(format!("missing 0x prefix: {s}")))?;
        if hex.len() != 40 {
            return Err(ValidationError::InvalidAddress(format!(
                "expected 40 hex chars, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pos = i * 2;
            *byte = u8::from_str_radix(&hex[pos..pos + 2], 16).map_err(|e| {
                ValidationError::InvalidAddress(format!("invalid hex at position {pos}: {e}"))
            })?;
        }
        Ok(Self(bytes))
    }

    /// The raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render as a 0x-prefixed lowercase hex string.
    pub fn to_hex(&self) -> String {
        let body: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{body}")
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl_validating_deserialize!(Address, from_hex);

// ---------------------------------------------------------------------------
// ClaimTopic
// ---------------------------------------------------------------------------

/// An integer-identified category of required attestation (e.g. KYC).
///
/// Topic ids are stable across deployments: [`ClaimTopic::from_label`]
/// derives the id from a digest of the label, so the same label always
/// yields the same topic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ClaimTopic(u64);

impl ClaimTopic {
    /// Create a topic from an explicit numeric identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Derive a topic id from a human-readable label.
    ///
    /// The id is the big-endian u64 of the first 8 digest bytes of the
    /// canonicalized label.
    pub fn from_label(label: &str) -> Self {
        let canonical = match CanonicalBytes::new(&label) {
            Ok(c) => c,
            // A bare string always canonicalizes; keep a stable fallback anyway.
            Err(_) => return Self(0),
        };
        let digest = sha256_digest(&canonical);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.bytes[0..8]);
        Self(u64::from_be_bytes(prefix))
    }

    /// The numeric topic identifier.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClaimTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "topic:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CountryCode
// ---------------------------------------------------------------------------

/// An ISO 3166-1 numeric country code (840 = US, 826 = GB, 276 = DE).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CountryCode(u16);

impl CountryCode {
    /// Create a country code from its numeric value.
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// The numeric code.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Salt
// ---------------------------------------------------------------------------

/// A caller-supplied deployment salt.
///
/// The salt keys a suite deployment: downstream systems precompute suite
/// addresses from `(factory, salt)`, and a factory deploys at most one
/// suite per salt. Must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Salt(String);

impl Salt {
    /// Create a salt, rejecting empty or all-whitespace input.
    pub fn new(salt: impl Into<String>) -> Result<Self, ValidationError> {
        let salt = salt.into();
        if salt.trim().is_empty() {
            return Err(ValidationError::InvalidSalt(
                "salt must be non-empty".to_string(),
            ));
        }
        Ok(Self(salt))
    }

    fn parse(s: &str) -> Result<Self, ValidationError> {
        Self::new(s)
    }

    /// The salt string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl_validating_deserialize!(Salt, parse);
