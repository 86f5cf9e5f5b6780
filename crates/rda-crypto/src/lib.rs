//! # rda-crypto — Cryptographic Primitives for the RDA Stack
//!
//! Ed25519 signing and verification for identity claims. Signing and
//! verification accept only [`CanonicalBytes`](rda_core::CanonicalBytes),
//! so every signature in the system is over canonicalized input.

pub mod ed25519;
pub mod error;

// Re-export primary types.
pub use ed25519::{Ed25519Signature, SigningKey, VerifyingKey};
pub use error::CryptoError;
