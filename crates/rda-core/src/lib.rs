//! # rda-core — Foundational Types for the RDA Stack
//!
//! This crate is the bedrock of the RDA Stack. It defines the type-system
//! primitives shared by every other crate in the workspace; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Address`, `ClaimTopic`,
//!    `CountryCode`, `Salt`. No bare strings or integers for identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** ALL digest and signature input flows
//!    through `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for
//!    digests. Ever.
//!
//! 3. **Deterministic identifiers.** Account and component addresses derive
//!    from content digests, claim topics derive from label digests. The same
//!    inputs always produce the same identifiers, which is what makes
//!    from-genesis replay of a deployment reproducible.
//!
//! 4. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rda-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use address::{Address, ClaimTopic, CountryCode, Salt};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use temporal::Timestamp;
