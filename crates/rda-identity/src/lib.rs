//! # rda-identity — Identities, Claims, and Registries
//!
//! The identity layer of the RDA Stack. A participant is represented by an
//! [`Identity`] record holding purpose-tagged verifying keys and signed
//! [`Claim`]s. Three registries define the verification policy:
//!
//! - [`ClaimTopicsRegistry`] — the claim topics an identity must satisfy.
//! - [`TrustedIssuersRegistry`] — which issuers are trusted for which topics.
//! - [`IdentityRegistry`] — maps wallet addresses to identities and country
//!   codes, and exposes the single verification predicate
//!   ([`IdentityRegistry::is_verified`]) consumed by the token.
//!
//! ## Trust is re-checked live
//!
//! Claim verification consults the trusted-issuers registry at check time,
//! never at signing time. Removing an issuer's trust for a topic takes
//! effect for every subsequent check without touching stored claims, and
//! without retroactively invalidating transfers that already settled.

pub mod claim;
pub mod identity;
pub mod issuers;
pub mod registry;
pub mod topics;

// ─── Claim re-exports ────────────────────────────────────────────────

pub use claim::{verify_claim, Claim, ClaimError, SCHEME_ED25519};

// ─── Identity re-exports ─────────────────────────────────────────────

pub use identity::{Identity, IdentityError, IdentityKey, IdentityStore, KeyPurpose};

// ─── Registry re-exports ─────────────────────────────────────────────

pub use issuers::{TrustedIssuersError, TrustedIssuersRegistry};
pub use registry::{IdentityRegistry, IdentityRegistryStorage, RegistryEntry, RegistryError};
pub use topics::{ClaimTopicsError, ClaimTopicsRegistry};
