//! # rda-factory — Versioned Suite Deployment
//!
//! Two pieces turn the individual components into a deployable product:
//!
//! - [`ImplementationAuthority`] — an append-only table of implementation
//!   versions. Each version binds six implementation addresses; once added,
//!   a bundle is immutable and can only be superseded, never edited, so a
//!   deployed suite can never be silently repointed at different code.
//! - [`SuiteFactory`] — deploys one fully-wired suite (token + registries +
//!   compliance) per salt, at addresses derived deterministically from
//!   `(factory, salt, component)`. Deployment is all-or-nothing and salts
//!   are single-use.

pub mod authority;
pub mod factory;

// ─── Authority re-exports ────────────────────────────────────────────

pub use authority::{AuthorityError, ImplementationAuthority, ImplementationBundle, Version};

// ─── Factory re-exports ──────────────────────────────────────────────

pub use factory::{
    ClaimConfig, FactoryError, IssuerTrust, Suite, SuiteAddresses, SuiteFactory, TokenConfig,
};
