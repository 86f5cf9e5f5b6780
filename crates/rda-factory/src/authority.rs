//! # Implementation Authority
//!
//! A versioned pointer to the implementation bundle a deployed suite
//! delegates to. Versions are identified by a semantic-version triple and
//! map to a fixed bundle of six implementation addresses.
//!
//! ## Immutability
//!
//! A version's bundle cannot be edited or deleted after it is added.
//! Upgrades append a new version and advance the current pointer, so
//! proxies deployed against an older version keep resolving the exact code
//! they were deployed against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::Address;

/// A semantic version triple identifying one implementation bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl Version {
    /// Create a version triple.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The six implementation addresses one version binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationBundle {
    /// Token implementation.
    pub token: Address,
    /// Claim topics registry implementation.
    pub claim_topics_registry: Address,
    /// Identity registry implementation.
    pub identity_registry: Address,
    /// Identity registry storage implementation.
    pub identity_registry_storage: Address,
    /// Trusted issuers registry implementation.
    pub trusted_issuers_registry: Address,
    /// Compliance engine implementation.
    pub compliance: Address,
}

/// Errors from implementation-authority operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// Caller is not the authority owner.
    #[error("caller {caller} is not the implementation authority owner")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// This version triple was already added.
    #[error("version {version} already exists")]
    DuplicateVersion {
        /// The duplicate version.
        version: Version,
    },

    /// This version triple was never added.
    #[error("version {version} is unknown")]
    UnknownVersion {
        /// The missing version.
        version: Version,
    },
}

/// The append-only version table with its current pointer.
#[derive(Debug, Clone)]
pub struct ImplementationAuthority {
    owner: Address,
    versions: BTreeMap<Version, ImplementationBundle>,
    current: Option<Version>,
}

impl ImplementationAuthority {
    /// Create an empty authority owned by `owner`. No version is current
    /// until one is added and selected.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            versions: BTreeMap::new(),
            current: None,
        }
    }

    /// Append a version. Owner-gated; the triple must be new, and the
    /// bundle is immutable from this point on.
    pub fn add_version(
        &mut self,
        caller: Address,
        version: Version,
        bundle: ImplementationBundle,
    ) -> Result<(), AuthorityError> {
        self.require_owner(caller)?;
        if self.versions.contains_key(&version) {
            return Err(AuthorityError::DuplicateVersion { version });
        }
        tracing::info!(%version, "implementation version added");
        self.versions.insert(version, bundle);
        Ok(())
    }

    /// Advance the current pointer to a previously-added version.
    /// Owner-gated.
    pub fn use_version(&mut self, caller: Address, version: Version) -> Result<(), AuthorityError> {
        self.require_owner(caller)?;
        if !self.versions.contains_key(&version) {
            return Err(AuthorityError::UnknownVersion { version });
        }
        tracing::info!(%version, "implementation version selected");
        self.current = Some(version);
        Ok(())
    }

    /// Append a version and make it current in one step.
    pub fn add_and_use_version(
        &mut self,
        caller: Address,
        version: Version,
        bundle: ImplementationBundle,
    ) -> Result<(), AuthorityError> {
        self.add_version(caller, version, bundle)?;
        self.use_version(caller, version)
    }

    /// The current version, if one is selected.
    pub fn current_version(&self) -> Option<Version> {
        self.current
    }

    /// The bundle of the current version.
    pub fn current_bundle(&self) -> Option<&ImplementationBundle> {
        self.current.and_then(|v| self.versions.get(&v))
    }

    /// The bundle of a specific version.
    pub fn bundle_of(&self, version: &Version) -> Option<&ImplementationBundle> {
        self.versions.get(version)
    }

    /// All versions, ascending.
    pub fn versions(&self) -> Vec<Version> {
        self.versions.keys().copied().collect()
    }

    /// The authority owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    fn require_owner(&self, caller: Address) -> Result<(), AuthorityError> {
        if caller != self.owner {
            return Err(AuthorityError::Unauthorized { caller });
        }
        Ok(())
    }
}
