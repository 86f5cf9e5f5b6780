//! # Identity Registry
//!
//! Maps wallet addresses to deployed identities and country codes, and
//! exposes the single verification predicate the token consults on every
//! balance-changing operation.
//!
//! ## Shared storage
//!
//! The wallet table lives in [`IdentityRegistryStorage`], held behind
//! `Arc<RwLock<_>>` so several token suites can share one table while each
//! keeps its own registry (with its own agents and policy registries).
//! Mutations go through the registry's agent-gated operations only; no
//! caller touches the storage directly.
//!
//! ## Verification
//!
//! [`IdentityRegistry::is_verified`] is read-only and safe to call
//! arbitrarily often. It requires every topic in the claim-topics registry
//! to be covered by a claim whose issuer is currently trusted for that
//! topic and whose signature verifies. A malformed stored claim simply does
//! not count toward verification.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::{Address, CountryCode, Timestamp};

use crate::claim::verify_claim;
use crate::identity::IdentityStore;
use crate::issuers::TrustedIssuersRegistry;
use crate::topics::ClaimTopicsRegistry;

/// Errors from identity-registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller does not hold the required role.
    #[error("caller {caller} is not authorized as {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role that was required ("agent" or "owner").
        role: &'static str,
    },

    /// The wallet already has a registry entry.
    #[error("wallet {wallet} is already registered")]
    AlreadyRegistered {
        /// The occupied wallet address.
        wallet: Address,
    },

    /// The wallet has no registry entry.
    #[error("wallet {wallet} is not registered")]
    NotRegistered {
        /// The missing wallet address.
        wallet: Address,
    },

    /// The referenced identity has no deployed record.
    #[error("identity {identity} has no deployed record")]
    InvalidIdentity {
        /// The dangling identity address.
        identity: Address,
    },
}

/// One wallet's registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Address of the wallet's deployed identity.
    pub identity: Address,
    /// ISO 3166-1 numeric country of the participant.
    pub country: CountryCode,
}

/// The wallet table: wallet address to (identity, country).
#[derive(Debug, Default)]
pub struct IdentityRegistryStorage {
    entries: std::collections::BTreeMap<Address, RegistryEntry>,
}

impl IdentityRegistryStorage {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a wallet's entry.
    pub fn entry(&self, wallet: &Address) -> Option<&RegistryEntry> {
        self.entries.get(wallet)
    }

    /// Whether a wallet has an entry.
    pub fn contains(&self, wallet: &Address) -> bool {
        self.entries.contains_key(wallet)
    }

    /// Number of registered wallets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, wallet: Address, entry: RegistryEntry) {
        self.entries.insert(wallet, entry);
    }

    fn remove(&mut self, wallet: &Address) -> Option<RegistryEntry> {
        self.entries.remove(wallet)
    }

    fn get_mut(&mut self, wallet: &Address) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(wallet)
    }
}

/// The identity registry: agent-gated wallet registration over a shared
/// storage table, plus the verification predicate.
#[derive(Debug)]
pub struct IdentityRegistry {
    owner: Address,
    agents: std::collections::BTreeSet<Address>,
    storage: Arc<RwLock<IdentityRegistryStorage>>,
    topics: Arc<RwLock<ClaimTopicsRegistry>>,
    issuers: Arc<RwLock<TrustedIssuersRegistry>>,
    identities: Arc<RwLock<IdentityStore>>,
}

impl IdentityRegistry {
    /// Create a registry bound to its storage, policy registries, and the
    /// deployed-identity store. All four are injected; the registry never
    /// constructs its own dependencies.
    pub fn new(
        owner: Address,
        storage: Arc<RwLock<IdentityRegistryStorage>>,
        topics: Arc<RwLock<ClaimTopicsRegistry>>,
        issuers: Arc<RwLock<TrustedIssuersRegistry>>,
        identities: Arc<RwLock<IdentityStore>>,
    ) -> Self {
        Self {
            owner,
            agents: std::collections::BTreeSet::new(),
            storage,
            topics,
            issuers,
            identities,
        }
    }

    // ─── Role management ─────────────────────────────────────────────

    /// Grant the agent role. Owner-gated; re-granting is a no-op.
    pub fn add_agent(&mut self, caller: Address, agent: Address) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        self.agents.insert(agent);
        Ok(())
    }

    /// Revoke the agent role. Owner-gated; revoking a non-agent is a no-op.
    pub fn remove_agent(&mut self, caller: Address, agent: &Address) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        self.agents.remove(agent);
        Ok(())
    }

    /// Whether an address holds the agent role.
    pub fn is_agent(&self, address: &Address) -> bool {
        self.agents.contains(address)
    }

    /// The registry owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Hand the registry to a new owner. Owner-gated.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    // ─── Registration ────────────────────────────────────────────────

    /// Register a wallet against a deployed identity and country.
    /// Agent-gated.
    pub fn register_identity(
        &self,
        caller: Address,
        wallet: Address,
        identity: Address,
        country: CountryCode,
    ) -> Result<(), RegistryError> {
        self.require_agent(caller)?;
        if !self.identities.read().contains(&identity) {
            return Err(RegistryError::InvalidIdentity { identity });
        }
        let mut storage = self.storage.write();
        if storage.contains(&wallet) {
            return Err(RegistryError::AlreadyRegistered { wallet });
        }
        storage.insert(wallet, RegistryEntry { identity, country });
        tracing::info!(%wallet, %identity, %country, "identity registered");
        Ok(())
    }

    /// Remove a wallet's registration. Agent-gated.
    pub fn delete_identity(&self, caller: Address, wallet: &Address) -> Result<(), RegistryError> {
        self.require_agent(caller)?;
        if self.storage.write().remove(wallet).is_none() {
            return Err(RegistryError::NotRegistered { wallet: *wallet });
        }
        tracing::info!(%wallet, "identity deregistered");
        Ok(())
    }

    /// Update a wallet's country code. Agent-gated.
    pub fn update_country(
        &self,
        caller: Address,
        wallet: &Address,
        country: CountryCode,
    ) -> Result<(), RegistryError> {
        self.require_agent(caller)?;
        let mut storage = self.storage.write();
        match storage.get_mut(wallet) {
            Some(entry) => {
                entry.country = country;
                tracing::info!(%wallet, %country, "country updated");
                Ok(())
            }
            None => Err(RegistryError::NotRegistered { wallet: *wallet }),
        }
    }

    /// Repoint a wallet at a different deployed identity. Agent-gated.
    pub fn update_identity(
        &self,
        caller: Address,
        wallet: &Address,
        identity: Address,
    ) -> Result<(), RegistryError> {
        self.require_agent(caller)?;
        if !self.identities.read().contains(&identity) {
            return Err(RegistryError::InvalidIdentity { identity });
        }
        let mut storage = self.storage.write();
        match storage.get_mut(wallet) {
            Some(entry) => {
                entry.identity = identity;
                tracing::info!(%wallet, %identity, "identity updated");
                Ok(())
            }
            None => Err(RegistryError::NotRegistered { wallet: *wallet }),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Whether a wallet has a registry entry.
    pub fn contains(&self, wallet: &Address) -> bool {
        self.storage.read().contains(wallet)
    }

    /// The identity address a wallet is registered against.
    pub fn identity_of(&self, wallet: &Address) -> Option<Address> {
        self.storage.read().entry(wallet).map(|e| e.identity)
    }

    /// The country a wallet is registered under.
    pub fn country_of(&self, wallet: &Address) -> Option<CountryCode> {
        self.storage.read().entry(wallet).map(|e| e.country)
    }

    /// Whether a wallet is verified: every required claim topic is covered
    /// by a claim from a currently-trusted issuer whose signature verifies.
    ///
    /// Read-only; mutates nothing. An unregistered wallet is never
    /// verified. With no required topics, any registered wallet is
    /// verified.
    pub fn is_verified(&self, wallet: &Address) -> bool {
        let entry = match self.storage.read().entry(wallet).copied() {
            Some(entry) => entry,
            None => return false,
        };
        let topics = self.topics.read();
        let issuers = self.issuers.read();
        let identities = self.identities.read();

        let identity = match identities.get(&entry.identity) {
            Some(identity) => identity,
            None => return false,
        };

        let now = Timestamp::now();
        topics.required_topics().iter().all(|topic| {
            identity.claims_for_topic(*topic).any(|claim| {
                matches!(
                    verify_claim(&entry.identity, claim, &issuers, &identities, now),
                    Ok(true)
                )
            })
        })
    }

    fn require_owner(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.owner {
            return Err(RegistryError::Unauthorized {
                caller,
                role: "owner",
            });
        }
        Ok(())
    }

    fn require_agent(&self, caller: Address) -> Result<(), RegistryError> {
        if !self.agents.contains(&caller) {
            return Err(RegistryError::Unauthorized {
                caller,
                role: "agent",
            });
        }
        Ok(())
    }
}
