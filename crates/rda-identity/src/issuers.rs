//! # Trusted Issuers Registry
//!
//! Which issuer identities are trusted, and for which claim topics. Trust
//! is consulted live during claim verification, so removing an issuer takes
//! effect immediately for all future checks.
//!
//! An issuer entry exists only while it has at least one approved topic;
//! there is no such thing as a trusted issuer with nothing to attest.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::{Address, ClaimTopic};

/// Errors from trusted-issuers registry mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustedIssuersError {
    /// Caller is not the registry owner.
    #[error("caller {caller} is not the trusted issuers registry owner")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// The issuer is already registered.
    #[error("issuer {issuer} is already trusted")]
    DuplicateIssuer {
        /// The duplicate issuer.
        issuer: Address,
    },

    /// The issuer is not registered.
    #[error("issuer {issuer} is not trusted")]
    UnknownIssuer {
        /// The missing issuer.
        issuer: Address,
    },

    /// An issuer entry must approve at least one topic.
    #[error("issuer {issuer} must be approved for at least one claim topic")]
    EmptyTopicSet {
        /// The offending issuer.
        issuer: Address,
    },
}

/// Owner-curated map from issuer address to approved claim topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedIssuersRegistry {
    owner: Address,
    issuers: BTreeMap<Address, BTreeSet<ClaimTopic>>,
}

impl TrustedIssuersRegistry {
    /// Create an empty registry owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            issuers: BTreeMap::new(),
        }
    }

    /// Trust an issuer for a set of topics. Owner-gated; the topic set must
    /// be non-empty.
    pub fn add_trusted_issuer(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: Vec<ClaimTopic>,
    ) -> Result<(), TrustedIssuersError> {
        self.require_owner(caller)?;
        if topics.is_empty() {
            return Err(TrustedIssuersError::EmptyTopicSet { issuer });
        }
        if self.issuers.contains_key(&issuer) {
            return Err(TrustedIssuersError::DuplicateIssuer { issuer });
        }
        tracing::info!(%issuer, topics = topics.len(), "trusted issuer added");
        self.issuers.insert(issuer, topics.into_iter().collect());
        Ok(())
    }

    /// Replace an issuer's approved topic set. Owner-gated.
    pub fn update_issuer_topics(
        &mut self,
        caller: Address,
        issuer: Address,
        topics: Vec<ClaimTopic>,
    ) -> Result<(), TrustedIssuersError> {
        self.require_owner(caller)?;
        if topics.is_empty() {
            return Err(TrustedIssuersError::EmptyTopicSet { issuer });
        }
        match self.issuers.get_mut(&issuer) {
            Some(existing) => {
                *existing = topics.into_iter().collect();
                Ok(())
            }
            None => Err(TrustedIssuersError::UnknownIssuer { issuer }),
        }
    }

    /// Remove an issuer entirely. Owner-gated.
    pub fn remove_trusted_issuer(
        &mut self,
        caller: Address,
        issuer: &Address,
    ) -> Result<(), TrustedIssuersError> {
        self.require_owner(caller)?;
        if self.issuers.remove(issuer).is_none() {
            return Err(TrustedIssuersError::UnknownIssuer { issuer: *issuer });
        }
        tracing::info!(%issuer, "trusted issuer removed");
        Ok(())
    }

    /// Whether the issuer is trusted for any topic.
    pub fn is_trusted(&self, issuer: &Address) -> bool {
        self.issuers.contains_key(issuer)
    }

    /// Whether the issuer is currently trusted for the given topic.
    pub fn has_topic(&self, issuer: &Address, topic: ClaimTopic) -> bool {
        self.issuers
            .get(issuer)
            .is_some_and(|topics| topics.contains(&topic))
    }

    /// All issuers trusted for a topic.
    pub fn issuers_for(&self, topic: ClaimTopic) -> Vec<Address> {
        self.issuers
            .iter()
            .filter(|(_, topics)| topics.contains(&topic))
            .map(|(issuer, _)| *issuer)
            .collect()
    }

    /// All trusted issuers.
    pub fn trusted_issuers(&self) -> Vec<Address> {
        self.issuers.keys().copied().collect()
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
    ) -> Result<(), TrustedIssuersError> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    fn require_owner(&self, caller: Address) -> Result<(), TrustedIssuersError> {
        if caller != self.owner {
            return Err(TrustedIssuersError::Unauthorized { caller });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn kyc() -> ClaimTopic {
        ClaimTopic::from_label("KYC_CLAIM")
    }

    fn aml() -> ClaimTopic {
        ClaimTopic::from_label("AML_CLAIM")
    }

    #[test]
    fn add_and_query() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        registry
            .add_trusted_issuer(addr(0x01), addr(0x11), vec![kyc()])
            .unwrap();
        assert!(registry.is_trusted(&addr(0x11)));
        assert!(registry.has_topic(&addr(0x11), kyc()));
        assert!(!registry.has_topic(&addr(0x11), aml()));
        assert_eq!(registry.issuers_for(kyc()), vec![addr(0x11)]);
    }

    #[test]
    fn empty_topic_set_rejected() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        assert!(matches!(
            registry.add_trusted_issuer(addr(0x01), addr(0x11), vec![]),
            Err(TrustedIssuersError::EmptyTopicSet { .. })
        ));
        registry
            .add_trusted_issuer(addr(0x01), addr(0x11), vec![kyc()])
            .unwrap();
        assert!(matches!(
            registry.update_issuer_topics(addr(0x01), addr(0x11), vec![]),
            Err(TrustedIssuersError::EmptyTopicSet { .. })
        ));
    }

    #[test]
    fn duplicate_issuer_rejected() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        registry
            .add_trusted_issuer(addr(0x01), addr(0x11), vec![kyc()])
            .unwrap();
        assert!(matches!(
            registry.add_trusted_issuer(addr(0x01), addr(0x11), vec![aml()]),
            Err(TrustedIssuersError::DuplicateIssuer { .. })
        ));
    }

    #[test]
    fn update_replaces_topic_set() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        registry
            .add_trusted_issuer(addr(0x01), addr(0x11), vec![kyc()])
            .unwrap();
        registry
            .update_issuer_topics(addr(0x01), addr(0x11), vec![aml()])
            .unwrap();
        assert!(!registry.has_topic(&addr(0x11), kyc()));
        assert!(registry.has_topic(&addr(0x11), aml()));
    }

    #[test]
    fn removal_takes_effect() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        registry
            .add_trusted_issuer(addr(0x01), addr(0x11), vec![kyc()])
            .unwrap();
        registry.remove_trusted_issuer(addr(0x01), &addr(0x11)).unwrap();
        assert!(!registry.is_trusted(&addr(0x11)));
        assert!(matches!(
            registry.remove_trusted_issuer(addr(0x01), &addr(0x11)),
            Err(TrustedIssuersError::UnknownIssuer { .. })
        ));
    }

    #[test]
    fn non_owner_rejected() {
        let mut registry = TrustedIssuersRegistry::new(addr(0x01));
        assert!(matches!(
            registry.add_trusted_issuer(addr(0x02), addr(0x11), vec![kyc()]),
            Err(TrustedIssuersError::Unauthorized { .. })
        ));
    }
}
