//! # Identity Records
//!
//! An [`Identity`] is the per-participant record: a management address,
//! purpose-tagged verifying keys, the claims attached to the participant,
//! and (for issuer identities) the set of revoked claim signatures.
//!
//! ## Canonical claim per topic
//!
//! At most one claim per `(topic, issuer)` pair is stored; adding another
//! replaces it. Claims from different issuers for the same topic coexist,
//! and verification scans all of them, so one issuer losing trust does not
//! invalidate a participant attested by another.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::{Address, ClaimTopic, Timestamp};
use rda_crypto::VerifyingKey;

use crate::claim::Claim;

// ─── Key purposes ────────────────────────────────────────────────────

/// The purpose a key is authorized for on an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyPurpose {
    /// May manage the identity itself (add/remove keys and claims).
    Management = 1,
    /// May act on behalf of the identity in external operations.
    Action = 2,
    /// May sign claims issued by this identity.
    ClaimSigner = 3,
}

impl std::fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Management => "MANAGEMENT",
            Self::Action => "ACTION",
            Self::ClaimSigner => "CLAIM_SIGNER",
        };
        f.write_str(s)
    }
}

/// A verifying key held by an identity, tagged with its purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityKey {
    /// What the key is authorized for.
    pub purpose: KeyPurpose,
    /// The public key.
    pub key: VerifyingKey,
    /// When the key was added.
    pub added_at: Timestamp,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from identity mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Caller does not hold the management role on this identity.
    #[error("caller {caller} is not the management address of identity {identity}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The identity being mutated.
        identity: Address,
    },

    /// The referenced key is not held by this identity.
    #[error("key not found on identity {identity}")]
    KeyNotFound {
        /// The identity that was searched.
        identity: Address,
    },

    /// No claim exists for the given topic and issuer.
    #[error("no claim for {topic} from issuer {issuer}")]
    ClaimNotFound {
        /// Topic searched for.
        topic: ClaimTopic,
        /// Issuer searched for.
        issuer: Address,
    },

    /// An identity already exists at this address.
    #[error("identity already deployed at {address}")]
    AlreadyDeployed {
        /// The occupied address.
        address: Address,
    },
}

// ─── Identity ────────────────────────────────────────────────────────

/// A per-participant identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    address: Address,
    management: Address,
    keys: Vec<IdentityKey>,
    claims: Vec<Claim>,
    revoked_signatures: BTreeSet<String>,
}

impl Identity {
    /// Create an identity at `address` controlled by `management`.
    pub fn new(address: Address, management: Address) -> Self {
        Self {
            address,
            management,
            keys: Vec::new(),
            claims: Vec::new(),
            revoked_signatures: BTreeSet::new(),
        }
    }

    /// The identity's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The management address controlling this identity.
    pub fn management(&self) -> &Address {
        &self.management
    }

    /// Add a key with the given purpose. Management-gated.
    pub fn add_key(
        &mut self,
        caller: Address,
        key: VerifyingKey,
        purpose: KeyPurpose,
    ) -> Result<(), IdentityError> {
        self.require_management(caller)?;
        // Re-adding the same key with the same purpose is a no-op.
        if !self
            .keys
            .iter()
            .any(|k| k.key == key && k.purpose == purpose)
        {
            self.keys.push(IdentityKey {
                purpose,
                key,
                added_at: Timestamp::now(),
            });
        }
        Ok(())
    }

    /// Remove a key for a purpose. Management-gated.
    pub fn remove_key(
        &mut self,
        caller: Address,
        key: &VerifyingKey,
        purpose: KeyPurpose,
    ) -> Result<(), IdentityError> {
        self.require_management(caller)?;
        let before = self.keys.len();
        self.keys.retain(|k| !(k.key == *key && k.purpose == purpose));
        if self.keys.len() == before {
            return Err(IdentityError::KeyNotFound {
                identity: self.address,
            });
        }
        Ok(())
    }

    /// All keys held for a purpose.
    pub fn keys_with_purpose(&self, purpose: KeyPurpose) -> impl Iterator<Item = &VerifyingKey> {
        self.keys
            .iter()
            .filter(move |k| k.purpose == purpose)
            .map(|k| &k.key)
    }

    /// The claim-signer keys of this identity.
    pub fn claim_signer_keys(&self) -> impl Iterator<Item = &VerifyingKey> {
        self.keys_with_purpose(KeyPurpose::ClaimSigner)
    }

    /// Attach a claim to this identity. Management-gated.
    ///
    /// A claim with the same `(topic, issuer)` pair replaces the existing
    /// one; there is one canonical claim per pair.
    pub fn add_claim(&mut self, caller: Address, claim: Claim) -> Result<(), IdentityError> {
        self.require_management(caller)?;
        self.claims
            .retain(|c| !(c.topic == claim.topic && c.issuer == claim.issuer));
        tracing::info!(
            identity = %self.address,
            topic = %claim.topic,
            issuer = %claim.issuer,
            "claim added"
        );
        self.claims.push(claim);
        Ok(())
    }

    /// Remove the claim for a `(topic, issuer)` pair. Management-gated.
    pub fn remove_claim(
        &mut self,
        caller: Address,
        topic: ClaimTopic,
        issuer: &Address,
    ) -> Result<(), IdentityError> {
        self.require_management(caller)?;
        let before = self.claims.len();
        self.claims
            .retain(|c| !(c.topic == topic && c.issuer == *issuer));
        if self.claims.len() == before {
            return Err(IdentityError::ClaimNotFound {
                topic,
                issuer: *issuer,
            });
        }
        Ok(())
    }

    /// All claims for a topic, across issuers.
    pub fn claims_for_topic(&self, topic: ClaimTopic) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(move |c| c.topic == topic)
    }

    /// All claims on this identity.
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Revoke a claim this identity issued, by signature hex.
    /// Management-gated; affects all future verifications of that claim.
    pub fn revoke_claim(
        &mut self,
        caller: Address,
        signature_hex: String,
    ) -> Result<(), IdentityError> {
        self.require_management(caller)?;
        tracing::info!(issuer = %self.address, "claim revoked");
        self.revoked_signatures.insert(signature_hex);
        Ok(())
    }

    /// Whether this identity has revoked the given claim signature.
    pub fn is_revoked(&self, signature_hex: &str) -> bool {
        self.revoked_signatures.contains(signature_hex)
    }

    fn require_management(&self, caller: Address) -> Result<(), IdentityError> {
        if caller != self.management {
            return Err(IdentityError::Unauthorized {
                caller,
                identity: self.address,
            });
        }
        Ok(())
    }
}

// ─── IdentityStore ───────────────────────────────────────────────────

/// The deployed-identity address space.
///
/// Maps identity addresses to their records. A wallet registration whose
/// identity address is absent from the store is rejected, the in-process
/// equivalent of pointing a registry at an address with no deployed code.
#[derive(Debug, Default)]
pub struct IdentityStore {
    identities: std::collections::BTreeMap<Address, Identity>,
}

impl IdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy an identity. Fails if the address is occupied; identities are
    /// deployed once per participant and persist for the participant's
    /// lifetime.
    pub fn insert(&mut self, identity: Identity) -> Result<(), IdentityError> {
        let address = *identity.address();
        if self.identities.contains_key(&address) {
            return Err(IdentityError::AlreadyDeployed { address });
        }
        self.identities.insert(address, identity);
        Ok(())
    }

    /// Look up an identity by address.
    pub fn get(&self, address: &Address) -> Option<&Identity> {
        self.identities.get(address)
    }

    /// Mutable lookup, for key/claim management.
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Identity> {
        self.identities.get_mut(address)
    }

    /// Whether an identity is deployed at the address.
    pub fn contains(&self, address: &Address) -> bool {
        self.identities.contains_key(address)
    }

    /// Number of deployed identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rda_crypto::SigningKey;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn kyc() -> ClaimTopic {
        ClaimTopic::from_label("KYC_CLAIM")
    }

    fn make_claim(issuer: Address, topic: ClaimTopic) -> Claim {
        let key = SigningKey::generate();
        Claim::issue(
            &key,
            issuer,
            &addr(0x22),
            topic,
            serde_json::json!({"ok": true}),
            "",
            None,
        )
        .unwrap()
    }

    #[test]
    fn management_gates_key_mutation() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        let key = SigningKey::generate().verifying_key();
        let err = identity
            .add_key(addr(0x02), key.clone(), KeyPurpose::ClaimSigner)
            .unwrap_err();
        assert!(matches!(err, IdentityError::Unauthorized { .. }));
        identity
            .add_key(addr(0x01), key, KeyPurpose::ClaimSigner)
            .unwrap();
        assert_eq!(identity.claim_signer_keys().count(), 1);
    }

    #[test]
    fn duplicate_key_add_is_noop() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        let key = SigningKey::generate().verifying_key();
        identity
            .add_key(addr(0x01), key.clone(), KeyPurpose::ClaimSigner)
            .unwrap();
        identity
            .add_key(addr(0x01), key, KeyPurpose::ClaimSigner)
            .unwrap();
        assert_eq!(identity.claim_signer_keys().count(), 1);
    }

    #[test]
    fn remove_missing_key_fails() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        let key = SigningKey::generate().verifying_key();
        let err = identity
            .remove_key(addr(0x01), &key, KeyPurpose::Action)
            .unwrap_err();
        assert!(matches!(err, IdentityError::KeyNotFound { .. }));
    }

    #[test]
    fn same_issuer_same_topic_replaces() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        let issuer = addr(0x11);
        identity.add_claim(addr(0x01), make_claim(issuer, kyc())).unwrap();
        identity.add_claim(addr(0x01), make_claim(issuer, kyc())).unwrap();
        assert_eq!(identity.claims_for_topic(kyc()).count(), 1);
    }

    #[test]
    fn different_issuers_coexist() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        identity.add_claim(addr(0x01), make_claim(addr(0x11), kyc())).unwrap();
        identity.add_claim(addr(0x01), make_claim(addr(0x12), kyc())).unwrap();
        assert_eq!(identity.claims_for_topic(kyc()).count(), 2);
    }

    #[test]
    fn remove_claim_by_pair() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        let issuer = addr(0x11);
        identity.add_claim(addr(0x01), make_claim(issuer, kyc())).unwrap();
        identity.remove_claim(addr(0x01), kyc(), &issuer).unwrap();
        assert_eq!(identity.claims().len(), 0);
        let err = identity.remove_claim(addr(0x01), kyc(), &issuer).unwrap_err();
        assert!(matches!(err, IdentityError::ClaimNotFound { .. }));
    }

    #[test]
    fn revocation_is_recorded() {
        let mut identity = Identity::new(addr(0x10), addr(0x01));
        assert!(!identity.is_revoked("aabb"));
        identity.revoke_claim(addr(0x01), "aabb".to_string()).unwrap();
        assert!(identity.is_revoked("aabb"));
    }

    #[test]
    fn store_rejects_double_deploy() {
        let mut store = IdentityStore::new();
        store.insert(Identity::new(addr(0x10), addr(0x01))).unwrap();
        let err = store
            .insert(Identity::new(addr(0x10), addr(0x02)))
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyDeployed { .. }));
        assert_eq!(store.len(), 1);
        assert!(store.contains(&addr(0x10)));
    }
}
