//! # Suite Factory
//!
//! Deploys one complete, mutually-wired suite (token, identity registry
//! and its storage, claim-topics and trusted-issuers registries, compliance
//! engine) per salt.
//!
//! ## Determinism
//!
//! Every component address derives from `(factory, salt, component)`
//! through the canonical digest pipeline, so replaying the same deployment
//! from genesis yields the same addresses and downstream systems can
//! precompute them. A salt is single-use; re-deploying with a used salt
//! fails rather than producing a second instance.
//!
//! ## All-or-nothing
//!
//! Configuration is validated before any component is constructed, and the
//! suite is only recorded once every component is wired. A failure at any
//! point leaves no addressable, partially-wired suite behind.
//!
//! ## Wiring order
//!
//! Policy registries and storage come first, then the identity registry
//! bound to them, then the compliance engine with its modules, and the
//! token last. The token starts paused; agents unpause it once the
//! surrounding setup (trust, registrations) is complete, so its very first
//! live verification lookup already sees the full wiring.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_compliance::{ComplianceError, ModularCompliance, TransferRule};
use rda_core::{sha256_digest, Address, CanonicalBytes, CanonicalizationError, ClaimTopic, Salt};
use rda_identity::{
    ClaimTopicsError, ClaimTopicsRegistry, Identity, IdentityError, IdentityRegistry,
    IdentityRegistryStorage, IdentityStore, RegistryError, TrustedIssuersError,
    TrustedIssuersRegistry,
};
use rda_token::{Token, TokenError};

use crate::authority::{ImplementationAuthority, Version};

/// Errors from suite deployment.
#[derive(Error, Debug)]
pub enum FactoryError {
    /// This salt already produced a suite.
    #[error("salt {salt:?} already used")]
    SaltAlreadyUsed {
        /// The reused salt.
        salt: String,
    },

    /// The implementation authority has no current version selected.
    #[error("implementation authority has no current version")]
    NoActiveVersion,

    /// The deployment configuration is invalid.
    #[error("invalid suite configuration: {detail}")]
    InvalidConfig {
        /// What was invalid.
        detail: String,
    },

    /// The referenced pre-existing identity storage is unknown to this
    /// factory.
    #[error("identity storage {storage} is not known to this factory")]
    UnknownStorage {
        /// The dangling storage address.
        storage: Address,
    },

    /// Canonicalization failed while deriving component addresses.
    #[error("address derivation failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A claim-topics wiring step failed.
    #[error(transparent)]
    Topics(#[from] ClaimTopicsError),

    /// A trusted-issuers wiring step failed.
    #[error(transparent)]
    Issuers(#[from] TrustedIssuersError),

    /// An identity-registry wiring step failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A compliance wiring step failed.
    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    /// A token wiring step failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// An identity deployment failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Token-side deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Owner of every suite component after wiring completes.
    pub owner: Address,
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
    /// Address of a pre-existing identity registry storage to share;
    /// `None` deploys a fresh one.
    pub identity_storage: Option<Address>,
    /// Initial agents on the identity registry.
    pub registry_agents: Vec<Address>,
    /// Initial agents on the token.
    pub token_agents: Vec<Address>,
}

/// One issuer-to-topics trust pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerTrust {
    /// The issuer identity address.
    pub issuer: Address,
    /// The topics the issuer is trusted for.
    pub topics: Vec<ClaimTopic>,
}

/// Claim-side deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// Claim topics required for verification.
    pub claim_topics: Vec<ClaimTopic>,
    /// Initial issuer trust pairs.
    pub issuer_trust: Vec<IssuerTrust>,
}

/// The address record of one deployed suite, keyed by its salt. Emitted as
/// a single record when deployment completes.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteAddresses {
    /// The deployment salt.
    pub salt: Salt,
    /// The implementation version the suite was deployed against.
    pub version: Version,
    /// Token address.
    pub token: Address,
    /// Identity registry address.
    pub identity_registry: Address,
    /// Identity registry storage address.
    pub identity_registry_storage: Address,
    /// Trusted issuers registry address.
    pub trusted_issuers_registry: Address,
    /// Claim topics registry address.
    pub claim_topics_registry: Address,
    /// Compliance engine address.
    pub compliance: Address,
}

/// Handles to the live components of one deployed suite.
#[derive(Debug, Clone)]
pub struct Suite {
    /// The suite's address record.
    pub addresses: SuiteAddresses,
    /// The token ledger.
    pub token: Arc<RwLock<Token>>,
    /// The identity registry.
    pub identity_registry: Arc<RwLock<IdentityRegistry>>,
    /// The shared wallet table.
    pub identity_registry_storage: Arc<RwLock<IdentityRegistryStorage>>,
    /// The trusted issuers registry.
    pub trusted_issuers_registry: Arc<RwLock<TrustedIssuersRegistry>>,
    /// The claim topics registry.
    pub claim_topics_registry: Arc<RwLock<ClaimTopicsRegistry>>,
    /// The compliance engine.
    pub compliance: Arc<RwLock<ModularCompliance>>,
}

/// The suite factory. Exclusively owns suite creation: a suite instance
/// exists only by having been deployed through a factory.
#[derive(Debug)]
pub struct SuiteFactory {
    address: Address,
    authority: Arc<RwLock<ImplementationAuthority>>,
    identities: Arc<RwLock<IdentityStore>>,
    storages: BTreeMap<Address, Arc<RwLock<IdentityRegistryStorage>>>,
    suites: BTreeMap<String, Suite>,
}

impl SuiteFactory {
    /// Create a factory bound to its implementation authority and the
    /// shared deployed-identity store.
    pub fn new(
        address: Address,
        authority: Arc<RwLock<ImplementationAuthority>>,
        identities: Arc<RwLock<IdentityStore>>,
    ) -> Self {
        Self {
            address,
            authority,
            identities,
            storages: BTreeMap::new(),
            suites: BTreeMap::new(),
        }
    }

    /// The factory's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The deployed-identity store shared by this factory's suites.
    pub fn identities(&self) -> &Arc<RwLock<IdentityStore>> {
        &self.identities
    }

    /// The implementation authority this factory deploys against.
    pub fn authority(&self) -> &Arc<RwLock<ImplementationAuthority>> {
        &self.authority
    }

    /// The suite deployed under a salt, if any.
    pub fn suite(&self, salt: &Salt) -> Option<&Suite> {
        self.suites.get(salt.as_str())
    }

    /// Deploy a participant identity controlled by `management`.
    ///
    /// The identity address derives from `(factory, management)`, so each
    /// management wallet gets exactly one identity per factory; a repeat
    /// deployment fails rather than creating a duplicate.
    pub fn deploy_identity(&self, management: Address) -> Result<Address, FactoryError> {
        let canonical = CanonicalBytes::new(&serde_json::json!({
            "factory": self.address,
            "component": "identity",
            "management": management,
        }))?;
        let address = Address::from_digest(&sha256_digest(&canonical));
        self.identities
            .write()
            .insert(Identity::new(address, management))?;
        tracing::info!(%address, %management, "identity deployed");
        Ok(address)
    }

    /// Deploy one complete suite under `salt`.
    ///
    /// Validates the whole configuration first, then constructs and wires
    /// every component, and records the suite only at the end. On any
    /// failure nothing is recorded. The returned record carries all six
    /// component addresses keyed by the salt.
    ///
    /// The deployed token is paused; the configured token agents unpause
    /// it once issuer trust and registrations are in place.
    pub fn deploy_suite(
        &mut self,
        salt: Salt,
        token_config: TokenConfig,
        claim_config: ClaimConfig,
        modules: Vec<Box<dyn TransferRule>>,
    ) -> Result<SuiteAddresses, FactoryError> {
        if self.suites.contains_key(salt.as_str()) {
            return Err(FactoryError::SaltAlreadyUsed {
                salt: salt.as_str().to_string(),
            });
        }
        let version = self
            .authority
            .read()
            .current_version()
            .ok_or(FactoryError::NoActiveVersion)?;
        validate_claim_config(&claim_config)?;
        validate_modules(&modules)?;

        // Resolve storage before constructing anything.
        let reused_storage = match token_config.identity_storage {
            Some(existing) => Some((
                existing,
                self.storages
                    .get(&existing)
                    .cloned()
                    .ok_or(FactoryError::UnknownStorage { storage: existing })?,
            )),
            None => None,
        };

        let token_address = self.component_address(&salt, "token")?;
        let registry_address = self.component_address(&salt, "identity-registry")?;
        let topics_address = self.component_address(&salt, "claim-topics-registry")?;
        let issuers_address = self.component_address(&salt, "trusted-issuers-registry")?;
        let compliance_address = self.component_address(&salt, "compliance")?;
        let (storage_address, storage) = match reused_storage {
            Some((address, storage)) => (address, storage),
            None => (
                self.component_address(&salt, "identity-registry-storage")?,
                Arc::new(RwLock::new(IdentityRegistryStorage::new())),
            ),
        };

        // The factory owns each component while wiring it, then hands it
        // to the configured owner.
        let me = self.address;
        let owner = token_config.owner;

        let mut topics = ClaimTopicsRegistry::new(me);
        for topic in &claim_config.claim_topics {
            topics.add_claim_topic(me, *topic)?;
        }
        topics.transfer_ownership(me, owner)?;
        let topics = Arc::new(RwLock::new(topics));

        let mut issuers = TrustedIssuersRegistry::new(me);
        for trust in &claim_config.issuer_trust {
            issuers.add_trusted_issuer(me, trust.issuer, trust.topics.clone())?;
        }
        issuers.transfer_ownership(me, owner)?;
        let issuers = Arc::new(RwLock::new(issuers));

        let mut registry = IdentityRegistry::new(
            me,
            Arc::clone(&storage),
            Arc::clone(&topics),
            Arc::clone(&issuers),
            Arc::clone(&self.identities),
        );
        for agent in &token_config.registry_agents {
            registry.add_agent(me, *agent)?;
        }
        registry.transfer_ownership(me, owner)?;
        let registry = Arc::new(RwLock::new(registry));

        let mut compliance = ModularCompliance::new(me);
        for module in modules {
            compliance.bind_module(me, module)?;
        }
        compliance.bind_token(me, token_address)?;
        compliance.transfer_ownership(me, owner)?;
        let compliance = Arc::new(RwLock::new(compliance));

        let mut token = Token::new(
            token_address,
            token_config.name.clone(),
            token_config.symbol.clone(),
            token_config.decimals,
            me,
            Arc::clone(&registry),
            Arc::clone(&compliance),
        );
        for agent in &token_config.token_agents {
            token.add_agent(me, *agent)?;
        }
        token.transfer_ownership(me, owner)?;

        let addresses = SuiteAddresses {
            salt: salt.clone(),
            version,
            token: token_address,
            identity_registry: registry_address,
            identity_registry_storage: storage_address,
            trusted_issuers_registry: issuers_address,
            claim_topics_registry: topics_address,
            compliance: compliance_address,
        };

        tracing::info!(
            salt = salt.as_str(),
            %version,
            token = %addresses.token,
            identity_registry = %addresses.identity_registry,
            identity_registry_storage = %addresses.identity_registry_storage,
            trusted_issuers_registry = %addresses.trusted_issuers_registry,
            claim_topics_registry = %addresses.claim_topics_registry,
            compliance = %addresses.compliance,
            "suite deployed"
        );

        self.storages.insert(storage_address, Arc::clone(&storage));
        self.suites.insert(
            salt.as_str().to_string(),
            Suite {
                addresses: addresses.clone(),
                token: Arc::new(RwLock::new(token)),
                identity_registry: registry,
                identity_registry_storage: storage,
                trusted_issuers_registry: issuers,
                claim_topics_registry: topics,
                compliance,
            },
        );
        Ok(addresses)
    }

    fn component_address(&self, salt: &Salt, component: &str) -> Result<Address, FactoryError> {
        let canonical = CanonicalBytes::new(&serde_json::json!({
            "factory": self.address,
            "salt": salt.as_str(),
            "component": component,
        }))?;
        Ok(Address::from_digest(&sha256_digest(&canonical)))
    }
}

fn validate_claim_config(claim_config: &ClaimConfig) -> Result<(), FactoryError> {
    let mut seen_topics = BTreeSet::new();
    for topic in &claim_config.claim_topics {
        if !seen_topics.insert(*topic) {
            return Err(FactoryError::InvalidConfig {
                detail: format!("duplicate claim topic {topic}"),
            });
        }
    }
    let mut seen_issuers = BTreeSet::new();
    for trust in &claim_config.issuer_trust {
        if trust.topics.is_empty() {
            return Err(FactoryError::InvalidConfig {
                detail: format!("issuer {} has an empty topic set", trust.issuer),
            });
        }
        if !seen_issuers.insert(trust.issuer) {
            return Err(FactoryError::InvalidConfig {
                detail: format!("duplicate trusted issuer {}", trust.issuer),
            });
        }
    }
    Ok(())
}

fn validate_modules(modules: &[Box<dyn TransferRule>]) -> Result<(), FactoryError> {
    let mut seen = BTreeSet::new();
    for module in modules {
        if !seen.insert(module.name().to_string()) {
            return Err(FactoryError::InvalidConfig {
                detail: format!("duplicate compliance module {}", module.name()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::ImplementationBundle;
    use rda_compliance::MaxBalanceModule;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn bundle() -> ImplementationBundle {
        ImplementationBundle {
            token: addr(0x61),
            claim_topics_registry: addr(0x62),
            identity_registry: addr(0x63),
            identity_registry_storage: addr(0x64),
            trusted_issuers_registry: addr(0x65),
            compliance: addr(0x66),
        }
    }

    fn factory() -> SuiteFactory {
        let deployer = addr(0x01);
        let mut authority = ImplementationAuthority::new(deployer);
        authority
            .add_and_use_version(deployer, Version::new(4, 1, 6), bundle())
            .unwrap();
        SuiteFactory::new(
            addr(0xfa),
            Arc::new(RwLock::new(authority)),
            Arc::new(RwLock::new(IdentityStore::new())),
        )
    }

    fn token_config() -> TokenConfig {
        TokenConfig {
            owner: addr(0x05),
            name: "Regulated Asset Example".to_string(),
            symbol: "RAX".to_string(),
            decimals: 18,
            identity_storage: None,
            registry_agents: vec![addr(0x02)],
            token_agents: vec![addr(0x02)],
        }
    }

    fn claim_config() -> ClaimConfig {
        ClaimConfig {
            claim_topics: vec![ClaimTopic::from_label("KYC_CLAIM")],
            issuer_trust: vec![IssuerTrust {
                issuer: addr(0x11),
                topics: vec![ClaimTopic::from_label("KYC_CLAIM")],
            }],
        }
    }

    fn salt(s: &str) -> Salt {
        Salt::new(s).unwrap()
    }

    #[test]
    fn deploys_wired_suite() {
        let mut factory = factory();
        let addresses = factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();

        let suite = factory.suite(&salt("suite-01")).unwrap();
        let token = suite.token.read();
        assert!(token.paused(), "token deploys paused");
        assert!(token.is_agent(&addr(0x02)));
        assert_eq!(token.owner(), &addr(0x05));
        assert_eq!(token.name(), "Regulated Asset Example");

        let registry = suite.identity_registry.read();
        assert!(registry.is_agent(&addr(0x02)));
        assert_eq!(registry.owner(), &addr(0x05));

        assert!(suite
            .claim_topics_registry
            .read()
            .is_required(ClaimTopic::from_label("KYC_CLAIM")));
        assert!(suite
            .trusted_issuers_registry
            .read()
            .has_topic(&addr(0x11), ClaimTopic::from_label("KYC_CLAIM")));
        assert_eq!(suite.compliance.read().token(), Some(&addresses.token));
        assert_eq!(addresses.version, Version::new(4, 1, 6));
    }

    #[test]
    fn salt_reuse_rejected() {
        let mut factory = factory();
        factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();
        let err = factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap_err();
        assert!(matches!(err, FactoryError::SaltAlreadyUsed { .. }));
    }

    #[test]
    fn addresses_deterministic_across_replays() {
        let mut first = factory();
        let mut second = factory();
        let a = first
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();
        let b = second
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(a.identity_registry, b.identity_registry);
        assert_eq!(a.identity_registry_storage, b.identity_registry_storage);
        assert_eq!(a.trusted_issuers_registry, b.trusted_issuers_registry);
        assert_eq!(a.claim_topics_registry, b.claim_topics_registry);
        assert_eq!(a.compliance, b.compliance);
    }

    #[test]
    fn different_salts_different_addresses() {
        let mut factory = factory();
        let a = factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();
        let b = factory
            .deploy_suite(salt("suite-02"), token_config(), claim_config(), vec![])
            .unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.compliance, b.compliance);
    }

    #[test]
    fn requires_active_version() {
        let mut factory = SuiteFactory::new(
            addr(0xfa),
            Arc::new(RwLock::new(ImplementationAuthority::new(addr(0x01)))),
            Arc::new(RwLock::new(IdentityStore::new())),
        );
        let err = factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap_err();
        assert!(matches!(err, FactoryError::NoActiveVersion));
    }

    #[test]
    fn empty_issuer_topics_rejected_before_construction() {
        let mut factory = factory();
        let mut claims = claim_config();
        claims.issuer_trust[0].topics.clear();
        let err = factory
            .deploy_suite(salt("suite-01"), token_config(), claims, vec![])
            .unwrap_err();
        assert!(matches!(err, FactoryError::InvalidConfig { .. }));
        // Nothing was recorded for the salt.
        assert!(factory.suite(&salt("suite-01")).is_none());
    }

    #[test]
    fn duplicate_modules_rejected() {
        let mut factory = factory();
        let err = factory
            .deploy_suite(
                salt("suite-01"),
                token_config(),
                claim_config(),
                vec![
                    Box::new(MaxBalanceModule::new(10)),
                    Box::new(MaxBalanceModule::new(20)),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, FactoryError::InvalidConfig { .. }));
    }

    #[test]
    fn modules_bound_in_order() {
        let mut factory = factory();
        factory
            .deploy_suite(
                salt("suite-01"),
                token_config(),
                claim_config(),
                vec![Box::new(MaxBalanceModule::new(10_000))],
            )
            .unwrap();
        let suite = factory.suite(&salt("suite-01")).unwrap();
        assert_eq!(suite.compliance.read().module_names(), vec!["max-balance"]);
    }

    #[test]
    fn storage_reuse_links_suites() {
        let mut factory = factory();
        let a = factory
            .deploy_suite(salt("suite-01"), token_config(), claim_config(), vec![])
            .unwrap();

        let mut config = token_config();
        config.identity_storage = Some(a.identity_registry_storage);
        let b = factory
            .deploy_suite(salt("suite-02"), config, claim_config(), vec![])
            .unwrap();
        assert_eq!(a.identity_registry_storage, b.identity_registry_storage);

        // The two suites share one wallet table.
        let first = factory.suite(&salt("suite-01")).unwrap();
        let second = factory.suite(&salt("suite-02")).unwrap();
        assert!(Arc::ptr_eq(
            &first.identity_registry_storage,
            &second.identity_registry_storage
        ));
    }

    #[test]
    fn unknown_storage_rejected() {
        let mut factory = factory();
        let mut config = token_config();
        config.identity_storage = Some(addr(0xee));
        let err = factory
            .deploy_suite(salt("suite-01"), config, claim_config(), vec![])
            .unwrap_err();
        assert!(matches!(err, FactoryError::UnknownStorage { .. }));
    }

    #[test]
    fn identity_deployment_is_deterministic_and_unique() {
        let factory = factory();
        let management = addr(0x30);
        let identity = factory.deploy_identity(management).unwrap();
        assert!(factory.identities().read().contains(&identity));

        let err = factory.deploy_identity(management).unwrap_err();
        assert!(matches!(err, FactoryError::Identity(_)));
    }
}
