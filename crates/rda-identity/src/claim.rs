//! # Claims — Signed Attestations Bound to an Identity
//!
//! A [`Claim`] is a signed assertion, issued off-ledger by a trusted issuer,
//! that one identity satisfies one topic (KYC, accreditation, residency).
//! The signature covers the canonical digest input of
//! `(subject identity, topic, data)`, so a claim cannot be replayed against
//! a different identity or topic.
//!
//! ## Verification semantics
//!
//! [`verify_claim`] is stateless and side-effect-free; it can be evaluated
//! arbitrarily often. An unsatisfied check (untrusted issuer, expired,
//! revoked, bad signature) returns `Ok(false)`. Only malformed input
//! (unknown signature scheme, wrong-length signature, uncanonicalizable
//! data) is an error, [`ClaimError::InvalidClaimFormat`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::{Address, CanonicalBytes, ClaimTopic, Timestamp};
use rda_crypto::Ed25519Signature;

use crate::identity::IdentityStore;
use crate::issuers::TrustedIssuersRegistry;

/// Wire id of the Ed25519-over-canonical-digest signature scheme.
///
/// Further scheme ids may be allocated later; an id this build does not
/// recognize fails verification with `InvalidClaimFormat` rather than
/// silently returning false.
pub const SCHEME_ED25519: u8 = 1;

/// Errors raised by claim construction and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    /// The claim is structurally malformed: unknown signature scheme,
    /// wrong-length signature, or data that cannot be canonicalized.
    #[error("invalid claim format: {detail}")]
    InvalidClaimFormat {
        /// What was malformed.
        detail: String,
    },
}

impl ClaimError {
    fn format(detail: impl Into<String>) -> Self {
        Self::InvalidClaimFormat {
            detail: detail.into(),
        }
    }
}

/// A signed assertion that an identity satisfies a claim topic.
///
/// The subject identity is not stored in the claim itself; a claim lives on
/// the subject's [`Identity`](crate::identity::Identity) record, and the
/// subject's address is an input to signature verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The topic this claim attests to.
    pub topic: ClaimTopic,
    /// Address of the issuing identity.
    pub issuer: Address,
    /// Signature scheme wire id (see [`SCHEME_ED25519`]).
    pub scheme: u8,
    /// Raw signature bytes. Length is validated at verification time so a
    /// malformed claim is distinguishable from an invalid one.
    #[serde(with = "sig_hex")]
    pub signature: Vec<u8>,
    /// Issuer-defined payload (e.g. `{"kyc": true, "country": 840}`).
    pub data: serde_json::Value,
    /// Optional reference to off-ledger evidence.
    pub uri: String,
    /// Expiry instant; `None` means the claim does not expire.
    pub valid_until: Option<Timestamp>,
}

impl Claim {
    /// Issue a claim: compute the canonical signing input for
    /// `(subject, topic, data)` and sign it.
    pub fn issue(
        signing_key: &rda_crypto::SigningKey,
        issuer: Address,
        subject: &Address,
        topic: ClaimTopic,
        data: serde_json::Value,
        uri: impl Into<String>,
        valid_until: Option<Timestamp>,
    ) -> Result<Self, ClaimError> {
        let input = signing_input(subject, topic, &data)?;
        let signature = signing_key.sign(&input);
        Ok(Self {
            topic,
            issuer,
            scheme: SCHEME_ED25519,
            signature: signature.as_bytes().to_vec(),
            data,
            uri: uri.into(),
            valid_until,
        })
    }

    /// Hex rendering of the signature, used to key issuer-side revocation.
    pub fn signature_hex(&self) -> String {
        self.signature.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// The canonical byte sequence a claim signature covers.
///
/// Binds the signature to the subject identity, the topic, and the payload.
/// Re-signing the same payload for a different subject or topic produces a
/// different input, so claims are not transferable between identities.
pub fn signing_input(
    subject: &Address,
    topic: ClaimTopic,
    data: &serde_json::Value,
) -> Result<CanonicalBytes, ClaimError> {
    CanonicalBytes::new(&serde_json::json!({
        "identity": subject,
        "topic": topic.value(),
        "data": data,
    }))
    .map_err(|e| ClaimError::format(format!("claim data is not canonicalizable: {e}")))
}

/// Verify one claim against the current trust policy.
///
/// Checks, in order:
///
/// 1. Format: recognized scheme and 64-byte signature, canonicalizable data.
///    Violations are `Err(InvalidClaimFormat)`.
/// 2. Expiry: a claim past `valid_until` does not count.
/// 3. Live trust: the issuer must currently be trusted for the topic.
/// 4. Revocation: the issuer must not have revoked this signature.
/// 5. Signature: must verify against a CLAIM_SIGNER key on the issuer's
///    identity record.
///
/// Unsatisfied checks 2-5 return `Ok(false)`. No state is read other than
/// the provided registries, and none is written.
pub fn verify_claim(
    subject: &Address,
    claim: &Claim,
    issuers: &TrustedIssuersRegistry,
    identities: &IdentityStore,
    now: Timestamp,
) -> Result<bool, ClaimError> {
    if claim.scheme != SCHEME_ED25519 {
        return Err(ClaimError::format(format!(
            "unknown signature scheme id {}",
            claim.scheme
        )));
    }
    if claim.signature.len() != 64 {
        return Err(ClaimError::format(format!(
            "signature must be 64 bytes, got {}",
            claim.signature.len()
        )));
    }
    let input = signing_input(subject, claim.topic, &claim.data)?;

    if let Some(valid_until) = claim.valid_until {
        if valid_until < now {
            return Ok(false);
        }
    }
    if !issuers.has_topic(&claim.issuer, claim.topic) {
        return Ok(false);
    }
    let issuer_identity = match identities.get(&claim.issuer) {
        Some(identity) => identity,
        None => return Ok(false),
    };
    if issuer_identity.is_revoked(&claim.signature_hex()) {
        return Ok(false);
    }

    let mut sig_bytes = [0u8; 64];
    sig_bytes.copy_from_slice(&claim.signature);
    let signature = Ed25519Signature::from_bytes(sig_bytes);

    let verified = issuer_identity
        .claim_signer_keys()
        .any(|key| key.verify(&input, &signature).is_ok());
    Ok(verified)
}

mod sig_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        if hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("signature hex has odd length"));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|e| serde::de::Error::custom(format!("invalid hex: {e}")))
            })
            .collect()
    }
}
