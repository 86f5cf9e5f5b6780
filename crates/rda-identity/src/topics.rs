//! # Claim Topics Registry
//!
//! The set of claim topics an identity must satisfy to count as verified.
//! Topics are checked with AND semantics by
//! [`IdentityRegistry::is_verified`](crate::registry::IdentityRegistry::is_verified):
//! every required topic must be covered by a valid claim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rda_core::{Address, ClaimTopic};

/// Errors from claim-topics registry mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimTopicsError {
    /// Caller is not the registry owner.
    #[error("caller {caller} is not the claim topics registry owner")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// The topic is already required.
    #[error("claim {topic} already required")]
    DuplicateTopic {
        /// The duplicate topic.
        topic: ClaimTopic,
    },

    /// The topic is not currently required.
    #[error("claim {topic} is not required")]
    UnknownTopic {
        /// The missing topic.
        topic: ClaimTopic,
    },
}

/// Owner-curated list of required claim topics, kept in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimTopicsRegistry {
    owner: Address,
    topics: Vec<ClaimTopic>,
}

impl ClaimTopicsRegistry {
    /// Create an empty registry owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            topics: Vec::new(),
        }
    }

    /// Require a new claim topic. Owner-gated.
    pub fn add_claim_topic(
        &mut self,
        caller: Address,
        topic: ClaimTopic,
    ) -> Result<(), ClaimTopicsError> {
        self.require_owner(caller)?;
        if self.topics.contains(&topic) {
            return Err(ClaimTopicsError::DuplicateTopic { topic });
        }
        tracing::info!(%topic, "claim topic added");
        self.topics.push(topic);
        Ok(())
    }

    /// Stop requiring a claim topic. Owner-gated.
    pub fn remove_claim_topic(
        &mut self,
        caller: Address,
        topic: ClaimTopic,
    ) -> Result<(), ClaimTopicsError> {
        self.require_owner(caller)?;
        let before = self.topics.len();
        self.topics.retain(|t| *t != topic);
        if self.topics.len() == before {
            return Err(ClaimTopicsError::UnknownTopic { topic });
        }
        tracing::info!(%topic, "claim topic removed");
        Ok(())
    }

    /// The required topics, in insertion order.
    pub fn required_topics(&self) -> &[ClaimTopic] {
        &self.topics
    }

    /// Whether a topic is required.
    pub fn is_required(&self, topic: ClaimTopic) -> bool {
        self.topics.contains(&topic)
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
    ) -> Result<(), ClaimTopicsError> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    fn require_owner(&self, caller: Address) -> Result<(), ClaimTopicsError> {
        if caller != self.owner {
            return Err(ClaimTopicsError::Unauthorized { caller });
        }
        Ok(())
    }
}
