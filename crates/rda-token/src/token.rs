//! # Token — Permissioned Transfer State Machine
//!
//! Balances, pause state, and per-address freezes for one regulated asset.
//! Every balance change runs the full gate sequence before any mutation:
//!
//! 1. global pause
//! 2. sender freeze (full, or the partial-freeze reserve)
//! 3. sender balance
//! 4. recipient verification against the identity registry
//! 5. compliance engine approval
//!
//! Only then does the ledger mutate, debit and credit together, and only
//! after the mutation commits is the compliance engine notified. A check
//! can therefore never observe a half-applied transfer, and a hook can
//! never veto one.
//!
//! ## Verification policy
//!
//! Only the recipient is verified on `transfer`. A sender holding a
//! balance was verified when it first received tokens (mint or transfer),
//! and deregistering a sender does not strand its balance; freezing is the
//! tool for stopping a specific sender.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use rda_compliance::{ComplianceError, ModularCompliance, TransferContext, TransferDecision};
use rda_core::{Address, Timestamp};
use rda_identity::IdentityRegistry;

/// Errors from token operations.
///
/// `ComplianceRejected` is an expected, user-facing deny: retrying the
/// identical transfer will deterministically fail again.
/// `ComplianceUnavailable` is an infrastructure fault and may be retried
/// after the faulting module recovers. Nothing is partially applied on any
/// failure path.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Caller does not hold the required role.
    #[error("caller {caller} is not authorized as {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The required role ("agent" or "owner").
        role: &'static str,
    },

    /// The token is globally paused.
    #[error("token is paused")]
    TokenPaused,

    /// The sender is frozen, or the amount dips into the frozen reserve.
    #[error("sender {sender} is frozen for this amount")]
    SenderFrozen {
        /// The frozen sender.
        sender: Address,
    },

    /// The sender's balance does not cover the amount.
    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance {
        /// Balance available to the sender.
        available: u128,
        /// Amount requested.
        requested: u128,
    },

    /// The recipient is not verified in the identity registry.
    #[error("recipient {recipient} is not verified")]
    RecipientNotVerified {
        /// The unverified recipient.
        recipient: Address,
    },

    /// A compliance module denied the transfer.
    #[error("compliance module {module} rejected the transfer: {reason}")]
    ComplianceRejected {
        /// The denying module.
        module: String,
        /// Its reason.
        reason: String,
    },

    /// The compliance engine could not evaluate.
    #[error("compliance unavailable ({module}): {detail}")]
    ComplianceUnavailable {
        /// The faulting module.
        module: String,
        /// What went wrong.
        detail: String,
    },

    /// A partial freeze would exceed the address's balance.
    #[error("cannot freeze {requested}: only {available} unfrozen balance")]
    FreezeExceedsBalance {
        /// Unfrozen balance available.
        available: u128,
        /// Amount requested to freeze.
        requested: u128,
    },

    /// A partial unfreeze would exceed the frozen amount.
    #[error("cannot unfreeze {requested}: only {frozen} frozen")]
    UnfreezeExceedsFrozen {
        /// Currently frozen amount.
        frozen: u128,
        /// Amount requested to unfreeze.
        requested: u128,
    },

    /// Minting would overflow the total supply.
    #[error("mint of {amount} would overflow total supply")]
    AmountOverflow {
        /// The offending amount.
        amount: u128,
    },
}

/// One regulated asset's ledger.
///
/// The identity registry and compliance engine are injected dependencies
/// held by reference; the token reads them on every gate evaluation and
/// never constructs or replaces them itself.
#[derive(Debug)]
pub struct Token {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    owner: Address,
    agents: BTreeSet<Address>,
    paused: bool,
    balances: BTreeMap<Address, u128>,
    frozen: BTreeSet<Address>,
    frozen_partial: BTreeMap<Address, u128>,
    total_supply: u128,
    registry: Arc<RwLock<IdentityRegistry>>,
    compliance: Arc<RwLock<ModularCompliance>>,
}

impl Token {
    /// Create a token wired to its registry and compliance engine.
    ///
    /// The token starts paused. Deployment wires the registries first and
    /// unpauses last, so the token's very first live lookup already sees a
    /// fully-wired suite.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        owner: Address,
        registry: Arc<RwLock<IdentityRegistry>>,
        compliance: Arc<RwLock<ModularCompliance>>,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            owner,
            agents: BTreeSet::new(),
            paused: true,
            balances: BTreeMap::new(),
            frozen: BTreeSet::new(),
            frozen_partial: BTreeMap::new(),
            total_supply: 0,
            registry,
            compliance,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// The token's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Token decimals.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Balance of an address (zero if unknown).
    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Total minted supply. Always equals the sum of all balances.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Whether the token is globally paused.
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Whether an address is fully frozen.
    pub fn is_frozen(&self, address: &Address) -> bool {
        self.frozen.contains(address)
    }

    /// The partially-frozen amount of an address.
    pub fn frozen_tokens(&self, address: &Address) -> u128 {
        self.frozen_partial.get(address).copied().unwrap_or(0)
    }

    /// Number of addresses holding a nonzero balance.
    pub fn holder_count(&self) -> u64 {
        self.balances.len() as u64
    }

    /// Whether an address holds the agent role.
    pub fn is_agent(&self, address: &Address) -> bool {
        self.agents.contains(address)
    }

    /// The token owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Dry-run the full transfer gate sequence. Side-effect-free.
    ///
    /// Returns `true` iff `transfer(from, to, amount)` would succeed right
    /// now. A compliance fault reports `false`.
    pub fn can_transfer(&self, from: &Address, to: &Address, amount: u128) -> bool {
        self.validate_transfer(from, to, amount).is_ok()
    }

    // ─── Role management ─────────────────────────────────────────────

    /// Grant the agent role. Owner-gated; re-granting is a no-op.
    pub fn add_agent(&mut self, caller: Address, agent: Address) -> Result<(), TokenError> {
        self.require_owner(caller)?;
        self.agents.insert(agent);
        Ok(())
    }

    /// Revoke the agent role. Owner-gated.
    pub fn remove_agent(&mut self, caller: Address, agent: &Address) -> Result<(), TokenError> {
        self.require_owner(caller)?;
        self.agents.remove(agent);
        Ok(())
    }

    /// Hand the token to a new owner. Owner-gated.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), TokenError> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    // ─── Transfers ───────────────────────────────────────────────────

    /// Move `amount` from `from` to `to`.
    ///
    /// Runs the full gate sequence, then debits and credits atomically,
    /// then notifies the compliance engine. The notification runs after
    /// commit and cannot abort the transfer.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let ctx = self.validate_transfer(&from, &to, amount)?;

        self.debit(&from, amount);
        self.credit(&to, amount);

        tracing::info!(token = %self.address, %from, %to, amount, "transfer");
        self.compliance.write().transferred(&ctx);
        Ok(())
    }

    /// Mint `amount` to `to`. Agent-gated.
    pub fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        if self.paused {
            return Err(TokenError::TokenPaused);
        }
        if !self.registry.read().is_verified(&to) {
            return Err(TokenError::RecipientNotVerified { recipient: to });
        }
        let ctx = self.build_context(&Address::ZERO, &to, amount);
        self.check_compliance(&ctx)?;

        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::AmountOverflow { amount })?;
        self.credit(&to, amount);

        tracing::info!(token = %self.address, %to, amount, "mint");
        self.compliance.write().created(&ctx);
        Ok(())
    }

    /// Burn `amount` from `from`. Agent-gated.
    ///
    /// Burning is an agent remediation tool: it ignores the freeze state,
    /// and when the amount dips into the partially-frozen reserve, the
    /// reserve is reduced to cover it.
    pub fn burn(&mut self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        if self.paused {
            return Err(TokenError::TokenPaused);
        }
        let balance = self.balance_of(&from);
        if amount > balance {
            return Err(TokenError::InsufficientBalance {
                available: balance,
                requested: amount,
            });
        }
        let ctx = self.build_context(&from, &Address::ZERO, amount);
        self.check_compliance(&ctx)?;

        let free = balance - self.frozen_tokens(&from);
        if amount > free {
            let released = amount - free;
            let remaining = self.frozen_tokens(&from) - released;
            self.set_frozen_partial(&from, remaining);
            tracing::info!(token = %self.address, %from, released, "partial freeze released by burn");
        }

        self.debit(&from, amount);
        self.total_supply -= amount;

        tracing::info!(token = %self.address, %from, amount, "burn");
        self.compliance.write().destroyed(&ctx);
        Ok(())
    }

    // ─── Freeze & pause ──────────────────────────────────────────────

    /// Fully freeze or unfreeze an address. Agent-gated and idempotent:
    /// freezing a frozen address is a no-op, not an error.
    pub fn set_address_frozen(
        &mut self,
        caller: Address,
        address: Address,
        frozen: bool,
    ) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        let changed = if frozen {
            self.frozen.insert(address)
        } else {
            self.frozen.remove(&address)
        };
        if changed {
            tracing::info!(token = %self.address, %address, frozen, "address freeze updated");
        }
        Ok(())
    }

    /// Reserve part of an address's balance so it cannot move. Agent-gated.
    pub fn freeze_partial_tokens(
        &mut self,
        caller: Address,
        address: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        let frozen = self.frozen_tokens(&address);
        let available = self.balance_of(&address).saturating_sub(frozen);
        if amount > available {
            return Err(TokenError::FreezeExceedsBalance {
                available,
                requested: amount,
            });
        }
        self.set_frozen_partial(&address, frozen + amount);
        tracing::info!(token = %self.address, %address, amount, "tokens frozen");
        Ok(())
    }

    /// Release part of an address's frozen reserve. Agent-gated.
    pub fn unfreeze_partial_tokens(
        &mut self,
        caller: Address,
        address: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        let frozen = self.frozen_tokens(&address);
        if amount > frozen {
            return Err(TokenError::UnfreezeExceedsFrozen {
                frozen,
                requested: amount,
            });
        }
        self.set_frozen_partial(&address, frozen - amount);
        tracing::info!(token = %self.address, %address, amount, "tokens unfrozen");
        Ok(())
    }

    /// Pause all transfers, mints, and burns. Agent-gated, idempotent.
    /// Freeze and registry administration remain available while paused.
    pub fn pause(&mut self, caller: Address) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        if !self.paused {
            self.paused = true;
            tracing::info!(token = %self.address, "token paused");
        }
        Ok(())
    }

    /// Resume transfers. Agent-gated, idempotent.
    pub fn unpause(&mut self, caller: Address) -> Result<(), TokenError> {
        self.require_agent(caller)?;
        if self.paused {
            self.paused = false;
            tracing::info!(token = %self.address, "token unpaused");
        }
        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────────

    /// The full transfer gate sequence, in order. Returns the evaluated
    /// context on success so the commit path reuses the same snapshot.
    fn validate_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<TransferContext, TokenError> {
        if self.paused {
            return Err(TokenError::TokenPaused);
        }
        let balance = self.balance_of(from);
        let frozen_partial = self.frozen_tokens(from);
        if self.frozen.contains(from)
            || (frozen_partial > 0 && amount > balance.saturating_sub(frozen_partial))
        {
            return Err(TokenError::SenderFrozen { sender: *from });
        }
        if amount > balance {
            return Err(TokenError::InsufficientBalance {
                available: balance,
                requested: amount,
            });
        }
        if !self.registry.read().is_verified(to) {
            return Err(TokenError::RecipientNotVerified { recipient: *to });
        }
        let ctx = self.build_context(from, to, amount);
        self.check_compliance(&ctx)?;
        Ok(ctx)
    }

    fn build_context(&self, from: &Address, to: &Address, amount: u128) -> TransferContext {
        let registry = self.registry.read();
        let country_of = |address: &Address| {
            if address.is_zero() {
                None
            } else {
                registry.country_of(address)
            }
        };
        TransferContext {
            from: *from,
            to: *to,
            amount,
            from_country: country_of(from),
            to_country: country_of(to),
            from_balance: self.balance_of(from),
            to_balance: self.balance_of(to),
            holder_count: self.holder_count(),
            timestamp: Timestamp::now(),
        }
    }

    fn check_compliance(&self, ctx: &TransferContext) -> Result<(), TokenError> {
        match self.compliance.read().can_transfer(ctx) {
            Ok(TransferDecision::Approved) => Ok(()),
            Ok(TransferDecision::Denied { module, reason }) => {
                Err(TokenError::ComplianceRejected { module, reason })
            }
            Err(ComplianceError::ComplianceUnavailable(fault)) => {
                Err(TokenError::ComplianceUnavailable {
                    module: fault.module,
                    detail: fault.detail,
                })
            }
            Err(other) => Err(TokenError::ComplianceUnavailable {
                module: "compliance".to_string(),
                detail: other.to_string(),
            }),
        }
    }

    /// Debit, dropping the entry when the balance reaches zero so the
    /// holder count stays accurate. Callers have already checked funds.
    fn debit(&mut self, address: &Address, amount: u128) {
        let remaining = self.balance_of(address).saturating_sub(amount);
        if remaining == 0 {
            self.balances.remove(address);
        } else {
            self.balances.insert(*address, remaining);
        }
    }

    fn credit(&mut self, address: &Address, amount: u128) {
        if amount == 0 {
            return;
        }
        let entry = self.balances.entry(*address).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    fn set_frozen_partial(&mut self, address: &Address, amount: u128) {
        if amount == 0 {
            self.frozen_partial.remove(address);
        } else {
            self.frozen_partial.insert(*address, amount);
        }
    }

    fn require_owner(&self, caller: Address) -> Result<(), TokenError> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized {
                caller,
                role: "owner",
            });
        }
        Ok(())
    }

    fn require_agent(&self, caller: Address) -> Result<(), TokenError> {
        if !self.agents.contains(&caller) {
            return Err(TokenError::Unauthorized {
                caller,
                role: "agent",
            });
        }
        Ok(())
    }
}
