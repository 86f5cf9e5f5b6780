//! # Modular Compliance Engine
//!
//! Holds the ordered set of bound [`TransferRule`] modules for one token.
//! Approval requires unanimity; evaluation short-circuits on the first
//! deny, which is unobservable because checks are side-effect-free.
//!
//! The post-commit hooks (`transferred`, `created`, `destroyed`) notify
//! every bound module unconditionally. They run after the ledger has
//! already mutated and have no failure path.

use thiserror::Error;

use rda_core::Address;

use crate::modules::{RuleFault, TransferContext, TransferRule, Verdict};

/// Errors from compliance-engine operations.
#[derive(Error, Debug)]
pub enum ComplianceError {
    /// Caller is not the engine owner.
    #[error("caller {caller} is not the compliance owner")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// A module with this name is already bound.
    #[error("module {module} is already bound")]
    ModuleAlreadyBound {
        /// The duplicate module name.
        module: String,
    },

    /// No module with this name is bound.
    #[error("module {module} is not bound")]
    ModuleNotBound {
        /// The missing module name.
        module: String,
    },

    /// A bound module could not evaluate. An infrastructure fault, not a
    /// deny; the operation may be retried after the module recovers.
    #[error("compliance unavailable: {0}")]
    ComplianceUnavailable(#[from] RuleFault),
}

/// The engine's aggregate answer for one prospective transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferDecision {
    /// Every bound module approved.
    Approved,
    /// A module denied; evaluation stopped there.
    Denied {
        /// The denying module.
        module: String,
        /// Its reason.
        reason: String,
    },
}

impl TransferDecision {
    /// Whether the decision is an approval.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// The per-token compliance engine.
#[derive(Debug)]
pub struct ModularCompliance {
    owner: Address,
    token: Option<Address>,
    modules: Vec<Box<dyn TransferRule>>,
}

impl ModularCompliance {
    /// Create an engine with no bound modules.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            token: None,
            modules: Vec::new(),
        }
    }

    // ─── Binding ─────────────────────────────────────────────────────

    /// Bind a rule module. Owner-gated; module names are unique within an
    /// engine, and binding order is evaluation order.
    pub fn bind_module(
        &mut self,
        caller: Address,
        module: Box<dyn TransferRule>,
    ) -> Result<(), ComplianceError> {
        self.require_owner(caller)?;
        if self.modules.iter().any(|m| m.name() == module.name()) {
            return Err(ComplianceError::ModuleAlreadyBound {
                module: module.name().to_string(),
            });
        }
        tracing::info!(module = module.name(), "compliance module bound");
        self.modules.push(module);
        Ok(())
    }

    /// Unbind a rule module by name and return it. Owner-gated. The
    /// module's internal counters are untouched; rebinding the returned
    /// instance resumes where it left off.
    pub fn unbind_module(
        &mut self,
        caller: Address,
        name: &str,
    ) -> Result<Box<dyn TransferRule>, ComplianceError> {
        self.require_owner(caller)?;
        let position = self
            .modules
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| ComplianceError::ModuleNotBound {
                module: name.to_string(),
            })?;
        tracing::info!(module = name, "compliance module unbound");
        Ok(self.modules.remove(position))
    }

    /// Bind the engine to its token address. Owner-gated.
    pub fn bind_token(&mut self, caller: Address, token: Address) -> Result<(), ComplianceError> {
        self.require_owner(caller)?;
        self.token = Some(token);
        Ok(())
    }

    /// The bound token, if any.
    pub fn token(&self) -> Option<&Address> {
        self.token.as_ref()
    }

    /// Names of the bound modules, in evaluation order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// The engine owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Hand the engine to a new owner. Owner-gated.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), ComplianceError> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    // ─── Evaluation ──────────────────────────────────────────────────

    /// Evaluate every bound module in binding order. Side-effect-free.
    ///
    /// Returns the first deny, or `Approved` if all modules approve. A
    /// module fault propagates as
    /// [`ComplianceError::ComplianceUnavailable`].
    pub fn can_transfer(&self, ctx: &TransferContext) -> Result<TransferDecision, ComplianceError> {
        for module in &self.modules {
            match module.check(ctx)? {
                Verdict::Approve => {}
                Verdict::Deny { reason } => {
                    return Ok(TransferDecision::Denied {
                        module: module.name().to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(TransferDecision::Approved)
    }

    // ─── Post-commit hooks ───────────────────────────────────────────

    /// Notify every module that a transfer committed.
    pub fn transferred(&mut self, ctx: &TransferContext) {
        for module in &mut self.modules {
            module.on_transfer(ctx);
        }
    }

    /// Notify every module that a mint committed.
    pub fn created(&mut self, ctx: &TransferContext) {
        for module in &mut self.modules {
            module.on_create(ctx);
        }
    }

    /// Notify every module that a burn committed.
    pub fn destroyed(&mut self, ctx: &TransferContext) {
        for module in &mut self.modules {
            module.on_destroy(ctx);
        }
    }

    fn require_owner(&self, caller: Address) -> Result<(), ComplianceError> {
        if caller != self.owner {
            return Err(ComplianceError::Unauthorized { caller });
        }
        Ok(())
    }
}
