//! # rda-compliance — Modular Transfer Compliance
//!
//! A [`ModularCompliance`] engine holds an ordered set of [`TransferRule`]
//! modules. Every module must approve a transfer (unanimous AND), and every
//! module is notified after a transfer, mint, or burn commits so it can
//! maintain its own counters.
//!
//! A rule saying "no" is the designed deny signal, not a fault; a rule that
//! cannot evaluate at all surfaces as
//! [`ComplianceError::ComplianceUnavailable`], which callers may retry
//! after the underlying dependency recovers.

pub mod engine;
pub mod modules;

// ─── Engine re-exports ───────────────────────────────────────────────

pub use engine::{ComplianceError, ModularCompliance, TransferDecision};

// ─── Rule re-exports ─────────────────────────────────────────────────

pub use modules::{
    CountryRestrictModule, DailyVolumeModule, HolderCountModule, MaxBalanceModule, RuleFault,
    TransferContext, TransferRule, Verdict,
};
