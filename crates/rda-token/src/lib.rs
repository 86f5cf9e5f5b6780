//! # rda-token — Identity-Gated Token Ledger
//!
//! The [`Token`] holds balances and gates every balance change behind the
//! identity registry and the compliance engine, both injected at
//! construction. Checks run before any mutation, the debit/credit pair is
//! atomic, and the compliance engine is notified only after the ledger has
//! committed.

pub mod token;

pub use token::{Token, TokenError};
