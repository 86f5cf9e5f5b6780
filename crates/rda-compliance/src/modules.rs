//! # Transfer Rules
//!
//! The [`TransferRule`] trait and the built-in rule modules. A rule sees a
//! [`TransferContext`] snapshot assembled by the token at check time; rules
//! never reach back into ledger state, which keeps `check` side-effect-free
//! and makes the engine's short-circuit evaluation unobservable.
//!
//! ## Check vs. hooks
//!
//! `check` is the pure gate: it may approve, deny, or report a fault.
//! The `on_transfer` / `on_create` / `on_destroy` hooks run after the
//! ledger has committed and are infallible; a hook that could reject
//! would let compliance state diverge from the ledger.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use rda_core::{Address, CountryCode, Timestamp};

/// Snapshot of one prospective balance change, assembled by the token.
///
/// Mints carry `from = Address::ZERO`, burns carry `to = Address::ZERO`;
/// the corresponding country and balance fields are `None`/zero for the
/// zero address.
#[derive(Debug, Clone)]
pub struct TransferContext {
    /// Sender (zero for mint).
    pub from: Address,
    /// Recipient (zero for burn).
    pub to: Address,
    /// Amount in token base units.
    pub amount: u128,
    /// Sender's registered country, if any.
    pub from_country: Option<CountryCode>,
    /// Recipient's registered country, if any.
    pub to_country: Option<CountryCode>,
    /// Sender balance before the change.
    pub from_balance: u128,
    /// Recipient balance before the change.
    pub to_balance: u128,
    /// Number of addresses with a nonzero balance before the change.
    pub holder_count: u64,
    /// When the change is being evaluated.
    pub timestamp: Timestamp,
}

/// A rule's answer to a compliance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The rule approves the transfer.
    Approve,
    /// The rule denies the transfer. The designed outcome, not an error.
    Deny {
        /// Why the rule denied.
        reason: String,
    },
}

impl Verdict {
    /// Construct a deny with a reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }
}

/// A rule module could not evaluate at all. Distinct from a deny: this is
/// an infrastructure fault, and the operation may be retried once the
/// module's dependency recovers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule module {module} unavailable: {detail}")]
pub struct RuleFault {
    /// Name of the faulting module.
    pub module: String,
    /// What went wrong.
    pub detail: String,
}

/// A pluggable compliance rule.
///
/// A module instance is bound to at most one engine at a time and owns its
/// internal counters; unbinding does not reset them.
pub trait TransferRule: Send + Sync + std::fmt::Debug {
    /// Stable module name, used for bind/unbind addressing and deny
    /// attribution.
    fn name(&self) -> &str;

    /// Pure compliance check. Must not mutate module state.
    fn check(&self, ctx: &TransferContext) -> Result<Verdict, RuleFault>;

    /// Bookkeeping after a transfer commits.
    fn on_transfer(&mut self, _ctx: &TransferContext) {}

    /// Bookkeeping after a mint commits.
    fn on_create(&mut self, _ctx: &TransferContext) {}

    /// Bookkeeping after a burn commits.
    fn on_destroy(&mut self, _ctx: &TransferContext) {}
}

// ─── CountryRestrictModule ───────────────────────────────────────────

/// Denies transfers touching a restricted country.
///
/// Mint and burn legs with the zero address have no country and are not
/// restricted by this rule.
#[derive(Debug, Default)]
pub struct CountryRestrictModule {
    restricted: BTreeSet<CountryCode>,
}

impl CountryRestrictModule {
    /// Create with an initial restricted set.
    pub fn new(restricted: impl IntoIterator<Item = CountryCode>) -> Self {
        Self {
            restricted: restricted.into_iter().collect(),
        }
    }

    /// Restrict a country.
    pub fn restrict(&mut self, country: CountryCode) {
        self.restricted.insert(country);
    }

    /// Lift a restriction.
    pub fn unrestrict(&mut self, country: &CountryCode) {
        self.restricted.remove(country);
    }
}

impl TransferRule for CountryRestrictModule {
    fn name(&self) -> &str {
        "country-restrict"
    }

    fn check(&self, ctx: &TransferContext) -> Result<Verdict, RuleFault> {
        for country in [ctx.from_country, ctx.to_country].into_iter().flatten() {
            if self.restricted.contains(&country) {
                return Ok(Verdict::deny(format!("country {country} is restricted")));
            }
        }
        Ok(Verdict::Approve)
    }
}

// ─── MaxBalanceModule ────────────────────────────────────────────────

/// Caps any single holder's balance.
#[derive(Debug)]
pub struct MaxBalanceModule {
    cap: u128,
}

impl MaxBalanceModule {
    /// Create with a per-holder balance cap.
    pub fn new(cap: u128) -> Self {
        Self { cap }
    }
}

impl TransferRule for MaxBalanceModule {
    fn name(&self) -> &str {
        "max-balance"
    }

    fn check(&self, ctx: &TransferContext) -> Result<Verdict, RuleFault> {
        if ctx.to.is_zero() {
            return Ok(Verdict::Approve);
        }
        let resulting = ctx.to_balance.saturating_add(ctx.amount);
        if resulting > self.cap {
            return Ok(Verdict::deny(format!(
                "resulting balance {resulting} exceeds cap {}",
                self.cap
            )));
        }
        Ok(Verdict::Approve)
    }
}

// ─── HolderCountModule ───────────────────────────────────────────────

/// Caps the number of distinct nonzero holders.
///
/// A transfer that creates a new holder while the sender keeps a balance
/// raises the count; a transfer that empties the sender into an existing
/// holder lowers it. Only the net effect is gated.
#[derive(Debug)]
pub struct HolderCountModule {
    max_holders: u64,
}

impl HolderCountModule {
    /// Create with a maximum holder count.
    pub fn new(max_holders: u64) -> Self {
        Self { max_holders }
    }
}

impl TransferRule for HolderCountModule {
    fn name(&self) -> &str {
        "holder-count"
    }

    fn check(&self, ctx: &TransferContext) -> Result<Verdict, RuleFault> {
        if ctx.amount == 0 {
            return Ok(Verdict::Approve);
        }
        let gains_holder = !ctx.to.is_zero() && ctx.to_balance == 0;
        let loses_holder = !ctx.from.is_zero() && ctx.from_balance == ctx.amount;
        let mut projected = ctx.holder_count;
        if gains_holder {
            projected = projected.saturating_add(1);
        }
        if loses_holder {
            projected = projected.saturating_sub(1);
        }
        if projected > self.max_holders {
            return Ok(Verdict::deny(format!(
                "holder count {projected} would exceed cap {}",
                self.max_holders
            )));
        }
        Ok(Verdict::Approve)
    }
}

// ─── DailyVolumeModule ───────────────────────────────────────────────

/// Caps each sender's outbound volume per UTC day.
///
/// Spent volume is tracked in `on_transfer`, keyed by sender and day
/// bucket. Buckets from previous days are pruned as new days arrive, so
/// the map stays bounded by the active-sender count.
#[derive(Debug)]
pub struct DailyVolumeModule {
    cap: u128,
    current_day: i64,
    spent: HashMap<Address, u128>,
}

impl DailyVolumeModule {
    /// Create with a per-sender daily volume cap.
    pub fn new(cap: u128) -> Self {
        Self {
            cap,
            current_day: 0,
            spent: HashMap::new(),
        }
    }

    fn spent_today(&self, sender: &Address, day: i64) -> u128 {
        if day != self.current_day {
            return 0;
        }
        self.spent.get(sender).copied().unwrap_or(0)
    }
}

impl TransferRule for DailyVolumeModule {
    fn name(&self) -> &str {
        "daily-volume"
    }

    fn check(&self, ctx: &TransferContext) -> Result<Verdict, RuleFault> {
        if ctx.from.is_zero() {
            return Ok(Verdict::Approve);
        }
        let day = ctx.timestamp.utc_day();
        let projected = self
            .spent_today(&ctx.from, day)
            .saturating_add(ctx.amount);
        if projected > self.cap {
            return Ok(Verdict::deny(format!(
                "daily volume {projected} exceeds cap {}",
                self.cap
            )));
        }
        Ok(Verdict::Approve)
    }

    fn on_transfer(&mut self, ctx: &TransferContext) {
        let day = ctx.timestamp.utc_day();
        if day != self.current_day {
            self.spent.clear();
            self.current_day = day;
        }
        let entry = self.spent.entry(ctx.from).or_insert(0);
        *entry = entry.saturating_add(ctx.amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn ctx() -> TransferContext {
        TransferContext {
            from: addr(0x0a),
            to: addr(0x0b),
            amount: 100,
            from_country: Some(CountryCode::new(840)),
            to_country: Some(CountryCode::new(826)),
            from_balance: 1_000,
            to_balance: 500,
            holder_count: 2,
            timestamp: Timestamp::from_epoch_secs(1_754_000_000).unwrap(),
        }
    }

    #[test]
    fn country_restrict_denies_either_leg() {
        let module = CountryRestrictModule::new([CountryCode::new(826)]);
        assert!(matches!(module.check(&ctx()), Ok(Verdict::Deny { .. })));

        let module = CountryRestrictModule::new([CountryCode::new(840)]);
        assert!(matches!(module.check(&ctx()), Ok(Verdict::Deny { .. })));

        let module = CountryRestrictModule::new([CountryCode::new(276)]);
        assert_eq!(module.check(&ctx()).unwrap(), Verdict::Approve);
    }

    #[test]
    fn country_restrict_ignores_mint_leg() {
        let module = CountryRestrictModule::new([CountryCode::new(840)]);
        let mut mint = ctx();
        mint.from = Address::ZERO;
        mint.from_country = None;
        mint.to_country = Some(CountryCode::new(826));
        assert_eq!(module.check(&mint).unwrap(), Verdict::Approve);
    }

    #[test]
    fn max_balance_gates_resulting_balance() {
        let module = MaxBalanceModule::new(550);
        assert!(matches!(module.check(&ctx()), Ok(Verdict::Deny { .. })));
        let module = MaxBalanceModule::new(600);
        assert_eq!(module.check(&ctx()).unwrap(), Verdict::Approve);
    }

    #[test]
    fn max_balance_ignores_burn() {
        let module = MaxBalanceModule::new(1);
        let mut burn = ctx();
        burn.to = Address::ZERO;
        burn.to_balance = 0;
        assert_eq!(module.check(&burn).unwrap(), Verdict::Approve);
    }

    #[test]
    fn holder_count_gates_new_holders() {
        let module = HolderCountModule::new(2);
        let mut c = ctx();
        c.to_balance = 0; // new holder, sender keeps balance
        assert!(matches!(module.check(&c), Ok(Verdict::Deny { .. })));

        // Sender empties out while recipient is new: net count unchanged.
        c.from_balance = c.amount;
        assert_eq!(module.check(&c).unwrap(), Verdict::Approve);
    }

    #[test]
    fn holder_count_allows_existing_holders() {
        let module = HolderCountModule::new(2);
        assert_eq!(module.check(&ctx()).unwrap(), Verdict::Approve);
    }

    #[test]
    fn daily_volume_accumulates_and_resets() {
        let mut module = DailyVolumeModule::new(150);
        let c = ctx();
        assert_eq!(module.check(&c).unwrap(), Verdict::Approve);
        module.on_transfer(&c);

        // Second 100 the same day would total 200 > 150.
        assert!(matches!(module.check(&c), Ok(Verdict::Deny { .. })));

        // Next day the counter resets.
        let mut next_day = c.clone();
        next_day.timestamp =
            Timestamp::from_epoch_secs(c.timestamp.epoch_secs() + 86_400).unwrap();
        assert_eq!(module.check(&next_day).unwrap(), Verdict::Approve);
        module.on_transfer(&next_day);
        assert!(matches!(module.check(&next_day), Ok(Verdict::Deny { .. })));
    }

    #[test]
    fn daily_volume_ignores_mint() {
        let module = DailyVolumeModule::new(1);
        let mut mint = ctx();
        mint.from = Address::ZERO;
        assert_eq!(module.check(&mint).unwrap(), Verdict::Approve);
    }

    #[test]
    fn unbind_preserves_counters() {
        // The module owns its counters: after accumulating, the same
        // instance keeps denying regardless of engine binding.
        let mut module = DailyVolumeModule::new(100);
        let c = ctx();
        module.on_transfer(&c);
        assert!(matches!(module.check(&c), Ok(Verdict::Deny { .. })));
    }
}
