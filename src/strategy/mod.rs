//! Staking strategies and the risk pattern detector.
//!
//! Every strategy is a pure step function: given the outcome and odds
//! of the round being played and the full record of the round before
//! it, produce this round's stakes, carries, streaks and total.
//! Strategies are registered by identifier and resolved once at startup.

pub mod basic;
pub mod risk;
pub mod xl_drop;
pub mod xl_support;

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AppConfig;
use crate::types::{Channel, PerChannel, RoundInput, RoundRecord, Severity, TrainerError};
use basic::BasicStrategy;
use xl_drop::DropStrategy;
use xl_support::SupportStrategy;

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

pub trait Strategy: Send + Sync {
    /// Registry identifier.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Compute round `current` from the round before it. Deterministic:
    /// identical inputs always give identical records.
    fn calculate(
        &self,
        current: &RoundInput,
        previous: &RoundRecord,
    ) -> Result<RoundRecord, TrainerError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Strategies keyed by identifier.
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Registry holding every built-in strategy, configured from `config`.
    pub fn new(config: &AppConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DropStrategy::new(config)));
        registry.register(Box::new(SupportStrategy::new(config)));
        registry.register(Box::new(BasicStrategy::new(config)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    /// Look up a strategy; the error lists every valid identifier.
    pub fn get(&self, name: &str) -> Result<&dyn Strategy, TrainerError> {
        self.strategies
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| TrainerError::UnknownStrategy {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> + '_ {
        self.strategies.values().map(|s| s.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Shared arithmetic
// ---------------------------------------------------------------------------

/// Round `value` up to the next multiple of `unit`. `None` on overflow.
pub fn round_up(value: Decimal, unit: Decimal) -> Option<Decimal> {
    value.checked_div(unit)?.ceil().checked_mul(unit)
}

/// Smallest unit-multiple stake whose net win on `odd` covers `carry`.
/// `odd` must already be known to exceed 1. `None` on overflow.
pub fn stake_for(carry: Decimal, odd: Decimal, unit: Decimal) -> Option<Decimal> {
    round_up(carry.checked_div(odd.checked_sub(Decimal::ONE)?)?, unit)
}

/// Checked money arithmetic for one round. Every operation that would
/// leave the `Decimal` range fails with `TrainerError::Overflow` naming
/// the round.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Money {
    index: usize,
    unit: Decimal,
}

impl Money {
    pub fn new(index: usize, unit: Decimal) -> Self {
        Self { index, unit }
    }

    fn check(&self, value: Option<Decimal>) -> Result<Decimal, TrainerError> {
        value.ok_or(TrainerError::Overflow { index: self.index })
    }

    pub fn add(&self, a: Decimal, b: Decimal) -> Result<Decimal, TrainerError> {
        self.check(a.checked_add(b))
    }

    pub fn sub(&self, a: Decimal, b: Decimal) -> Result<Decimal, TrainerError> {
        self.check(a.checked_sub(b))
    }

    pub fn mul(&self, a: Decimal, b: Decimal) -> Result<Decimal, TrainerError> {
        self.check(a.checked_mul(b))
    }

    pub fn round_up(&self, value: Decimal) -> Result<Decimal, TrainerError> {
        self.check(round_up(value, self.unit))
    }

    /// `round_up(value / divisor)`.
    pub fn share(&self, value: Decimal, divisor: Decimal) -> Result<Decimal, TrainerError> {
        self.check(value.checked_div(divisor).and_then(|v| round_up(v, self.unit)))
    }

    pub fn stake_for(&self, carry: Decimal, odd: Decimal) -> Result<Decimal, TrainerError> {
        self.check(stake_for(carry, odd, self.unit))
    }
}

/// Reject odds that would make stake sizing degenerate.
pub fn validate_odds(current: &RoundInput) -> Result<(), TrainerError> {
    match current.odds.iter().find(|(_, odd)| **odd <= Decimal::ONE) {
        Some((channel, odd)) => Err(TrainerError::InvalidOdds {
            index: current.index,
            channel,
            odd: *odd,
        }),
        None => Ok(()),
    }
}

/// Carries at the start of a round: channels that won last round restart
/// at the base amount, the others inherit their carry.
pub(crate) fn seed_carries(previous: &RoundRecord, base: Decimal) -> PerChannel<Decimal> {
    previous
        .carries
        .map(|c, carry| if previous.streaks[c] == 0 { base } else { *carry })
}

/// Outcome of the redistribution gate and circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Gate {
    /// Excess left to redistribute.
    pub excess: Decimal,
    /// Excess discarded because the previous round was flagged.
    pub written_off: Decimal,
}

/// Normalise every carry back to the base amount and decide what happens
/// to the excess above `3 × base`. A no-op on the very first round.
pub(crate) fn redistribute(
    carries: &mut PerChannel<Decimal>,
    previous: &RoundRecord,
    base: Decimal,
    money: &Money,
) -> Result<Gate, TrainerError> {
    if previous.streaks.iter().all(|(_, s)| *s == 0) {
        return Ok(Gate::default());
    }

    let held = money.add(money.add(carries.f, carries.x)?, carries.l)?;
    let excess = money.sub(held, money.mul(base, Decimal::from(3))?)?;
    *carries = PerChannel::splat(base);

    let gate = match previous.pattern.severity {
        Some(Severity::Green | Severity::Yellow | Severity::Red) => {
            debug!(
                round = previous.index + 1,
                written_off = %excess,
                severity = ?previous.pattern.severity,
                "Circuit breaker wrote off excess"
            );
            Gate {
                excess: Decimal::ZERO,
                written_off: excess,
            }
        }
        None => Gate {
            excess,
            written_off: Decimal::ZERO,
        },
    };
    Ok(gate)
}

/// Streaks after `winner` wins: reset the winner, bump the rest.
pub(crate) fn advance_streaks(previous: &PerChannel<u32>, winner: Channel) -> PerChannel<u32> {
    previous.map(|c, s| if c == winner { 0 } else { s + 1 })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pattern;
    use rust_decimal_macros::dec;

    fn money() -> Money {
        Money::new(4, dec!(50))
    }

    fn input(odds: [Decimal; 3]) -> RoundInput {
        RoundInput {
            index: 4,
            outcome: Channel::F,
            odds: PerChannel::new(odds[0], odds[1], odds[2]),
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(dec!(3333.34), dec!(50)), Some(dec!(3350)));
        assert_eq!(round_up(dec!(4000), dec!(50)), Some(dec!(4000)));
        assert_eq!(round_up(dec!(0), dec!(50)), Some(dec!(0)));
        assert_eq!(round_up(dec!(0.01), dec!(50)), Some(dec!(50)));
        assert_eq!(round_up(Decimal::MAX, dec!(0.5)), None);
    }

    #[test]
    fn test_stake_for_covers_carry() {
        let stake = stake_for(dec!(10000), dec!(4.0), dec!(50)).unwrap();
        assert_eq!(stake, dec!(3350));
        // Net win on that stake covers the carry.
        assert!(stake * (dec!(4.0) - Decimal::ONE) >= dec!(10000));
        assert_eq!(stake_for(dec!(10000), dec!(3.5), dec!(50)), Some(dec!(4000)));
    }

    #[test]
    fn test_stake_for_odds_barely_above_one_overflows() {
        let odd = dec!(1.0000000000000000000000000001);
        assert_eq!(stake_for(dec!(10000), odd, dec!(50)), None);

        let money = Money::new(6, dec!(50));
        assert!(matches!(
            money.stake_for(dec!(10000), odd),
            Err(TrainerError::Overflow { index: 6 })
        ));
    }

    #[test]
    fn test_money_reports_round_on_overflow() {
        let money = Money::new(2, dec!(50));
        assert_eq!(money.add(dec!(1), dec!(2)).unwrap(), dec!(3));
        assert_eq!(money.share(dec!(9900), dec!(2)).unwrap(), dec!(4950));
        assert!(matches!(money.add(Decimal::MAX, dec!(1)), Err(TrainerError::Overflow { index: 2 })));
        assert!(matches!(money.sub(Decimal::MIN, dec!(1)), Err(TrainerError::Overflow { .. })));
        assert!(matches!(money.mul(Decimal::MAX, dec!(3)), Err(TrainerError::Overflow { .. })));
    }

    #[test]
    fn test_validate_odds() {
        assert!(validate_odds(&input([dec!(2), dec!(3.5), dec!(4)])).is_ok());
        match validate_odds(&input([dec!(2), dec!(1.00), dec!(4)])) {
            Err(TrainerError::InvalidOdds { index, channel, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(channel, Channel::X);
            }
            other => panic!("expected InvalidOdds, got {other:?}"),
        }
        assert!(validate_odds(&input([dec!(0.5), dec!(3), dec!(4)])).is_err());
    }

    #[test]
    fn test_seed_carries() {
        let previous = RoundRecord {
            carries: PerChannel::new(dec!(0), dec!(14000), dec!(13350)),
            streaks: PerChannel::new(0, 1, 1),
            ..RoundRecord::default()
        };
        let carries = seed_carries(&previous, dec!(10000));
        assert_eq!(carries, PerChannel::new(dec!(10000), dec!(14000), dec!(13350)));
    }

    #[test]
    fn test_redistribute_first_round_is_noop() {
        let mut carries = PerChannel::splat(dec!(10000));
        let gate = redistribute(&mut carries, &RoundRecord::genesis(), dec!(10000), &money()).unwrap();
        assert_eq!(gate, Gate::default());
        assert_eq!(carries, PerChannel::splat(dec!(10000)));
    }

    #[test]
    fn test_redistribute_normalises_and_keeps_excess() {
        let previous = RoundRecord {
            streaks: PerChannel::new(0, 1, 1),
            ..RoundRecord::default()
        };
        let mut carries = PerChannel::new(dec!(10000), dec!(14000), dec!(13350));
        let gate = redistribute(&mut carries, &previous, dec!(10000), &money()).unwrap();
        assert_eq!(gate.excess, dec!(7350));
        assert_eq!(gate.written_off, Decimal::ZERO);
        assert_eq!(carries, PerChannel::splat(dec!(10000)));
    }

    #[test]
    fn test_redistribute_writes_off_when_flagged() {
        let previous = RoundRecord {
            streaks: PerChannel::new(0, 1, 1),
            pattern: Pattern {
                severity: Some(Severity::Green),
                flags: Vec::new(),
            },
            ..RoundRecord::default()
        };
        let mut carries = PerChannel::new(dec!(10000), dec!(14000), dec!(13350));
        let gate = redistribute(&mut carries, &previous, dec!(10000), &money()).unwrap();
        assert_eq!(gate.excess, Decimal::ZERO);
        assert_eq!(gate.written_off, dec!(7350));
    }

    #[test]
    fn test_redistribute_overflow_is_an_error() {
        let previous = RoundRecord {
            streaks: PerChannel::new(0, 1, 1),
            ..RoundRecord::default()
        };
        let mut carries = PerChannel::new(dec!(10000), Decimal::MAX, Decimal::MAX);
        let result = redistribute(&mut carries, &previous, dec!(10000), &money());
        assert!(matches!(result, Err(TrainerError::Overflow { index: 4 })));
    }

    #[test]
    fn test_advance_streaks() {
        let next = advance_streaks(&PerChannel::new(0, 1, 1), Channel::X);
        assert_eq!(next, PerChannel::new(1, 0, 2));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = StrategyRegistry::new(&AppConfig::default());
        assert_eq!(registry.names(), vec!["basic", "xlDrop", "xlWithSupport"]);
        assert_eq!(registry.get("xlDrop").unwrap().name(), "xlDrop");
        match registry.get("martingale") {
            Err(TrainerError::UnknownStrategy { available, .. }) => {
                assert_eq!(available, "basic, xlDrop, xlWithSupport");
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("unknown strategy resolved"),
        }
    }
}
