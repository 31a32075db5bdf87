//! "With support" loss recovery.
//!
//! The excess carried above the baseline is split between X (small
//! share, fully covered) and L (large share). F is staked to also fund
//! X's recovery stake, plus whatever of L's stake sits above the
//! partial-coverage threshold, so an F win settles X outright and
//! leaves L with a single base amount to carry.

use rust_decimal::Decimal;
use tracing::debug;

use super::{advance_streaks, redistribute, seed_carries, validate_odds, Money, Strategy};
use crate::config::AppConfig;
use crate::types::{Channel, Ledger, PerChannel, RoundInput, RoundRecord, TrainerError};

pub struct SupportStrategy {
    base_amount: Decimal,
    round_unit: Decimal,
    split_ratio: Decimal,
    partial_coverage_multiple: Decimal,
}

impl SupportStrategy {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_amount: config.stake.base_amount,
            round_unit: config.stake.round_unit,
            split_ratio: config.strategy.split_ratio,
            partial_coverage_multiple: config.strategy.partial_coverage_multiple,
        }
    }

}

impl Strategy for SupportStrategy {
    fn name(&self) -> &'static str {
        "xlWithSupport"
    }

    fn description(&self) -> &'static str {
        "Loss redistribution with F supporting X fully and L partially"
    }

    fn calculate(
        &self,
        current: &RoundInput,
        previous: &RoundRecord,
    ) -> Result<RoundRecord, TrainerError> {
        validate_odds(current)?;

        let base = self.base_amount;
        let money = Money::new(current.index, self.round_unit);
        let threshold = money.mul(base, self.partial_coverage_multiple)?;
        let mut carries = seed_carries(previous, base);
        let gate = redistribute(&mut carries, previous, base, &money)?;

        // X is fully covered whenever excess was split; L only partially
        // once its carry rises above the threshold.
        let mut covered = false;
        let mut partial = false;
        if gate.excess > Decimal::ZERO {
            let small = money.round_up(money.mul(self.split_ratio, gate.excess)?)?;
            carries.x = money.add(carries.x, small)?;
            carries.l = money.add(carries.l, money.round_up(money.sub(gate.excess, small)?)?)?;
            covered = true;
            partial = carries.l > threshold;
        }

        let stake_x = money.stake_for(carries.x, current.odds.x)?;
        let stake_l = money.stake_for(carries.l, current.odds.l)?;
        if covered {
            carries.f = money.add(carries.f, stake_x)?;
            if partial {
                carries.f = money.add(carries.f, money.sub(stake_l, threshold)?)?;
            }
        }
        let stake_f = money.stake_for(carries.f, current.odds.f)?;

        match current.outcome {
            Channel::F => {
                carries.f = Decimal::ZERO;
                if !covered {
                    carries.x = money.add(carries.x, stake_x)?;
                    carries.l = money.add(carries.l, stake_l)?;
                } else if partial {
                    carries.l = money.add(carries.l, threshold)?;
                } else {
                    carries.l = money.add(carries.l, stake_l)?;
                }
            }
            Channel::X => {
                carries.f = money.add(carries.f, stake_f)?;
                carries.x = Decimal::ZERO;
                carries.l = money.add(carries.l, stake_l)?;
            }
            Channel::L => {
                carries.f = money.add(carries.f, stake_f)?;
                carries.x = money.add(carries.x, stake_x)?;
                carries.l = Decimal::ZERO;
            }
        }

        let total = money.add(money.sub(previous.total, gate.written_off)?, base)?;
        debug!(round = current.index, covered, partial, %total, "xlWithSupport step");

        Ok(RoundRecord {
            index: current.index,
            outcome: Some(current.outcome),
            odds: current.odds,
            stakes: PerChannel::new(stake_f, stake_x, stake_l),
            carries,
            total,
            streaks: advance_streaks(&previous.streaks, current.outcome),
            pattern: Default::default(),
            ledger: Ledger {
                written_off: gate.written_off,
                ..Ledger::default()
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
