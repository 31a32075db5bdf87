//! Flat staking with no loss recovery.
//!
//! Every round stakes enough to win back one base amount on each
//! channel. Carries are reported but never compounded into the stakes,
//! which makes this the reference the recovery strategies are judged
//! against.

use rust_decimal::Decimal;

use super::{advance_streaks, validate_odds, Money, Strategy};
use crate::config::AppConfig;
use crate::types::{PerChannel, RoundInput, RoundRecord, TrainerError};

pub struct BasicStrategy {
    base_amount: Decimal,
    round_unit: Decimal,
}

impl BasicStrategy {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_amount: config.stake.base_amount,
            round_unit: config.stake.round_unit,
        }
    }
}

impl Strategy for BasicStrategy {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn description(&self) -> &'static str {
        "Flat stakes sized from the base amount, no loss recovery"
    }

    fn calculate(
        &self,
        current: &RoundInput,
        previous: &RoundRecord,
    ) -> Result<RoundRecord, TrainerError> {
        validate_odds(current)?;

        let base = self.base_amount;
        let money = Money::new(current.index, self.round_unit);
        let stakes = PerChannel::new(
            money.stake_for(base, current.odds.f)?,
            money.stake_for(base, current.odds.x)?,
            money.stake_for(base, current.odds.l)?,
        );
        let winner = current.outcome;
        let mut carries = PerChannel::splat(Decimal::ZERO);
        for (channel, stake) in stakes.iter() {
            if channel != winner {
                carries[channel] = money.add(base, *stake)?;
            }
        }

        Ok(RoundRecord {
            index: current.index,
            outcome: Some(winner),
            odds: current.odds,
            stakes,
            carries,
            total: money.add(previous.total, base)?,
            streaks: advance_streaks(&previous.streaks, winner),
            ..RoundRecord::default()
        })
    }
}
