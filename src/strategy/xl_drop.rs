//! "Drop" loss recovery.
//!
//! Excess above the baseline is split into a small share and a large
//! share for the two outsider channels. A channel whose losing streak
//! has reached its ceiling does not take its share into the carry;
//! the share is parked as a pending deferral and credited back against
//! the total the next time that channel wins. F is staked to cover a
//! fraction of each outsider's stake, shrinking as their streak grows.

use rust_decimal::Decimal;
use tracing::debug;

use super::{advance_streaks, redistribute, seed_carries, validate_odds, Money, Strategy};
use crate::config::AppConfig;
use crate::types::{Channel, Ledger, PerChannel, RoundInput, RoundRecord, TrainerError};

pub struct DropStrategy {
    base_amount: Decimal,
    round_unit: Decimal,
    split_ratio: Decimal,
    ceiling_x: u32,
    ceiling_l: u32,
    swap_channels: bool,
}

impl DropStrategy {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_amount: config.stake.base_amount,
            round_unit: config.stake.round_unit,
            split_ratio: config.strategy.split_ratio,
            ceiling_x: config.strategy.defer_ceiling_x,
            ceiling_l: config.strategy.defer_ceiling_l,
            swap_channels: config.odds.swap_channels,
        }
    }

    fn ceiling(&self, channel: Channel) -> u32 {
        match channel {
            Channel::X => self.ceiling_x,
            Channel::L => self.ceiling_l,
            Channel::F => u32::MAX,
        }
    }

    /// (small-share channel, large-share channel).
    fn share_order(&self) -> (Channel, Channel) {
        if self.swap_channels {
            (Channel::L, Channel::X)
        } else {
            (Channel::X, Channel::L)
        }
    }
}

impl Strategy for DropStrategy {
    fn name(&self) -> &'static str {
        "xlDrop"
    }

    fn description(&self) -> &'static str {
        "Loss redistribution with per-channel deferral once a streak hits its ceiling"
    }

    fn calculate(
        &self,
        current: &RoundInput,
        previous: &RoundRecord,
    ) -> Result<RoundRecord, TrainerError> {
        validate_odds(current)?;

        let base = self.base_amount;
        let money = Money::new(current.index, self.round_unit);
        let mut carries = seed_carries(previous, base);
        let gate = redistribute(&mut carries, previous, base, &money)?;
        let mut pending = previous.ledger.deferred;

        let (small_ch, large_ch) = self.share_order();
        let small = money.round_up(money.mul(self.split_ratio, gate.excess)?)?;
        let large = money.round_up(money.sub(gate.excess, small)?)?;

        // Channels that took a share and get F cover, with the cover divisor.
        let mut covered: Vec<(Channel, u32)> = Vec::with_capacity(2);
        for (channel, share) in [(small_ch, small), (large_ch, large)] {
            if share <= Decimal::ZERO {
                continue;
            }
            let streak = previous.streaks[channel];
            if streak < self.ceiling(channel) {
                carries[channel] = money.add(carries[channel], share)?;
                if streak > 0 {
                    covered.push((channel, streak));
                }
            } else {
                pending[channel] = money.add(pending[channel], share)?;
                debug!(
                    round = current.index,
                    channel = %channel,
                    streak,
                    deferred = %share,
                    "Share deferred at streak ceiling"
                );
            }
        }

        let stake_x = money.stake_for(carries.x, current.odds.x)?;
        let stake_l = money.stake_for(carries.l, current.odds.l)?;
        let mut cover = PerChannel::splat(Decimal::ZERO);
        for (channel, streak) in covered {
            let stake = if channel == Channel::X { stake_x } else { stake_l };
            cover[channel] = money.share(stake, Decimal::from(streak))?;
        }
        carries.f = money.add(carries.f, money.add(cover.x, cover.l)?)?;
        let stake_f = money.stake_for(carries.f, current.odds.f)?;

        match current.outcome {
            Channel::F => {
                carries.f = Decimal::ZERO;
                carries.x = money.add(carries.x, money.sub(stake_x, cover.x)?)?;
                carries.l = money.add(carries.l, money.sub(stake_l, cover.l)?)?;
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

        let credited = pending[current.outcome];
        pending[current.outcome] = Decimal::ZERO;
        if credited > Decimal::ZERO {
            debug!(round = current.index, channel = %current.outcome, %credited, "Deferral credited");
        }

        let settled = money.sub(money.sub(previous.total, gate.written_off)?, credited)?;
        let total = money.add(settled, base)?;

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
                deferred: pending,
                written_off: gate.written_off,
                credited,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
