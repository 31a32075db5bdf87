//! Constrained odds generation.
//!
//! Draws a triple of payout odds uniformly from the configured
//! per-channel ranges and keeps it only when the implied probability
//! sum lands inside the margin band. Sampling is bounded; when the
//! budget runs out a fixed known-good triple is returned so a round is
//! never blocked on odds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::*;
use tracing::{debug, warn};

use crate::config::{OddsConfig, Range};
use crate::types::{Odds, PerChannel};

// ---------------------------------------------------------------------------
// Randomness source
// ---------------------------------------------------------------------------

/// Uniform samples in `[0, 1)`. Swapped for a fixed sequence in tests.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Default source backed by `StdRng`.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Sum of implied probabilities for a triple of odds.
pub fn implied_margin(f: f64, x: f64, l: f64) -> f64 {
    1.0 / f + 1.0 / x + 1.0 / l
}

fn to_odd(value: f64) -> Option<Decimal> {
    Decimal::from_f64((value * 100.0).round() / 100.0).map(|d| d.round_dp(2))
}

pub struct OddsGenerator {
    config: OddsConfig,
    source: Box<dyn RandomSource>,
}

impl OddsGenerator {
    pub fn new(config: OddsConfig, source: Box<dyn RandomSource>) -> Self {
        Self { config, source }
    }

    /// Build from config alone: seeded when `odds.seed` is set, entropy otherwise.
    pub fn from_config(config: &OddsConfig) -> Self {
        let source: Box<dyn RandomSource> = match config.seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        };
        Self::new(config.clone(), source)
    }

    /// Access the odds configuration.
    pub fn config(&self) -> &OddsConfig {
        &self.config
    }

    /// Ranges in sampling order, with X and L exchanged under the swap policy.
    fn ranges(&self) -> (Range, Range, Range) {
        if self.config.swap_channels {
            (self.config.f, self.config.l, self.config.x)
        } else {
            (self.config.f, self.config.x, self.config.l)
        }
    }

    /// The deterministic triple used when sampling is exhausted.
    pub fn fallback(&self) -> Odds {
        let [f, x, l] = self.config.fallback;
        if self.config.swap_channels {
            PerChannel::new(f, l, x)
        } else {
            PerChannel::new(f, x, l)
        }
    }

    /// Sample odds satisfying the margin band, rounded to 2 decimals.
    pub fn generate(&mut self) -> Odds {
        let (range_f, range_x, range_l) = self.ranges();

        for attempt in 1..=self.config.max_attempts {
            let f = range_f.lerp(self.source.next_unit());
            let x = range_x.lerp(self.source.next_unit());
            let l = range_l.lerp(self.source.next_unit());

            let margin = implied_margin(f, x, l);
            if !self.config.margin.contains(margin) {
                continue;
            }

            if let (Some(f), Some(x), Some(l)) = (to_odd(f), to_odd(x), to_odd(l)) {
                debug!(attempt, margin = format!("{margin:.4}"), %f, %x, %l, "Odds accepted");
                return PerChannel::new(f, x, l);
            }
        }

        warn!(
            attempts = self.config.max_attempts,
            "Odds sampling exhausted, using fallback odds"
        );
        self.fallback()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
