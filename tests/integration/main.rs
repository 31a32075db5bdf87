//! Integration tests for the trainer crate.

mod files;
mod properties;
mod simulation;

use rust_decimal_macros::dec;
use trainer::config::AppConfig;
use trainer::types::{Odds, PerChannel};

/// Fixed odds used by the hand-checked scenarios.
pub fn fixed_odds(n: usize) -> Vec<Odds> {
    vec![PerChannel::new(dec!(2.0), dec!(3.5), dec!(4.0)); n]
}

/// Default config with a fixed odds seed.
pub fn seeded_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.odds.seed = Some(seed);
    config
}

/// A mixed outcome history, newest first.
pub const HISTORY: &str = "X/F/L/X/F/F/X/F/F/X/X/F/F/X/X/F/F/X/F/F/X/F/F/X/X/F/F/F/X/F/L/F/X/X/F/F/X/L/L/X/F/L/F/F/F/X/L/F/F/X/X/L/X/F/F/X/F/F/L/F/F/F/L/F/L/X/F/L/F/L/X/L/F/L/F/F/F/L/L/X/X/F/F/F/L/X/L/F/F/X/L/L/F/F/X/X/F/X/L/F/F/F/X/L/X/L";
