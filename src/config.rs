//! Configuration loading from TOML.
//!
//! Reads `trainer.toml` and deserializes into strongly-typed structs.
//! Every section falls back to its defaults, so a file only needs to
//! name the values it overrides. The loaded value is immutable and is
//! handed by reference to each component at construction time.

use anyhow::{Context, Result};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::{Channel, TrainerError};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "trainer.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub stake: StakeConfig,
    pub odds: OddsConfig,
    pub detector: DetectorConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StakeConfig {
    /// Fixed per-round cost basis; seeds carries and accumulates into the total.
    pub base_amount: Decimal,
    /// Stakes are rounded up to a multiple of this.
    pub round_unit: Decimal,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            base_amount: dec!(10000),
            round_unit: dec!(50),
        }
    }
}

/// Inclusive `[min, max]` interval.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Map a unit sample in `[0, 1)` onto the range.
    pub fn lerp(&self, unit: f64) -> f64 {
        self.min + unit * (self.max - self.min)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OddsConfig {
    pub f: Range,
    pub x: Range,
    pub l: Range,
    /// Acceptable implied probability sum `1/F + 1/X + 1/L`.
    pub margin: Range,
    pub max_attempts: u32,
    /// Returned when sampling exhausts `max_attempts`.
    pub fallback: [Decimal; 3],
    /// Exchange the X and L ranges (hockey schedules).
    pub swap_channels: bool,
    /// Fixed seed for reproducible generated odds.
    pub seed: Option<u64>,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            f: Range::new(1.8, 2.1),
            x: Range::new(3.3, 3.9),
            l: Range::new(4.0, 5.0),
            margin: Range::new(1.05, 1.1),
            max_attempts: 1000,
            fallback: [dec!(1.90), dec!(3.40), dec!(4.20)],
            swap_channels: false,
            seed: None,
        }
    }
}

/// Window-shaped alert: fires when the last `length` outcomes all missed `channel`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StreakAlert {
    pub channel: Channel,
    pub length: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    pub window_size: usize,
    /// GREEN/YELLOW threshold, in multiples of the base amount.
    pub small_multiple: Decimal,
    /// RED/YELLOW threshold, in multiples of the base amount.
    pub big_multiple: Decimal,
    pub red_min_count: usize,
    pub yellow_min_count: usize,
    pub streak_alerts: Vec<StreakAlert>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            small_multiple: dec!(10),
            big_multiple: dec!(20),
            red_min_count: 3,
            yellow_min_count: 2,
            streak_alerts: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    /// Registered strategy identifier used when none is given on the command line.
    pub name: String,
    /// Share of the excess assigned to the small-share channel.
    pub split_ratio: Decimal,
    /// Multiple of the base amount above which coverage is only partial.
    pub partial_coverage_multiple: Decimal,
    pub defer_ceiling_x: u32,
    pub defer_ceiling_l: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: "xlDrop".to_string(),
            split_ratio: dec!(0.3),
            partial_coverage_multiple: dec!(1),
            defer_ceiling_x: 5,
            defer_ceiling_l: 6,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if present, else defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Reject values that would make the simulation degenerate.
    pub fn validate(&self) -> Result<(), TrainerError> {
        let bad = |msg: String| Err(TrainerError::Config(msg));

        if self.stake.base_amount <= Decimal::ZERO {
            return bad(format!("stake.base_amount must be positive, got {}", self.stake.base_amount));
        }
        if self.stake.round_unit <= Decimal::ZERO {
            return bad(format!("stake.round_unit must be positive, got {}", self.stake.round_unit));
        }

        for (name, range) in [("f", self.odds.f), ("x", self.odds.x), ("l", self.odds.l)] {
            if range.min > range.max {
                return bad(format!("odds.{name} has min {} above max {}", range.min, range.max));
            }
            if range.min <= 1.0 {
                return bad(format!("odds.{name} must stay above 1, got min {}", range.min));
            }
        }
        if self.odds.margin.min > self.odds.margin.max {
            return bad("odds.margin has min above max".to_string());
        }
        if self.odds.fallback.iter().any(|o| *o <= Decimal::ONE) {
            return bad("odds.fallback values must all be greater than 1".to_string());
        }
        let [f, x, l] = self.odds.fallback.map(|o| o.to_f64().unwrap_or(f64::NAN));
        let fallback_margin = 1.0 / f + 1.0 / x + 1.0 / l;
        if !self.odds.margin.contains(fallback_margin) {
            return bad(format!(
                "odds.fallback margin {fallback_margin:.4} is outside [{}, {}]",
                self.odds.margin.min, self.odds.margin.max
            ));
        }

        if self.detector.window_size == 0 {
            return bad("detector.window_size must be at least 1".to_string());
        }
        if let Some(alert) = self
            .detector
            .streak_alerts
            .iter()
            .find(|a| a.length == 0 || a.length > self.detector.window_size)
        {
            return bad(format!(
                "detector streak alert on {} has length {} outside 1..={}",
                alert.channel, alert.length, self.detector.window_size
            ));
        }

        let base = self.stake.base_amount;
        if base.checked_mul(Decimal::from(3)).is_none() {
            return bad(format!("stake.base_amount {base} is too large"));
        }
        for (name, multiple) in [
            ("detector.small_multiple", self.detector.small_multiple),
            ("detector.big_multiple", self.detector.big_multiple),
            ("strategy.partial_coverage_multiple", self.strategy.partial_coverage_multiple),
        ] {
            if multiple < Decimal::ZERO {
                return bad(format!("{name} must not be negative, got {multiple}"));
            }
            if base.checked_mul(multiple).is_none() {
                return bad(format!("{name} {multiple} times stake.base_amount {base} overflows"));
            }
        }

        if self.strategy.split_ratio < Decimal::ZERO || self.strategy.split_ratio > Decimal::ONE {
            return bad(format!("strategy.split_ratio must be within [0, 1], got {}", self.strategy.split_ratio));
        }

        Ok(())
    }
}
