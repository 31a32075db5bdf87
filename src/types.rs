//! Shared types for the TRAINER simulator.
//!
//! These types form the data model used across all modules.
//! Strategies, the detector, the driver and the table codec all speak
//! in terms of [`RoundRecord`], so it lives here to avoid circular
//! references between them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// One of the three mutually exclusive outcome channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    F,
    X,
    L,
}

impl Channel {
    /// All channels in column order.
    pub const ALL: [Channel; 3] = [Channel::F, Channel::X, Channel::L];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::F => "F",
            Channel::X => "X",
            Channel::L => "L",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = TrainerError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "F" => Ok(Channel::F),
            "X" => Ok(Channel::X),
            "L" => Ok(Channel::L),
            other => Err(TrainerError::InvalidInput(format!(
                "unknown outcome '{other}': must be F, X or L"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-channel values
// ---------------------------------------------------------------------------

/// A value held for each of the three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerChannel<T> {
    pub f: T,
    pub x: T,
    pub l: T,
}

impl<T> PerChannel<T> {
    pub fn new(f: T, x: T, l: T) -> Self {
        Self { f, x, l }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> + '_ {
        Channel::ALL.into_iter().map(move |c| (c, &self[c]))
    }

    pub fn map<U>(&self, mut op: impl FnMut(Channel, &T) -> U) -> PerChannel<U> {
        PerChannel {
            f: op(Channel::F, &self.f),
            x: op(Channel::X, &self.x),
            l: op(Channel::L, &self.l),
        }
    }
}

impl<T: Clone> PerChannel<T> {
    pub fn splat(value: T) -> Self {
        Self {
            f: value.clone(),
            x: value.clone(),
            l: value,
        }
    }
}

impl<T> Index<Channel> for PerChannel<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        match channel {
            Channel::F => &self.f,
            Channel::X => &self.x,
            Channel::L => &self.l,
        }
    }
}

impl<T> IndexMut<Channel> for PerChannel<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        match channel {
            Channel::F => &mut self.f,
            Channel::X => &mut self.x,
            Channel::L => &mut self.l,
        }
    }
}

/// Payout odds for one round, one multiplier per channel.
pub type Odds = PerChannel<Decimal>;

// ---------------------------------------------------------------------------
// Severity & pattern labels
// ---------------------------------------------------------------------------

/// Exposure severity assigned by the pattern detector.
/// Ordered so that `Red > Yellow > Green`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl Severity {
    /// Detection priority: the first matching label wins.
    pub const PRIORITY: [Severity; 3] = [Severity::Red, Severity::Yellow, Severity::Green];

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Green => "GREEN",
            Severity::Yellow => "YELLOW",
            Severity::Red => "RED",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREEN" => Ok(Severity::Green),
            "YELLOW" => Ok(Severity::Yellow),
            "RED" => Ok(Severity::Red),
            other => Err(TrainerError::InvalidInput(format!("unknown severity '{other}'"))),
        }
    }
}

/// Everything the detector reported for one round: at most one
/// severity plus any window-shaped streak labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub severity: Option<Severity>,
    pub flags: Vec<String>,
}

impl Pattern {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none() && self.flags.is_empty()
    }

    /// Labels joined with `_`, severity first. Empty when nothing fired.
    pub fn label(&self) -> String {
        self.severity
            .iter()
            .map(|s| s.label().to_string())
            .chain(self.flags.iter().cloned())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Inverse of [`Pattern::label`]. Tokens that are not a severity are
    /// kept as streak flags.
    pub fn parse(label: &str) -> Self {
        let mut pattern = Pattern::default();
        for token in label.trim().split('_').filter(|t| !t.is_empty()) {
            match token.parse::<Severity>() {
                Ok(severity) if pattern.severity.is_none() => pattern.severity = Some(severity),
                _ => pattern.flags.push(token.to_string()),
            }
        }
        pattern
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ---------------------------------------------------------------------------
// Round record
// ---------------------------------------------------------------------------

/// Bookkeeping carried alongside a record that has no column in the
/// output table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// Excess held back from channels past their streak ceiling, credited
    /// to the total when that channel next wins.
    pub deferred: PerChannel<Decimal>,
    /// Excess discarded by the circuit breaker this round.
    pub written_off: Decimal,
    /// Deferred amount credited back to the total this round.
    pub credited: Decimal,
}

/// One simulated round. Produced once by a strategy, annotated once by
/// the detector, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based position, oldest first. 0 for the synthetic seed record.
    pub index: usize,
    /// Winning channel; `None` only for the synthetic seed record.
    pub outcome: Option<Channel>,
    pub odds: Odds,
    pub stakes: PerChannel<Decimal>,
    /// Money outstanding on each channel after resolution.
    pub carries: PerChannel<Decimal>,
    /// Cumulative money committed across all rounds.
    pub total: Decimal,
    /// Rounds since each channel last won (0 = won this round).
    pub streaks: PerChannel<u32>,
    pub pattern: Pattern,
    pub ledger: Ledger,
}

impl RoundRecord {
    /// The synthetic zeroth record that seeds the chain.
    pub fn genesis() -> Self {
        Self::default()
    }

    pub fn is_genesis(&self) -> bool {
        self.outcome.is_none()
    }

    /// Channels whose streak is zero.
    pub fn winners(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.streaks[*c] == 0)
            .collect()
    }

    /// The six exposure metrics inspected by the detector:
    /// stakes F/X/L then carries F/X/L.
    pub fn exposure_metrics(&self) -> [Decimal; 6] {
        [
            self.stakes.f,
            self.stakes.x,
            self.stakes.l,
            self.carries.f,
            self.carries.x,
            self.carries.l,
        ]
    }
}

impl fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.outcome.map(|c| c.as_str()).unwrap_or("N");
        write!(
            f,
            "#{} {} | bets F={} X={} L={} | loss F={} X={} L={} | total={} | streaks {}/{}/{}",
            self.index,
            outcome,
            self.stakes.f,
            self.stakes.x,
            self.stakes.l,
            self.carries.f,
            self.carries.x,
            self.carries.l,
            self.total,
            self.streaks.f,
            self.streaks.x,
            self.streaks.l,
        )?;
        if !self.pattern.is_empty() {
            write!(f, " | {}", self.pattern)?;
        }
        Ok(())
    }
}

/// Inputs for one round before the strategy fills in stakes and state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundInput {
    pub index: usize,
    pub outcome: Channel,
    pub odds: Odds,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TRAINER.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("Invalid odds on round {index}: {channel}={odd} (must be greater than 1)")]
    InvalidOdds {
        index: usize,
        channel: Channel,
        odd: Decimal,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Arithmetic overflow on round {index}: stakes or carries exceed the representable range")]
    Overflow { index: usize },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Strategy '{name}' not found. Available strategies: {available}")]
    UnknownStrategy { name: String, available: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No valid F/X/L outcomes in input")]
    EmptySequence,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
