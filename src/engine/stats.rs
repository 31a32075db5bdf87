//! Summary statistics over a finished run.
//!
//! Aggregates outcome distribution, peak stakes and carries, run lengths
//! and flagged-round counts, and renders them as a console report or a
//! JSON summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Channel, PerChannel, RoundRecord, Severity};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub rounds: usize,
    pub outcome_counts: PerChannel<usize>,
    /// Share of rounds won by each channel, in percent.
    pub outcome_percentages: PerChannel<f64>,
    pub max_stake: PerChannel<Decimal>,
    pub max_carry: PerChannel<Decimal>,
    /// Longest run of consecutive identical outcomes per channel.
    pub longest_run: PerChannel<u32>,
    /// Longest run of rounds without an F win.
    pub longest_without_f: u32,
    /// Total of the newest record.
    pub final_total: Decimal,
    pub severity_counts: BTreeMap<Severity, usize>,
    pub written_off: Decimal,
    pub credited: Decimal,
}

impl Stats {
    /// Compute statistics from records ordered oldest first.
    pub fn from_records(records: &[RoundRecord]) -> Self {
        let mut outcome_counts = PerChannel::splat(0usize);
        let mut max_stake = PerChannel::splat(Decimal::ZERO);
        let mut max_carry = PerChannel::splat(Decimal::ZERO);
        let mut longest_run = PerChannel::splat(0u32);
        let mut longest_without_f = 0u32;
        let mut severity_counts = BTreeMap::new();
        let mut written_off = Decimal::ZERO;
        let mut credited = Decimal::ZERO;

        let mut run: Option<(Channel, u32)> = None;

        for record in records {
            for channel in Channel::ALL {
                max_stake[channel] = max_stake[channel].max(record.stakes[channel]);
                max_carry[channel] = max_carry[channel].max(record.carries[channel]);
            }
            longest_without_f = longest_without_f.max(record.streaks.f);
            written_off = written_off.saturating_add(record.ledger.written_off);
            credited = credited.saturating_add(record.ledger.credited);

            if let Some(severity) = record.pattern.severity {
                *severity_counts.entry(severity).or_insert(0) += 1;
            }

            let Some(outcome) = record.outcome else {
                continue;
            };
            outcome_counts[outcome] += 1;

            let length = match run {
                Some((channel, length)) if channel == outcome => length + 1,
                _ => 1,
            };
            longest_run[outcome] = longest_run[outcome].max(length);
            run = Some((outcome, length));
        }

        let rounds = records.len();
        let outcome_percentages = outcome_counts.map(|_, count| {
            if rounds == 0 {
                0.0
            } else {
                *count as f64 / rounds as f64 * 100.0
            }
        });

        Self {
            rounds,
            outcome_counts,
            outcome_percentages,
            max_stake,
            max_carry,
            longest_run,
            longest_without_f,
            final_total: records.last().map(|r| r.total).unwrap_or(Decimal::ZERO),
            severity_counts,
            written_off,
            credited,
        }
    }

    pub fn flagged_rounds(&self) -> usize {
        self.severity_counts.values().sum()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{:^60}", "TRAINER REPORT")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\nOutcome distribution:")?;
        for (channel, count) in self.outcome_counts.iter() {
            writeln!(f, "   {channel}: {count} ({:.1}%)", self.outcome_percentages[channel])?;
        }

        writeln!(f, "\nMax stakes:")?;
        for (channel, stake) in self.max_stake.iter() {
            writeln!(f, "   {channel}: {}", stake.round())?;
        }

        writeln!(f, "\nMax carries:")?;
        for (channel, carry) in self.max_carry.iter() {
            writeln!(f, "   {channel}: {}", carry.round())?;
        }

        writeln!(f, "\nLongest runs:")?;
        for (channel, run) in self.longest_run.iter() {
            writeln!(f, "   {channel}: {run}")?;
        }
        writeln!(f, "   without F: {}", self.longest_without_f)?;

        if !self.severity_counts.is_empty() {
            writeln!(f, "\nFlagged rounds:")?;
            for severity in Severity::PRIORITY {
                if let Some(count) = self.severity_counts.get(&severity) {
                    writeln!(f, "   {severity}: {count}")?;
                }
            }
        }

        writeln!(f, "\n   Records: {}", self.rounds)?;
        if self.written_off > Decimal::ZERO {
            writeln!(f, "   Written off: {}", self.written_off.round())?;
        }
        if self.credited > Decimal::ZERO {
            writeln!(f, "   Deferrals credited: {}", self.credited.round())?;
        }
        writeln!(f, "   Final total: {}", self.final_total.round())?;
        write!(f, "{rule}")
    }
}

// ---------------------------------------------------------------------------
// Serialisable summary
// ---------------------------------------------------------------------------

/// JSON summary written next to the output table.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub generated_at: DateTime<Utc>,
    pub strategy: String,
    pub stats: Stats,
}

impl SimulationSummary {
    pub fn new(strategy: &str, records: &[RoundRecord]) -> Self {
        Self {
            generated_at: Utc::now(),
            strategy: strategy.to_string(),
            stats: Stats::from_records(records),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
