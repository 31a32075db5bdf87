//! Risk pattern detector.
//!
//! Classifies each round's exposure into a severity label from the
//! magnitude of its stakes and carries, and optionally raises
//! window-shaped streak alerts from the last few outcomes. The label
//! assigned to round `i` is what the circuit breaker reads when the
//! strategy computes round `i + 1`.

use rust_decimal::Decimal;
use std::collections::VecDeque;
use tracing::warn;

use crate::config::{DetectorConfig, StreakAlert};
use crate::types::{Channel, Pattern, RoundRecord, Severity};

pub struct PatternDetector {
    config: DetectorConfig,
    base_amount: Decimal,
    window: VecDeque<Channel>,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig, base_amount: Decimal) -> Self {
        let window = VecDeque::with_capacity(config.window_size + 1);
        Self {
            config,
            base_amount,
            window,
        }
    }

    /// Recent outcomes, oldest first.
    pub fn window(&self) -> &VecDeque<Channel> {
        &self.window
    }

    /// Push an outcome, dropping the oldest once the window is full.
    pub fn observe(&mut self, outcome: Channel) {
        self.window.push_back(outcome);
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }
    }

    // Saturates, so an oversized multiple means nothing ever crosses it.
    fn small_threshold(&self) -> Decimal {
        self.config.small_multiple.saturating_mul(self.base_amount)
    }

    fn big_threshold(&self) -> Decimal {
        self.config.big_multiple.saturating_mul(self.base_amount)
    }

    fn matches(&self, severity: Severity, metrics: &[Decimal; 6]) -> bool {
        let above = |threshold: Decimal| metrics.iter().filter(|m| **m > threshold).count();
        let small = above(self.small_threshold());
        let big = above(self.big_threshold());
        match severity {
            Severity::Red => big >= self.config.red_min_count,
            Severity::Yellow => small >= self.config.yellow_min_count || big >= 1,
            Severity::Green => small >= 1,
        }
    }

    /// Magnitude-based severity of a record; `None` when nothing is elevated.
    pub fn classify(&self, record: &RoundRecord) -> Option<Severity> {
        let metrics = record.exposure_metrics();
        Severity::PRIORITY
            .into_iter()
            .find(|s| self.matches(*s, &metrics))
    }

    fn alert_fires(&self, alert: &StreakAlert) -> bool {
        self.window.len() >= alert.length
            && self
                .window
                .iter()
                .rev()
                .take(alert.length)
                .all(|c| *c != alert.channel)
    }

    /// Labels of every configured streak alert that fires on the current window.
    pub fn streak_flags(&self) -> Vec<String> {
        self.config
            .streak_alerts
            .iter()
            .filter(|a| self.alert_fires(a))
            .map(|a| format!("NO{}{}", a.channel, a.length))
            .collect()
    }

    /// Human-readable rule behind a severity.
    pub fn describe(&self, severity: Severity) -> String {
        let (small, big) = (self.config.small_multiple, self.config.big_multiple);
        match severity {
            Severity::Red => format!(
                "{} or more metrics > {big} * base",
                self.config.red_min_count
            ),
            Severity::Yellow => format!(
                "{} or more metrics > {small} * base or one metric > {big} * base",
                self.config.yellow_min_count
            ),
            Severity::Green => format!("one metric > {small} * base"),
        }
    }

    /// Observe the record's outcome and report everything that fired.
    pub fn inspect(&mut self, record: &RoundRecord) -> Pattern {
        if let Some(outcome) = record.outcome {
            self.observe(outcome);
        }

        let pattern = Pattern {
            severity: self.classify(record),
            flags: self.streak_flags(),
        };

        if let Some(severity) = pattern.severity {
            warn!(
                round = record.index,
                pattern = %severity,
                description = %self.describe(severity),
                "Pattern detected"
            );
        }
        for flag in &pattern.flags {
            warn!(round = record.index, pattern = %flag, "Streak alert");
        }

        pattern
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
