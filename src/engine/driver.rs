//! Simulation driver: the strict left-to-right fold over outcomes.
//!
//! Seeds the synthetic zeroth record, then for each outcome obtains odds
//! (supplied or generated), asks the strategy for the next record, lets
//! the detector annotate it and hands it forward as `previous`.

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::odds::OddsGenerator;
use crate::strategy::risk::PatternDetector;
use crate::strategy::Strategy;
use crate::types::{Channel, Odds, RoundInput, RoundRecord, TrainerError};

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Parse a `/`-separated outcome string into oldest-first order.
///
/// The string reads newest-first, so the parsed tokens are reversed.
/// Tokens that are not F, X or L are dropped.
pub fn parse_events(input: &str) -> Result<Vec<Channel>, TrainerError> {
    let mut events: Vec<Channel> = input
        .split('/')
        .filter_map(|token| match token.parse::<Channel>() {
            Ok(channel) => Some(channel),
            Err(_) => {
                if !token.trim().is_empty() {
                    debug!(token = token.trim(), "Dropping invalid outcome token");
                }
                None
            }
        })
        .collect();

    if events.is_empty() {
        return Err(TrainerError::EmptySequence);
    }
    events.reverse();
    Ok(events)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One simulation run. Owns its odds source and detector window, so two
/// runs never share state.
pub struct Simulation<'a> {
    strategy: &'a dyn Strategy,
    odds: OddsGenerator,
    detector: PatternDetector,
}

impl<'a> Simulation<'a> {
    pub fn new(config: &AppConfig, strategy: &'a dyn Strategy) -> Self {
        Self::with_generator(config, strategy, OddsGenerator::from_config(&config.odds))
    }

    /// Use a caller-built odds generator (e.g. with a scripted random source).
    pub fn with_generator(
        config: &AppConfig,
        strategy: &'a dyn Strategy,
        odds: OddsGenerator,
    ) -> Self {
        Self {
            strategy,
            odds,
            detector: PatternDetector::new(config.detector.clone(), config.stake.base_amount),
        }
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy
    }

    /// Simulate `outcomes` (oldest first). `supplied[i]` is used as the
    /// odds of round `i + 1` when present; missing rounds get generated
    /// odds. Returns one record per outcome, oldest first.
    pub fn run(
        mut self,
        outcomes: &[Channel],
        supplied: &[Odds],
    ) -> Result<Vec<RoundRecord>, TrainerError> {
        if outcomes.is_empty() {
            return Err(TrainerError::EmptySequence);
        }

        info!(
            strategy = self.strategy.name(),
            rounds = outcomes.len(),
            supplied_odds = supplied.len().min(outcomes.len()),
            "Simulation started"
        );

        let mut records = Vec::with_capacity(outcomes.len());
        let mut previous = RoundRecord::genesis();

        for (i, outcome) in outcomes.iter().enumerate() {
            let odds = match supplied.get(i) {
                Some(odds) => *odds,
                None => self.odds.generate(),
            };
            let input = RoundInput {
                index: i + 1,
                outcome: *outcome,
                odds,
            };

            let mut record = self.strategy.calculate(&input, &previous)?;
            record.pattern = self.detector.inspect(&record);
            debug!(round = record.index, "{record}");

            previous = record.clone();
            records.push(record);
        }

        info!(
            strategy = self.strategy.name(),
            rounds = records.len(),
            total = %previous.total,
            "Simulation finished"
        );
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
