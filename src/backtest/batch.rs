//! Batch processing of recorded games.
//!
//! Every `<strategy>[-<flag>].input` file in a directory is replayed with
//! the strategy named by its prefix and written next to it as a
//! newest-first `<name>.actual` table. Flagged files run only when their
//! flag is active, unflagged files only when no flag is.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::regression::input_files;
use crate::config::AppConfig;
use crate::engine::Simulation;
use crate::storage;
use crate::strategy::StrategyRegistry;
use crate::types::{Odds, TrainerError};

/// Flags a file name may carry after the strategy prefix.
pub const REGISTERED_FLAGS: [&str; 1] = ["hockey"];

/// What happened to each file of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    /// Inactive flag or output already up to date.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// `<strategy>[-<flag>]` split of an input file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputName {
    pub strategy: String,
    pub flag: Option<String>,
}

impl InputName {
    pub fn parse(stem: &str) -> Self {
        let mut parts = stem.split('-');
        let strategy = parts.next().unwrap_or_default().to_string();
        let flag = parts.last().map(str::to_string);
        Self { strategy, flag }
    }
}

/// Whether a file with `flag` runs when the hockey flag is `hockey`.
fn is_active(flag: Option<&str>, hockey: bool) -> Result<bool, TrainerError> {
    match flag {
        None => Ok(!hockey),
        Some(f) if REGISTERED_FLAGS.contains(&f) => Ok(hockey && f == "hockey"),
        Some(f) => Err(TrainerError::Config(format!(
            "flag '{f}' is not registered (registered: {})",
            REGISTERED_FLAGS.join(", ")
        ))),
    }
}

/// An existing `.actual` with as many non-empty lines as the input is
/// considered current.
fn is_up_to_date(input: &Path, actual: &Path) -> bool {
    if !actual.exists() {
        return false;
    }
    match (storage::count_lines(input), storage::count_lines(actual)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn process_file(input: &Path, actual: &Path, config: &AppConfig, strategy_name: &str) -> Result<()> {
    let registry = StrategyRegistry::new(config);
    let strategy = registry.get(strategy_name)?;

    let rounds = storage::load_input(input)?;
    let outcomes: Vec<_> = rounds.iter().map(|r| r.outcome).collect();
    let odds: Vec<Odds> = rounds.iter().map(|r| r.odds).collect();

    let records = Simulation::new(config, strategy).run(&outcomes, &odds)?;
    storage::save_table(actual, &records)
}

/// Process every input file in `dir`. Files with an unregistered flag
/// abort the run; per-file failures are collected in the report.
pub fn process_directory(dir: &Path, config: &AppConfig, hockey: bool) -> Result<BatchReport> {
    if !dir.is_dir() {
        bail!("Directory {} does not exist", dir.display());
    }

    let mut config = config.clone();
    config.odds.swap_channels = hockey;

    let files = input_files(dir)?;
    info!(dir = %dir.display(), files = files.len(), hockey, "Batch started");

    let mut report = BatchReport::default();
    for input in files {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = InputName::parse(&stem);

        if !is_active(name.flag.as_deref(), hockey)? {
            debug!(file = %input.display(), flag = ?name.flag, "Skipping file, flag not active");
            report.skipped.push(input);
            continue;
        }

        let actual = input.with_extension("actual");
        if is_up_to_date(&input, &actual) {
            debug!(file = %input.display(), "Skipping file, output up to date");
            report.skipped.push(input);
            continue;
        }

        match process_file(&input, &actual, &config, &name.strategy) {
            Ok(()) => {
                info!(file = %input.display(), output = %actual.display(), "Processed");
                report.processed.push(input);
            }
            Err(e) => {
                error!(file = %input.display(), error = %format!("{e:#}"), "Processing failed");
                report.failed.push((input, format!("{e:#}")));
            }
        }
    }

    Ok(report)
}
