//! Regression harness.
//!
//! Replays every `<case>.input` schedule in a directory and compares the
//! newest-first records against the sibling `<case>.expected` table.
//! Problems are reported per case, never raised.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::engine::Simulation;
use crate::storage;
use crate::strategy::Strategy;
use crate::types::{Odds, RoundRecord};

const ODDS_TOLERANCE: Decimal = dec!(0.01);
const AMOUNT_TOLERANCE: Decimal = dec!(1);

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a single regression case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    pub name: String,
    pub passed: bool,
    /// Set when the case could not be run at all.
    pub error: Option<String>,
    pub differences: Vec<String>,
}

impl CaseResult {
    fn failed(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            error: Some(error),
            differences: Vec::new(),
        }
    }
}

/// All case results of one suite run.
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub cases: Vec<CaseResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn success_rate(&self) -> f64 {
        if self.cases.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.cases.len() as f64 * 100.0
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{:^60}", "REGRESSION RESULTS")?;
        writeln!(f, "{rule}")?;

        for case in &self.cases {
            if case.passed {
                writeln!(f, "PASS {}", case.name)?;
                continue;
            }
            writeln!(f, "FAIL {}", case.name)?;
            if let Some(error) = &case.error {
                writeln!(f, "   Error: {error}")?;
            }
            for diff in &case.differences {
                writeln!(f, "   {diff}")?;
            }
        }

        writeln!(f, "\nSummary:")?;
        writeln!(f, "   Total: {}", self.cases.len())?;
        writeln!(f, "   Passed: {}", self.passed())?;
        writeln!(f, "   Failed: {}", self.failed())?;
        write!(f, "   Success rate: {:.1}%", self.success_rate())
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

fn within(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// Field-by-field comparison of two newest-first record lists.
/// A length mismatch yields a single difference line.
pub fn compare(actual: &[RoundRecord], expected: &[RoundRecord]) -> Vec<String> {
    if actual.len() != expected.len() {
        return vec![format!(
            "Record count mismatch: actual={}, expected={}",
            actual.len(),
            expected.len()
        )];
    }

    let mut differences = Vec::new();
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let row = i + 1;
        let mut diff = |field: &str, actual: String, expected: String| {
            differences.push(format!(
                "Row {row}: {field} mismatch - actual={actual}, expected={expected}"
            ));
        };

        if a.index != e.index {
            diff("event_number", a.index.to_string(), e.index.to_string());
        }
        if a.outcome != e.outcome {
            diff("result", format!("{:?}", a.outcome), format!("{:?}", e.outcome));
        }

        for ((channel, av), (_, ev)) in a.odds.iter().zip(e.odds.iter()) {
            if !within(*av, *ev, ODDS_TOLERANCE) {
                diff(&format!("odd{channel}"), format!("{av:.2}"), format!("{ev:.2}"));
            }
        }
        for ((channel, av), (_, ev)) in a.stakes.iter().zip(e.stakes.iter()) {
            if !within(*av, *ev, AMOUNT_TOLERANCE) {
                diff(&format!("bet{channel}"), format!("{av:.0}"), format!("{ev:.0}"));
            }
        }
        for ((channel, av), (_, ev)) in a.carries.iter().zip(e.carries.iter()) {
            if !within(*av, *ev, AMOUNT_TOLERANCE) {
                diff(&format!("loss{channel}"), format!("{av:.0}"), format!("{ev:.0}"));
            }
        }
        if !within(a.total, e.total, AMOUNT_TOLERANCE) {
            diff("total", format!("{:.0}", a.total), format!("{:.0}", e.total));
        }
        for ((channel, av), (_, ev)) in a.streaks.iter().zip(e.streaks.iter()) {
            if av.abs_diff(*ev) > 1 {
                diff(&format!("u{}", channel.as_str().to_lowercase()), av.to_string(), ev.to_string());
            }
        }

        let (pa, pe) = (a.pattern.label(), e.pattern.label());
        if pa != pe {
            diff("pattern", pa, pe);
        }
    }
    differences
}

// ---------------------------------------------------------------------------
// Running cases
// ---------------------------------------------------------------------------

/// Replay one schedule and compare it with its expected table.
pub fn run_case(
    input: &Path,
    expected: &Path,
    config: &AppConfig,
    strategy: &dyn Strategy,
) -> CaseResult {
    let name = case_name(input);

    let rounds = match storage::load_input(input) {
        Ok(rounds) => rounds,
        Err(e) => return CaseResult::failed(&name, format!("Error parsing input file: {e:#}")),
    };
    let outcomes: Vec<_> = rounds.iter().map(|r| r.outcome).collect();
    let odds: Vec<Odds> = rounds.iter().map(|r| r.odds).collect();

    let mut actual = match Simulation::new(config, strategy).run(&outcomes, &odds) {
        Ok(records) => records,
        Err(e) => return CaseResult::failed(&name, format!("Error processing input: {e}")),
    };
    actual.reverse();

    let expected = match storage::load_table(expected) {
        Ok(records) => records,
        Err(e) => return CaseResult::failed(&name, format!("Error reading expected file: {e:#}")),
    };

    let differences = compare(&actual, &expected);
    CaseResult {
        name,
        passed: differences.is_empty(),
        error: None,
        differences,
    }
}

fn case_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `.input` files in `dir`, sorted by name.
pub(crate) fn input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "input"))
        .collect();
    files.sort();
    Ok(files)
}

/// Run every case in `dir`. A missing `.expected` sibling is a failed case.
pub fn run_suite(dir: &Path, config: &AppConfig, strategy: &dyn Strategy) -> Result<SuiteReport> {
    let mut report = SuiteReport::default();

    for input in input_files(dir)? {
        let expected = input.with_extension("expected");
        let result = if expected.exists() {
            run_case(&input, &expected, config, strategy)
        } else {
            CaseResult::failed(
                &case_name(&input),
                format!("Expected file {} not found", expected.display()),
            )
        };

        if result.passed {
            info!(case = %result.name, "Regression case passed");
        } else {
            warn!(
                case = %result.name,
                differences = result.differences.len(),
                error = result.error.as_deref().unwrap_or(""),
                "Regression case failed"
            );
        }
        report.cases.push(result);
    }

    info!(
        dir = %dir.display(),
        strategy = strategy.name(),
        total = report.cases.len(),
        passed = report.passed(),
        "Regression suite finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
