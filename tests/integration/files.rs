//! Table codec, regression harness and batch processing against real files.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use rust_decimal_macros::dec;
use trainer::backtest::{self, batch::BatchReport};
use trainer::config::AppConfig;
use trainer::engine::{parse_events, Simulation};
use trainer::storage;
use trainer::strategy::StrategyRegistry;
use trainer::types::{Ledger, RoundRecord, TrainerError};

use crate::{seeded_config, HISTORY};

fn simulate(config: &AppConfig, name: &str, events: &str) -> Vec<RoundRecord> {
    let registry = StrategyRegistry::new(config);
    let strategy = registry.get(name).unwrap();
    let events = parse_events(events).unwrap();
    Simulation::new(config, strategy).run(&events, &[]).unwrap()
}

fn write_input_file(path: &Path, records: &[RoundRecord]) {
    let file = File::create(path).unwrap();
    storage::write_input(BufWriter::new(file), records).unwrap();
}

#[test]
fn test_table_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    let mut records = simulate(&seeded_config(5), "xlDrop", HISTORY);

    storage::save_table(&path, &records).unwrap();
    let mut loaded = storage::load_table(&path).unwrap();

    // File is newest first.
    assert_eq!(loaded[0].index, records.len());
    loaded.reverse();

    // The ledger has no column in the table.
    for r in &mut records {
        r.ledger = Ledger::default();
    }
    assert_eq!(loaded, records);
}

#[test]
fn test_report_stats_from_saved_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    let records = simulate(&seeded_config(6), "basic", "F/X/L/L/F");
    storage::save_table(&path, &records).unwrap();

    let mut loaded = storage::load_table(&path).unwrap();
    loaded.reverse();
    let stats = trainer::engine::Stats::from_records(&loaded);
    assert_eq!(stats.rounds, 5);
    assert_eq!(stats.final_total, dec!(50000));
}

#[test]
fn test_regression_suite_passes_and_fails() {
    let config = seeded_config(8);
    let dir = tempfile::tempdir().unwrap();
    let records = simulate(&config, "xlWithSupport", HISTORY);

    // Case that matches.
    write_input_file(&dir.path().join("good.input"), &records);
    storage::save_table(&dir.path().join("good.expected"), &records).unwrap();

    // Case whose expected table was tampered with.
    let mut tampered = records.clone();
    tampered[0].total += dec!(500);
    write_input_file(&dir.path().join("tampered.input"), &records);
    storage::save_table(&dir.path().join("tampered.expected"), &tampered).unwrap();

    // Case without an expected table.
    write_input_file(&dir.path().join("orphan.input"), &records);

    let registry = StrategyRegistry::new(&config);
    let strategy = registry.get("xlWithSupport").unwrap();
    let report = backtest::run_suite(dir.path(), &config, strategy).unwrap();

    assert_eq!(report.cases.len(), 3);
    let case = |name: &str| report.cases.iter().find(|c| c.name == name).unwrap();

    assert!(case("good").passed);

    let tampered = case("tampered");
    assert!(!tampered.passed);
    assert_eq!(tampered.differences.len(), 1);
    assert!(tampered.differences[0].contains("total mismatch"));

    let orphan = case("orphan");
    assert!(!orphan.passed);
    assert!(orphan.error.as_deref().unwrap().contains("not found"));

    assert_eq!(report.passed(), 1);
    assert!(!report.all_passed());
}

#[test]
fn test_regression_count_mismatch() {
    let config = seeded_config(9);
    let dir = tempfile::tempdir().unwrap();
    let records = simulate(&config, "xlDrop", "F/X/L/F");

    write_input_file(&dir.path().join("short.input"), &records);
    storage::save_table(&dir.path().join("short.expected"), &records[..2]).unwrap();

    let registry = StrategyRegistry::new(&config);
    let report = backtest::run_suite(dir.path(), &config, registry.get("xlDrop").unwrap()).unwrap();
    assert_eq!(
        report.cases[0].differences,
        vec!["Record count mismatch: actual=4, expected=2".to_string()]
    );
}

#[test]
fn test_batch_processes_active_files_once() {
    let config = seeded_config(10);
    let dir = tempfile::tempdir().unwrap();
    let records = simulate(&config, "xlDrop", HISTORY);

    write_input_file(&dir.path().join("xlDrop.input"), &records);
    write_input_file(&dir.path().join("basic-hockey.input"), &records);

    let report = backtest::process_directory(dir.path(), &config, false).unwrap();
    assert_eq!(report.processed, vec![dir.path().join("xlDrop.input")]);
    assert_eq!(report.skipped, vec![dir.path().join("basic-hockey.input")]);
    assert!(report.failed.is_empty());

    let actual = dir.path().join("xlDrop.actual");
    let replayed = storage::load_table(&actual).unwrap();
    assert_eq!(replayed.len(), records.len());
    assert_eq!(
        storage::count_lines(&actual).unwrap(),
        storage::count_lines(&dir.path().join("xlDrop.input")).unwrap()
    );

    // Second pass finds the output current.
    let again = backtest::process_directory(dir.path(), &config, false).unwrap();
    assert!(again.processed.is_empty());
    assert_eq!(again.skipped.len(), 2);

    // Hockey pass only touches the flagged file.
    let hockey = backtest::process_directory(dir.path(), &config, true).unwrap();
    assert_eq!(hockey.processed, vec![dir.path().join("basic-hockey.input")]);
    assert!(dir.path().join("basic-hockey.actual").exists());
}

#[test]
fn test_batch_reports_unknown_strategy_and_rejects_unknown_flag() {
    let config = AppConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let records = simulate(&seeded_config(12), "basic", "F/X/L");

    write_input_file(&dir.path().join("martingale.input"), &records);
    let report: BatchReport = backtest::process_directory(dir.path(), &config, false).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("martingale"));

    write_input_file(&dir.path().join("xlDrop-tennis.input"), &records);
    assert!(backtest::process_directory(dir.path(), &config, false).is_err());

    fs::remove_file(dir.path().join("xlDrop-tennis.input")).unwrap();
    assert!(backtest::process_directory(&dir.path().join("missing"), &config, false).is_err());
}

#[test]
fn test_schedule_with_odds_barely_above_one_fails_cleanly() {
    let config = AppConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("xlDrop.input");
    fs::write(
        &path,
        "Result,OddF,OddX,OddL\nX,1.0000000000000000000000000001,3.50,4.00\n",
    )
    .unwrap();

    let rounds = storage::load_input(&path).unwrap();
    assert_eq!(rounds.len(), 1);
    let outcomes: Vec<_> = rounds.iter().map(|r| r.outcome).collect();
    let odds: Vec<_> = rounds.iter().map(|r| r.odds).collect();
    let registry = StrategyRegistry::new(&config);
    let result = Simulation::new(&config, registry.get("xlDrop").unwrap()).run(&outcomes, &odds);
    assert!(matches!(result, Err(TrainerError::Overflow { index: 1 })));

    let report = backtest::process_directory(dir.path(), &config, false).unwrap();
    assert!(report.processed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].1.contains("overflow on round 1"));
    assert!(!dir.path().join("xlDrop.actual").exists());
}
