//! Persistence layer.
//!
//! Reads and writes the 16-column round table, reads `.input` schedules
//! (outcome plus supplied odds per round) and writes the JSON run
//! summary. The codecs work on any `BufRead`/`Write`; the `*_file`
//! helpers add path handling and context for the binary.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::engine::SimulationSummary;
use crate::types::{Channel, Ledger, Pattern, PerChannel, RoundInput, RoundRecord, TrainerError};

/// Column names of the round table, in order.
pub const TABLE_HEADER: [&str; 16] = [
    "event_number",
    "result",
    "oddF",
    "oddX",
    "oddL",
    "betF",
    "betX",
    "betL",
    "lossF",
    "lossX",
    "lossL",
    "total",
    "uf",
    "ux",
    "ul",
    "pattern",
];

/// Column names of an `.input` schedule.
pub const INPUT_HEADER: [&str; 4] = ["result", "oddF", "oddX", "oddL"];

// ---------------------------------------------------------------------------
// Round table
// ---------------------------------------------------------------------------

fn encode_row(record: &RoundRecord) -> String {
    let outcome = record.outcome.map(|c| c.as_str()).unwrap_or("");
    let money = |d: Decimal| format!("{:.0}", d);
    [
        record.index.to_string(),
        outcome.to_string(),
        format!("{:.2}", record.odds.f),
        format!("{:.2}", record.odds.x),
        format!("{:.2}", record.odds.l),
        money(record.stakes.f),
        money(record.stakes.x),
        money(record.stakes.l),
        money(record.carries.f),
        money(record.carries.x),
        money(record.carries.l),
        money(record.total),
        record.streaks.f.to_string(),
        record.streaks.x.to_string(),
        record.streaks.l.to_string(),
        record.pattern.label(),
    ]
    .join(",")
}

/// Write the header and one row per record, in the order given.
pub fn write_table<W: Write>(mut writer: W, records: &[RoundRecord]) -> std::io::Result<()> {
    writeln!(writer, "{}", TABLE_HEADER.join(","))?;
    for record in records {
        writeln!(writer, "{}", encode_row(record))?;
    }
    writer.flush()
}

/// Field-level parsing context for one table or input line.
struct Row<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    fn new(line: usize, text: &'a str, expected: usize) -> Result<Self, TrainerError> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() != expected {
            return Err(TrainerError::Parse {
                line,
                message: format!("expected {expected} fields, got {}", fields.len()),
            });
        }
        Ok(Self { line, fields })
    }

    fn error(&self, column: &str, message: impl std::fmt::Display) -> TrainerError {
        TrainerError::Parse {
            line: self.line,
            message: format!("{column}: {message}"),
        }
    }

    fn parse<T>(&self, i: usize, column: &str) -> Result<T, TrainerError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.fields[i];
        raw.parse::<T>()
            .map_err(|e| self.error(column, format!("'{raw}' ({e})")))
    }

    fn channel(&self, i: usize, column: &str) -> Result<Channel, TrainerError> {
        self.fields[i]
            .parse::<Channel>()
            .map_err(|_| self.error(column, format!("'{}' must be F, X or L", self.fields[i])))
    }

    fn triple(&self, start: usize, columns: [&str; 3]) -> Result<PerChannel<Decimal>, TrainerError> {
        Ok(PerChannel::new(
            self.parse(start, columns[0])?,
            self.parse(start + 1, columns[1])?,
            self.parse(start + 2, columns[2])?,
        ))
    }
}

fn decode_row(row: &Row<'_>) -> Result<RoundRecord, TrainerError> {
    Ok(RoundRecord {
        index: row.parse(0, "event_number")?,
        outcome: Some(row.channel(1, "result")?),
        odds: row.triple(2, ["oddF", "oddX", "oddL"])?,
        stakes: row.triple(5, ["betF", "betX", "betL"])?,
        carries: row.triple(8, ["lossF", "lossX", "lossL"])?,
        total: row.parse(11, "total")?,
        streaks: PerChannel::new(row.parse(12, "uf")?, row.parse(13, "ux")?, row.parse(14, "ul")?),
        pattern: Pattern::parse(row.fields[15]),
        ledger: Ledger::default(),
    })
}

/// Non-empty lines after the header, with their 1-based line numbers. The
/// first non-empty line is the header and is skipped whatever it holds.
fn data_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, TrainerError> {
    let mut lines = Vec::new();
    let mut header_seen = false;
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let text = line.map_err(|e| TrainerError::Parse {
            line: line_no,
            message: e.to_string(),
        })?;
        if text.trim().is_empty() {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        lines.push((line_no, text));
    }
    Ok(lines)
}

/// Read a round table. Rows come back in file order; the header row and
/// blank lines are skipped.
pub fn read_table<R: BufRead>(reader: R) -> Result<Vec<RoundRecord>, TrainerError> {
    let mut records = Vec::new();
    for (line_no, text) in data_lines(reader)? {
        let row = Row::new(line_no, &text, TABLE_HEADER.len())?;
        records.push(decode_row(&row)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Input schedules
// ---------------------------------------------------------------------------

/// Read an `.input` schedule: a header row, then rows of
/// `result,oddF,oddX,oddL`, oldest first. Rounds are numbered from 1 in
/// file order.
pub fn read_input<R: BufRead>(reader: R) -> Result<Vec<RoundInput>, TrainerError> {
    let mut rounds = Vec::new();
    for (line_no, text) in data_lines(reader)? {
        let row = Row::new(line_no, text.trim(), INPUT_HEADER.len())?;
        rounds.push(RoundInput {
            index: rounds.len() + 1,
            outcome: row.channel(0, "result")?,
            odds: row.triple(1, ["oddF", "oddX", "oddL"])?,
        });
    }
    Ok(rounds)
}

/// Write an `.input` schedule from records ordered oldest first.
pub fn write_input<W: Write>(mut writer: W, records: &[RoundRecord]) -> std::io::Result<()> {
    writeln!(writer, "{}", INPUT_HEADER.join(","))?;
    for record in records {
        let Some(outcome) = record.outcome else {
            continue;
        };
        writeln!(
            writer,
            "{outcome},{:.2},{:.2},{:.2}",
            record.odds.f, record.odds.x, record.odds.l
        )?;
    }
    writer.flush()
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Save records (oldest first) as a newest-first table.
pub fn save_table(path: &Path, records: &[RoundRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create table file {}", path.display()))?;
    let newest_first: Vec<RoundRecord> = records.iter().rev().cloned().collect();
    write_table(BufWriter::new(file), &newest_first)
        .with_context(|| format!("Failed to write table to {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "Table saved");
    Ok(())
}

/// Load a table in file order (newest first for tables this crate wrote).
pub fn load_table(path: &Path) -> Result<Vec<RoundRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open table file {}", path.display()))?;
    let records = read_table(BufReader::new(file))
        .with_context(|| format!("Failed to parse table {}", path.display()))?;

    debug!(path = %path.display(), rows = records.len(), "Table loaded");
    Ok(records)
}

pub fn load_input(path: &Path) -> Result<Vec<RoundInput>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    let rounds = read_input(BufReader::new(file))
        .with_context(|| format!("Failed to parse input file {}", path.display()))?;

    debug!(path = %path.display(), rounds = rounds.len(), "Input loaded");
    Ok(rounds)
}

/// Save the JSON run summary.
pub fn save_summary(path: &Path, summary: &SimulationSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialise run summary")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    info!(path = %path.display(), strategy = %summary.strategy, "Summary saved");
    Ok(())
}

/// Number of non-empty lines in a text file.
pub fn count_lines(path: &Path) -> Result<usize> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(contents.lines().filter(|l| !l.trim().is_empty()).count())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
