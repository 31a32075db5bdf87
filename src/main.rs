//! TRAINER: progressive loss-recovery staking simulator.
//!
//! Entry point. Parses the command line, initialises structured logging,
//! loads configuration and dispatches to a subcommand: simulate an
//! outcome string, replay a recorded schedule, report on a saved table,
//! process a directory of recorded games or run the regression suite.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use trainer::backtest;
use trainer::config::AppConfig;
use trainer::engine::{parse_events, SimulationSummary, Simulation, Stats};
use trainer::storage;
use trainer::strategy::StrategyRegistry;
use trainer::types::Odds;

/// Built-in outcome history, newest first.
const EVENTS: &str = "X/F/L/X/F/F/X/F/F/X/X/F/F/X/X/F/F/X/F/F/X/F/F/X/X/F/F/F/X/F/L/F/X/X/F/F/X/L/L/X/F/L/F/F/F/X/L/F/F/X/X/L/X/F/F/X/F/F/L/F/F/F/L/F/L/X/F/L/F/L/X/L/F/L/F/F/F/L/L/X/X/F/F/F/L/X/L/F/F/X/L/L/F/F/X/X/F/X/L/F/F/F/X/L/X/L/F/L/F/F/L/F/F/X/F/X/X/F/F/F/F/F/X/F/X/L/L/F/F/F/F/L/L/F/L/F/X/F/F/X/L/L/L/X/X/L/L/F/X/F/F/F/F/F/F/F/F/F/L/F/F/X/L/F/F/X/L/X/X/F/X/F/X/L/F/X/F/F/F/X/F/X/F/X/X/X/F/L/L/X/F/F/F/L/F/F/L/F/L/F/X/F/X/F/F/X/F/F/X/F/F/X/F/F/L/F/F/L/F/F/F/F/F/F/F/F/F/F/L/F/L/F/F/F/F/F/F/X/F/F/F/F/F/F/L/F/F/F/F/F/X/F/F/X/X/L/L/L/F/X/X/X/F/L/F/L/X/X/F/X/F/F/F/F/X/F/L/X/L/L/L/F/F/X/F/F/F/F/X/L/L/F/X/F/F/F/F/F/X/F/F/X/F/F/F/F/F/X/L/F/F/L/F/X/X/F/X/L/X/F/F/F/L/L/F/F/F/X/F/L/L/F/L/F/L/F/L";

/// Built-in hockey outcome history, newest first.
const EVENTS_HOCKEY: &str = "F/X/X/X/L/L/L/L/L/L/F/F/X/X/X/F/F/F/X/L/X/X/X/F/X/L/L/F/X/L/X/F/X/F/L/X/F/F/F/X/L/X/X/X/F/F/F/L/F/F/L/F/L/L/L/F/X/F/L/F/L/L/F/L/X/F/F/F/L/F/F/F/F/F/L/F/F/X/F/F/L/X/F/F/F/F/F/F/L/F/X/F/X/F/X/X/F/F/F/F/F/F/X/L";

#[derive(Parser, Debug)]
#[command(name = "trainer", version, about = "Progressive loss-recovery staking simulator")]
struct Cli {
    /// Configuration file (defaults to ./trainer.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a `/`-separated outcome string (newest first) with generated odds
    Run {
        #[arg(long)]
        input: Option<String>,
        #[arg(long, default_value = "trainer_output.csv")]
        output: PathBuf,
        #[arg(long)]
        strategy: Option<String>,
        /// Hockey schedule: swap X/L odds ranges and default to the hockey history
        #[arg(long)]
        hockey: bool,
        /// Seed for reproducible odds
        #[arg(long)]
        seed: Option<u64>,
        /// Also write a JSON summary
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Replay a `.input` schedule with its recorded odds
    Replay {
        file: PathBuf,
        /// Defaults to the input path with an `.actual` extension
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        hockey: bool,
    },
    /// Print statistics for a saved table
    Report { file: PathBuf },
    /// Process every `.input` file in a directory of recorded games
    Batch {
        #[arg(long, default_value = "real-games")]
        dir: PathBuf,
        #[arg(long)]
        hockey: bool,
    },
    /// Compare replays against `.expected` tables
    Regress {
        #[arg(long, default_value = "tests")]
        dir: PathBuf,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        hockey: bool,
    },
    /// List registered strategies
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            input,
            output,
            strategy,
            hockey,
            seed,
            summary_json,
        } => {
            let mut cfg = cfg;
            cfg.odds.swap_channels |= hockey;
            if seed.is_some() {
                cfg.odds.seed = seed;
            }
            let default_events = if hockey { EVENTS_HOCKEY } else { EVENTS };
            let input = input.unwrap_or_else(|| default_events.to_string());
            run(&cfg, &input, &output, strategy.as_deref(), summary_json.as_deref())
        }
        Command::Replay {
            file,
            output,
            strategy,
            hockey,
        } => {
            let mut cfg = cfg;
            cfg.odds.swap_channels |= hockey;
            let output = output.unwrap_or_else(|| file.with_extension("actual"));
            replay(&cfg, &file, &output, strategy.as_deref())
        }
        Command::Report { file } => report(&file),
        Command::Batch { dir, hockey } => batch(&cfg, &dir, hockey),
        Command::Regress {
            dir,
            strategy,
            hockey,
        } => {
            let mut cfg = cfg;
            cfg.odds.swap_channels |= hockey;
            regress(&cfg, &dir, strategy.as_deref())
        }
        Command::Strategies => {
            let registry = StrategyRegistry::new(&cfg);
            for strategy in registry.iter() {
                println!("{:<16} {}", strategy.name(), strategy.description());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run(
    cfg: &AppConfig,
    input: &str,
    output: &Path,
    strategy: Option<&str>,
    summary_json: Option<&Path>,
) -> Result<()> {
    let events = parse_events(input)?;
    info!(events = events.len(), swap = cfg.odds.swap_channels, "Outcome sequence parsed");

    let registry = StrategyRegistry::new(cfg);
    let strategy = registry.get(strategy.unwrap_or(cfg.strategy.name.as_str()))?;
    info!(strategy = strategy.name(), description = strategy.description(), "Strategy selected");

    let records = Simulation::new(cfg, strategy).run(&events, &[])?;
    storage::save_table(output, &records)?;

    println!("{}", Stats::from_records(&records));
    if let Some(path) = summary_json {
        storage::save_summary(path, &SimulationSummary::new(strategy.name(), &records))?;
    }
    Ok(())
}

fn replay(cfg: &AppConfig, file: &Path, output: &Path, strategy: Option<&str>) -> Result<()> {
    let rounds = storage::load_input(file)?;
    let outcomes: Vec<_> = rounds.iter().map(|r| r.outcome).collect();
    let odds: Vec<Odds> = rounds.iter().map(|r| r.odds).collect();

    let registry = StrategyRegistry::new(cfg);
    let strategy = registry.get(strategy.unwrap_or(cfg.strategy.name.as_str()))?;
    info!(strategy = strategy.name(), file = %file.display(), "Replaying schedule");

    let records = Simulation::new(cfg, strategy).run(&outcomes, &odds)?;
    storage::save_table(output, &records)?;

    println!("{}", Stats::from_records(&records));
    Ok(())
}

fn report(file: &Path) -> Result<()> {
    let mut records = storage::load_table(file)?;
    records.reverse();
    println!("{}", Stats::from_records(&records));
    Ok(())
}

fn batch(cfg: &AppConfig, dir: &Path, hockey: bool) -> Result<()> {
    let report = backtest::process_directory(dir, cfg, hockey)?;
    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Batch finished"
    );
    for (file, error) in &report.failed {
        warn!(file = %file.display(), %error, "File not processed");
    }
    Ok(())
}

fn regress(cfg: &AppConfig, dir: &Path, strategy: Option<&str>) -> Result<()> {
    let registry = StrategyRegistry::new(cfg);
    let strategy = registry.get(strategy.unwrap_or(cfg.strategy.name.as_str()))?;

    let report = backtest::run_suite(dir, cfg, strategy)?;
    println!("{report}");
    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = if verbose { "trainer=debug" } else { "trainer=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let json_logging = std::env::var("TRAINER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
