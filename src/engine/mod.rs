//! Simulation engine: the round-by-round fold and its summary statistics.

pub mod driver;
pub mod stats;

pub use driver::{parse_events, Simulation};
pub use stats::{SimulationSummary, Stats};
