//! Replaying recorded schedules: regression checks and batch output.

pub mod batch;
pub mod regression;

pub use batch::{process_directory, BatchReport};
pub use regression::{run_suite, CaseResult, SuiteReport};
