//! TRAINER: progressive loss-recovery staking simulator.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod backtest;
pub mod config;
pub mod engine;
pub mod odds;
pub mod storage;
pub mod strategy;
pub mod types;
