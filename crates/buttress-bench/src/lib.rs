//! Timing harness for the stability engine: synthetic tower scenes, per-phase
//! timings and JSON baselines for regression checks.

pub mod report;
pub mod runner;
pub mod scenes;
