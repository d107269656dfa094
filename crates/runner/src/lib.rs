//! Driver for the `sph2d` solver
//!
//! This crate provides the configuration layer, the run loop that advances a
//! domain to its end time, and the snapshot seam used by exporters.
//!
//! # Modules
//! - [`config`] -- JSON configuration and validation.
//! - [`runner`] -- Run loop, snapshot sinks and run summary.

#![warn(missing_docs)]

pub mod config;
pub mod runner;

pub use config::{ConfigError, SimulationConfig};
pub use runner::{Frame, NullSink, RunError, RunSummary, Runner, SnapshotSink};
