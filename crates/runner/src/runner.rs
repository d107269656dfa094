//! Run loop driving a [`Domain`] to its end time
//!
//! The runner owns the domain, decides when to smooth densities, advances
//! simulated time by the step each integration reports, and hands periodic
//! snapshots to a [`SnapshotSink`].

use std::io;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sph2d::{Diagnostics, Domain, ParticleSample, SimError, StepOptions};

use crate::config::{ConfigError, SimulationConfig};

/// Errors that end a run
#[derive(Debug, Error)]
pub enum RunError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Setting up the initial state failed.
    #[error("setup failed: {0}")]
    Setup(#[source] SimError),
    /// An integration step failed.
    #[error("step {step} failed at t = {time:.6}s: {source}")]
    Step {
        /// Zero-based step counter.
        step: u64,
        /// Simulated time before the step.
        time: f64,
        /// Solver error.
        #[source]
        source: SimError,
    },
    /// A snapshot could not be recorded.
    #[error("snapshot sink failed: {0}")]
    Sink(#[from] io::Error),
}

/// One exported snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sequence number, starting at 0 for the initial state
    pub index: usize,
    /// Steps completed when the frame was taken
    pub step: u64,
    /// Simulated time (seconds)
    pub time: f64,
    /// Particle state
    pub particles: Vec<ParticleSample>,
}

/// Receiver for periodic snapshots (file writers, in-memory capture, ...)
pub trait SnapshotSink {
    /// Record one frame.
    fn record(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Sink that drops every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn record(&mut self, _frame: &Frame) -> io::Result<()> {
        Ok(())
    }
}

impl SnapshotSink for Vec<Frame> {
    fn record(&mut self, frame: &Frame) -> io::Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Steps taken
    pub steps: u64,
    /// Simulated time reached (seconds)
    pub sim_time: f64,
    /// Step size the domain would use next
    pub final_dt: f64,
    /// Metrics of the final state
    pub diagnostics: Diagnostics,
}

/// Drives a configured domain from its initial state to `max_time`
pub struct Runner {
    config: SimulationConfig,
    domain: Domain,
    step: u64,
    time: f64,
    frames: usize,
}

impl Runner {
    /// Validate `config`, then configure the domain, allocate the grid and
    /// place the initial lattice.
    pub fn new(config: SimulationConfig) -> Result<Self, RunError> {
        config.validate()?;

        let mut domain = Domain::with_setup(
            config.h_factor,
            config.particle_spacing,
            config.max_time,
            config.physics,
            config.layout.clone(),
        );
        domain.build_grid();
        domain.place_lattice();
        domain.rebuild_grid().map_err(RunError::Setup)?;

        tracing::info!(
            "Configured '{}': {} particles, h={:.4}, dt0={:.3e}s, scheme={:?}, search={:?}",
            config.name,
            domain.particle_count(),
            domain.h(),
            domain.dt(),
            config.scheme,
            config.search,
        );

        Ok(Self {
            config,
            domain,
            step: 0,
            time: 0.0,
            frames: 0,
        })
    }

    /// The domain being driven
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The run configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Steps taken so far
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Simulated time so far (seconds)
    pub fn sim_time(&self) -> f64 {
        self.time
    }

    /// Step until simulated time reaches `max_time`.
    ///
    /// Densities are smoothed on every `smoothing_interval`-th step. The
    /// initial state, every `report_interval`-th step and the final state
    /// are sent to `sink`.
    pub fn run<S>(&mut self, sink: &mut S) -> Result<RunSummary, RunError>
    where
        S: SnapshotSink + ?Sized,
    {
        let start_wall_time = Instant::now();
        let scheme = self.config.scheme;
        let search = self.config.search;

        if self.step == 0 {
            self.emit(sink)?;
        }

        while self.time < self.domain.t_max() {
            let options = StepOptions {
                smooth: self.step % self.config.smoothing_interval == 0,
                search,
            };
            let report = self
                .domain
                .step(scheme, options)
                .map_err(|source| RunError::Step {
                    step: self.step,
                    time: self.time,
                    source,
                })?;

            let reporting = self.step % self.config.report_interval == 0;
            self.step += 1;
            self.time += report.dt_used;

            if reporting {
                let d = self.domain.diagnostics();
                tracing::info!(
                    "Step {}: sim_time={:.4}s, dt={:.3e}s, kinetic_energy={:.4e}, max_density_variation={:.4}, wall_hits={}",
                    self.step,
                    self.time,
                    report.dt_used,
                    d.kinetic_energy,
                    d.max_density_variation,
                    report.wall_hits,
                );
                self.emit(sink)?;
            }
        }

        self.emit(sink)?;

        let summary = RunSummary {
            steps: self.step,
            sim_time: self.time,
            final_dt: self.domain.dt(),
            diagnostics: self.domain.diagnostics(),
        };
        tracing::info!(
            "Simulation finished: {} timesteps, {:.4}s simulated, wall_time={:.2}s",
            summary.steps,
            summary.sim_time,
            start_wall_time.elapsed().as_secs_f64(),
        );
        Ok(summary)
    }

    fn emit<S>(&mut self, sink: &mut S) -> Result<(), RunError>
    where
        S: SnapshotSink + ?Sized,
    {
        let frame = Frame {
            index: self.frames,
            step: self.step,
            time: self.time,
            particles: self.domain.snapshot(),
        };
        sink.record(&frame)?;
        self.frames += 1;
        Ok(())
    }
}
