//! Time integration: forward Euler and the two-stage predictor-corrector.
//!
//! Both schemes share the force sweep in [`Domain::evaluate_forces`] and the
//! wall policy in [`InnerWalls`]. Each axis of a fluid particle is integrated
//! independently: if the new coordinate leaves the inner region the axis is
//! rolled back and its velocity reflected instead of accelerated.

use serde::{Deserialize, Serialize};

use crate::boundary::InnerWalls;
use crate::domain::Domain;
use crate::error::SimError;
use crate::neighbor::SearchMode;
use crate::particle::Particle;
use crate::timestep::TimestepBounds;

/// Which integrator advances the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeScheme {
    /// One-stage explicit Euler at the current `dt`.
    #[default]
    ForwardEuler,
    /// Half step, force re-evaluation, then midpoint extrapolation. Commits a
    /// new adaptive `dt` every step.
    PredictorCorrector,
}

impl TimeScheme {
    /// Map the numeric selector used on the command line: `0` is Euler, `1`
    /// is predictor-corrector.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Self::ForwardEuler),
            1 => Some(Self::PredictorCorrector),
            _ => None,
        }
    }
}

/// Per-step switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOptions {
    /// Shepard-filter densities before the force sweep.
    pub smooth: bool,
    /// Neighbor enumeration used by the force sweeps.
    pub search: SearchMode,
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step size the particles were advanced by.
    pub dt_used: f64,
    /// Step size the next call will use.
    pub dt_next: f64,
    /// Bounds from the first force sweep of the step.
    pub bounds: TimestepBounds,
    /// Number of axis rollbacks at the inner walls.
    pub wall_hits: usize,
}

impl Domain {
    /// Advance one step with `scheme`.
    pub fn step(&mut self, scheme: TimeScheme, options: StepOptions) -> Result<StepReport, SimError> {
        match scheme {
            TimeScheme::ForwardEuler => self.forward_euler(options),
            TimeScheme::PredictorCorrector => self.predictor_corrector(options),
        }
    }

    /// Commit `min(dt_cfl, dt_f, dt_a)` from `bounds` as the step size.
    pub fn update_adaptive_timestep(&mut self, bounds: TimestepBounds) -> f64 {
        self.bounds = bounds;
        self.dt = bounds.combined();
        self.dt
    }

    /// One forward-Euler step at the current `dt`.
    ///
    /// The timestep bounds are evaluated and recorded but not committed.
    pub fn forward_euler(&mut self, options: StepOptions) -> Result<StepReport, SimError> {
        self.rebuild_grid()?;
        if options.smooth {
            self.smooth_densities()?;
        }
        let bounds = self.evaluate_forces(options.search)?;
        self.bounds = bounds;

        let dt = self.dt;
        let walls = self.walls();
        let params = self.params;
        let (grid_min, cell_size) = (self.outer.min, 2.0 * self.h);
        let mut wall_hits = 0;

        for p in &mut self.particles {
            if p.is_boundary {
                p.v = [0.0, 0.0];
            } else {
                wall_hits += euler_update(p, dt, &walls);
            }
            p.rho += dt * p.drho;
            p.update_pressure(&params);
            p.update_cell(grid_min, cell_size);
        }
        self.check_state()?;

        tracing::debug!(dt, wall_hits, "forward euler step");
        Ok(StepReport {
            dt_used: dt,
            dt_next: self.dt,
            bounds,
            wall_hits,
        })
    }

    /// One predictor-corrector step.
    ///
    /// Commits the adaptive `dt`, advances half a step from the current
    /// forces, re-evaluates forces at the half-step state, then extrapolates
    /// the full step from the snapshot taken at the start.
    pub fn predictor_corrector(&mut self, options: StepOptions) -> Result<StepReport, SimError> {
        self.rebuild_grid()?;
        if options.smooth {
            self.smooth_densities()?;
        }
        let bounds = self.evaluate_forces(options.search)?;
        let dt = self.update_adaptive_timestep(bounds);

        let walls = self.walls();
        let params = self.params;
        let (grid_min, cell_size) = (self.outer.min, 2.0 * self.h);
        let mut wall_hits = 0;

        // Predictor
        for p in &mut self.particles {
            if p.is_boundary {
                p.v = [0.0, 0.0];
                p.prev_v = [0.0, 0.0];
                p.prev_rho = p.rho;
                p.rho += 0.5 * dt * p.drho;
            } else {
                wall_hits += half_step(p, dt, &walls);
            }
            p.update_pressure(&params);
            p.update_cell(grid_min, cell_size);
        }
        self.check_state()?;

        self.rebuild_grid()?;
        self.evaluate_forces(options.search)?;

        // Corrector
        for p in &mut self.particles {
            if p.is_boundary {
                p.v = [0.0, 0.0];
            } else {
                wall_hits += full_step(p, dt, &walls);
            }
            let rho_half = p.prev_rho + 0.5 * dt * p.drho;
            p.rho = 2.0 * rho_half - p.prev_rho;
            p.update_pressure(&params);
            p.update_cell(grid_min, cell_size);
        }
        self.check_state()?;

        tracing::debug!(
            dt,
            cfl = bounds.cfl,
            force = bounds.force,
            acoustic = bounds.acoustic,
            wall_hits,
            "predictor-corrector step"
        );
        Ok(StepReport {
            dt_used: dt,
            dt_next: self.dt,
            bounds,
            wall_hits,
        })
    }
}

fn euler_update(p: &mut Particle, dt: f64, walls: &InnerWalls) -> usize {
    let mut hits = 0;
    for k in 0..2 {
        let moved = p.x[k] + dt * p.v[k];
        if walls.outside(k, moved) {
            p.v[k] = walls.reflect(p.v[k]);
            hits += 1;
        } else {
            p.x[k] = moved;
            p.v[k] += dt * p.a[k];
        }
    }
    hits
}

/// Snapshot, then advance position, velocity and density by `dt / 2`.
fn half_step(p: &mut Particle, dt: f64, walls: &InnerWalls) -> usize {
    let half = 0.5 * dt;
    p.save_previous();
    let mut hits = 0;
    for k in 0..2 {
        let moved = p.prev_x[k] + half * p.prev_v[k];
        if walls.outside(k, moved) {
            p.x[k] = p.prev_x[k];
            p.v[k] = walls.reflect(p.prev_v[k]);
            hits += 1;
        } else {
            p.x[k] = moved;
            p.v[k] = p.prev_v[k] + half * p.a[k];
        }
    }
    p.rho = p.prev_rho + half * p.drho;
    hits
}

/// Midpoint extrapolation `2 * half - prev` from the snapshot, using the
/// half-step velocity and the forces evaluated at the half-step state.
/// Density is handled by the caller.
fn full_step(p: &mut Particle, dt: f64, walls: &InnerWalls) -> usize {
    let half = 0.5 * dt;
    let mut hits = 0;
    for k in 0..2 {
        let x_half = p.prev_x[k] + half * p.v[k];
        let moved = 2.0 * x_half - p.prev_x[k];
        if walls.outside(k, moved) {
            p.x[k] = p.prev_x[k];
            p.v[k] = walls.reflect(p.prev_v[k]);
            hits += 1;
        } else {
            p.x[k] = moved;
            let v_half = p.prev_v[k] + half * p.a[k];
            p.v[k] = 2.0 * v_half - p.prev_v[k];
        }
    }
    hits
}
