//! Particle record and the read-only snapshot handed to exporters.

use serde::{Deserialize, Serialize};

use crate::eos;
use crate::params::PhysicalParams;

/// Full per-particle state.
///
/// Particles live in one `Vec` owned by the [`Domain`](crate::Domain) and are
/// addressed by index; neighbor searches hand out indices, never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Position (m).
    pub x: [f64; 2],
    /// Velocity (m/s).
    pub v: [f64; 2],
    /// Acceleration accumulated during the last force sweep (m/s^2).
    pub a: [f64; 2],
    /// Density (kg/m^3).
    pub rho: f64,
    /// Pressure from the equation of state (Pa).
    pub pressure: f64,
    /// Density time derivative accumulated during the last force sweep.
    pub drho: f64,
    /// Position snapshot taken at the predictor half-step.
    pub prev_x: [f64; 2],
    /// Velocity snapshot taken at the predictor half-step.
    pub prev_v: [f64; 2],
    /// Density snapshot taken at the predictor half-step.
    pub prev_rho: f64,
    /// Search-grid cell this particle occupies.
    pub cell: [i64; 2],
    /// Position inside its cell's bucket, in insertion order.
    pub slot_in_cell: usize,
    /// Fixed wall particle: zero velocity, no gravity, never moves.
    pub is_boundary: bool,
}

impl Particle {
    /// New particle at rest at the reference density.
    pub fn new(x: [f64; 2], is_boundary: bool, params: &PhysicalParams) -> Self {
        let rho = params.rest_density;
        Self {
            x,
            v: [0.0; 2],
            a: [0.0; 2],
            rho,
            pressure: eos::pressure(rho, params),
            drho: 0.0,
            prev_x: x,
            prev_v: [0.0; 2],
            prev_rho: rho,
            cell: [0; 2],
            slot_in_cell: 0,
            is_boundary,
        }
    }

    /// Position (m).
    #[inline]
    pub fn position(&self) -> [f64; 2] {
        self.x
    }

    /// Velocity (m/s).
    #[inline]
    pub fn velocity(&self) -> [f64; 2] {
        self.v
    }

    /// Pressure (Pa).
    #[inline]
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Recompute pressure from the current density.
    #[inline]
    pub fn update_pressure(&mut self, params: &PhysicalParams) {
        self.pressure = eos::pressure(self.rho, params);
    }

    /// Recompute the grid cell from the current position.
    ///
    /// `cell = floor((x - grid_min) / cell_size)`; the result is not clamped,
    /// so a particle that escaped the grid shows up at the next rebuild.
    #[inline]
    pub fn update_cell(&mut self, grid_min: [f64; 2], cell_size: f64) {
        self.cell = cell_of(self.x, grid_min, cell_size);
    }

    /// Reset the force accumulators: gravity for fluid, nothing for walls.
    #[inline]
    pub fn reset_accumulators(&mut self, gravity: f64) {
        self.a = if self.is_boundary {
            [0.0, 0.0]
        } else {
            [0.0, gravity]
        };
        self.drho = 0.0;
    }

    /// Snapshot the fields the predictor-corrector extrapolates from.
    #[inline]
    pub fn save_previous(&mut self) {
        self.prev_x = self.x;
        self.prev_v = self.v;
        self.prev_rho = self.rho;
    }

    /// Mass carried by one particle on a lattice of spacing `dx`.
    #[inline]
    pub fn lattice_mass(dx: f64, params: &PhysicalParams) -> f64 {
        dx * dx * params.rest_density
    }
}

/// Cell coordinates containing `x` for a grid anchored at `grid_min`.
#[inline]
pub fn cell_of(x: [f64; 2], grid_min: [f64; 2], cell_size: f64) -> [i64; 2] {
    [
        ((x[0] - grid_min[0]) / cell_size).floor() as i64,
        ((x[1] - grid_min[1]) / cell_size).floor() as i64,
    ]
}

/// The fields an exporter needs, detached from the solver state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleSample {
    /// Position (m).
    pub position: [f64; 2],
    /// Velocity (m/s).
    pub velocity: [f64; 2],
    /// Pressure (Pa).
    pub pressure: f64,
    /// Density (kg/m^3).
    pub density: f64,
    /// Wall particle flag.
    pub is_boundary: bool,
}

impl From<&Particle> for ParticleSample {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position(),
            velocity: p.velocity(),
            pressure: p.pressure(),
            density: p.rho,
            is_boundary: p.is_boundary,
        }
    }
}
