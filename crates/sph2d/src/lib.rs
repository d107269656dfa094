//! 2D SPH Fluid Solver
//!
//! Weakly-compressible smoothed particle hydrodynamics on a uniform bucket
//! grid. Fluid particles carry position, velocity and density; fixed
//! boundary particles hold them in through pressure.
//!
//! # Modules
//! - [`particle`] -- Per-particle state and the exporter sample.
//! - [`sph`] -- Cubic-spline kernel, pair interaction and scratch accumulators.
//! - [`neighbor`] -- Counting-sort bucket grid with full and half-stencil search.
//! - [`eos`] -- Tait equation of state and local sound speed.
//! - [`timestep`] -- Adaptive timestep bounds.
//! - [`boundary`] -- Inner-wall rollback and reflection.
//! - [`domain`] -- Particle store, placement, smoothing and the force sweep.
//! - [`integrate`] -- Forward Euler and predictor-corrector schemes.
//! - [`diagnostics`] -- Aggregate metrics.

#![warn(missing_docs)]

pub mod boundary;
pub mod diagnostics;
pub mod domain;
pub mod eos;
pub mod error;
pub mod integrate;
pub mod neighbor;
pub mod params;
pub mod particle;
pub mod sph;
pub mod timestep;

pub use diagnostics::Diagnostics;
pub use domain::Domain;
pub use eos::{sound_speed, tait_eos};
pub use error::{ParticleField, SimError};
pub use integrate::{StepOptions, StepReport, TimeScheme};
pub use neighbor::{SearchGrid, SearchMode};
pub use params::{DomainLayout, PhysicalParams, Rect};
pub use particle::{Particle, ParticleSample};
pub use sph::{cubic_spline, cubic_spline_derivative};
pub use timestep::TimestepBounds;
