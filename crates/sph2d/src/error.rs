//! Numerical failure taxonomy for the solver.
//!
//! None of these are recovered inside the core. A step that hits one returns
//! the error and leaves the domain in whatever partially-updated state it
//! reached, so the driver can decide whether to stop or inspect.

use thiserror::Error;

/// Particle field that became non-finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleField {
    /// Position vector.
    Position,
    /// Velocity vector.
    Velocity,
    /// Density.
    Density,
    /// Pressure.
    Pressure,
}

impl std::fmt::Display for ParticleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParticleField::Position => "position",
            ParticleField::Velocity => "velocity",
            ParticleField::Density => "density",
            ParticleField::Pressure => "pressure",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by grid rebuilds, sweeps and integration steps.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    /// Two particles sit at exactly the same position, so the pair direction
    /// `Δx / |Δx|` is undefined.
    #[error("particles {first} and {second} are coincident")]
    CoincidentParticles {
        /// Index of the searching particle.
        first: usize,
        /// Index of the neighbor found at zero distance.
        second: usize,
    },

    /// A state field became NaN or infinite after an update.
    #[error("particle {particle} has a non-finite {field}")]
    NonFiniteState {
        /// Particle index.
        particle: usize,
        /// Offending field.
        field: ParticleField,
    },

    /// Density dropped to zero or below after an update.
    #[error("particle {particle} has non-positive density {density}")]
    NonPositiveDensity {
        /// Particle index.
        particle: usize,
        /// Density value that was rejected.
        density: f64,
    },

    /// A particle's cell lies outside the allocated bucket array.
    #[error("particle {particle} maps to cell ({}, {}) outside the search grid", cell[0], cell[1])]
    OutsideGrid {
        /// Particle index.
        particle: usize,
        /// Cell coordinates that were out of range.
        cell: [i64; 2],
    },

    /// A sweep or step ran before the search grid was allocated.
    #[error("search grid has not been built")]
    GridNotBuilt,
}
