//! Aggregate metrics over a particle snapshot.

use serde::{Deserialize, Serialize};

use crate::params::PhysicalParams;
use crate::particle::Particle;

/// Summary of the particle state, used for progress logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Number of fluid particles.
    pub fluid_count: usize,
    /// Number of boundary particles.
    pub boundary_count: usize,
    /// Mass of every particle, fluid and boundary.
    pub total_mass: f64,
    /// Kinetic energy of the fluid.
    pub kinetic_energy: f64,
    /// Maximum `|rho - rho0| / rho0` over fluid particles.
    pub max_density_variation: f64,
    /// Smallest density over all particles, `None` for an empty domain.
    pub min_density: Option<f64>,
    /// Center of mass of the fluid, `None` without fluid.
    pub fluid_center_of_mass: Option<[f64; 2]>,
}

impl Diagnostics {
    /// Measure `particles`, each of mass `mass`.
    pub fn measure(particles: &[Particle], mass: f64, params: &PhysicalParams) -> Self {
        let mut fluid_count = 0usize;
        let mut kinetic_energy = 0.0;
        let mut max_density_variation = 0.0_f64;
        let mut min_density: Option<f64> = None;
        let mut com = [0.0_f64; 2];

        for p in particles {
            min_density = Some(match min_density {
                Some(m) => m.min(p.rho),
                None => p.rho,
            });
            if p.is_boundary {
                continue;
            }
            fluid_count += 1;
            kinetic_energy += 0.5 * mass * (p.v[0] * p.v[0] + p.v[1] * p.v[1]);
            let variation = (p.rho - params.rest_density).abs() / params.rest_density;
            max_density_variation = max_density_variation.max(variation);
            com[0] += p.x[0];
            com[1] += p.x[1];
        }

        // Equal masses, so the center of mass is the mean position.
        let fluid_center_of_mass = (fluid_count > 0).then(|| {
            let n = fluid_count as f64;
            [com[0] / n, com[1] / n]
        });

        Self {
            fluid_count,
            boundary_count: particles.len() - fluid_count,
            total_mass: mass * particles.len() as f64,
            kinetic_energy,
            max_density_variation,
            min_density,
            fluid_center_of_mass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_domain() {
        let d = Diagnostics::measure(&[], 1.0, &PhysicalParams::default());
        assert_eq!(d.fluid_count, 0);
        assert_eq!(d.boundary_count, 0);
        assert_eq!(d.min_density, None);
        assert_eq!(d.fluid_center_of_mass, None);
    }

    #[test]
    fn fluid_only_quantities_skip_boundary() {
        let params = PhysicalParams::default();
        let mut moving = Particle::new([1.0, 2.0], false, &params);
        moving.v = [3.0, 4.0];
        moving.rho = 1010.0;
        let mut still = Particle::new([3.0, 2.0], false, &params);
        still.rho = 990.0;
        let mut wall = Particle::new([100.0, -5.0], true, &params);
        wall.rho = 900.0;

        let d = Diagnostics::measure(&[moving, still, wall], 2.0, &params);
        assert_eq!(d.fluid_count, 2);
        assert_eq!(d.boundary_count, 1);
        assert_eq!(d.total_mass, 6.0);
        assert!((d.kinetic_energy - 25.0).abs() < 1.0e-12);
        assert!((d.max_density_variation - 0.01).abs() < 1.0e-12);
        assert_eq!(d.min_density, Some(900.0));
        assert_eq!(d.fluid_center_of_mass, Some([2.0, 2.0]));
    }
}
