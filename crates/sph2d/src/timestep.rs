//! Adaptive timestep bounds.
//!
//! Three running minima are tightened pair by pair during a force sweep:
//!
//! ```text
//! dt_cfl = h / |v_i - v_j|
//! dt_f   = sqrt(h / |a_i|)
//! dt_a   = h / c(rho_i)
//! ```
//!
//! Each starts from a seed (the initial estimate `0.1 h / c0`), so the
//! committed step `min(dt_cfl, dt_f, dt_a)` never exceeds it. A zero relative
//! velocity or acceleration yields an infinite candidate, which the running
//! minimum simply ignores.

use serde::{Deserialize, Serialize};

use crate::eos;
use crate::params::PhysicalParams;
use crate::particle::Particle;

/// Initial timestep estimate `0.1 h / c0`.
pub fn initial_timestep(h: f64, params: &PhysicalParams) -> f64 {
    0.1 * h / params.speed_of_sound
}

/// The three running minima of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepBounds {
    /// Velocity (CFL-like) bound.
    pub cfl: f64,
    /// Acceleration bound.
    pub force: f64,
    /// Sound-speed bound.
    pub acoustic: f64,
}

impl TimestepBounds {
    /// All three minima set to `seed`.
    pub fn seeded(seed: f64) -> Self {
        Self {
            cfl: seed,
            force: seed,
            acoustic: seed,
        }
    }

    /// Tighten the minima with the pair `(part, other)`.
    pub fn update(&mut self, part: &Particle, other: &Particle, h: f64, params: &PhysicalParams) {
        let dvx = part.v[0] - other.v[0];
        let dvy = part.v[1] - other.v[1];
        let v_ij = (dvx * dvx + dvy * dvy).sqrt();
        let cfl = h / v_ij;
        if cfl < self.cfl {
            self.cfl = cfl;
        }

        let a_i = (part.a[0] * part.a[0] + part.a[1] * part.a[1]).sqrt();
        let force = (h / a_i).sqrt();
        if force < self.force {
            self.force = force;
        }

        let acoustic = h / eos::sound_speed(part.rho, params);
        if acoustic < self.acoustic {
            self.acoustic = acoustic;
        }
    }

    /// Component-wise minimum of two partial results.
    pub fn merge(self, other: Self) -> Self {
        Self {
            cfl: self.cfl.min(other.cfl),
            force: self.force.min(other.force),
            acoustic: self.acoustic.min(other.acoustic),
        }
    }

    /// The step to commit: `min(dt_cfl, dt_f, dt_a)`.
    pub fn combined(&self) -> f64 {
        self.cfl.min(self.force).min(self.acoustic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_at_rest_keeps_the_seed() {
        let params = PhysicalParams::default();
        let h = 0.13;
        let seed = initial_timestep(h, &params);
        let a = Particle::new([0.0, 0.0], false, &params);
        let b = Particle::new([0.1, 0.0], false, &params);
        let mut bounds = TimestepBounds::seeded(seed);
        bounds.update(&a, &b, h, &params);
        assert_eq!(bounds, TimestepBounds::seeded(seed));
        assert_eq!(bounds.combined(), seed);
    }

    #[test]
    fn fast_pair_tightens_cfl() {
        let params = PhysicalParams::default();
        let h = 0.13;
        let seed = initial_timestep(h, &params);
        let a = Particle::new([0.0, 0.0], false, &params);
        let mut b = Particle::new([0.1, 0.0], false, &params);
        b.v = [1.0e3, 0.0];
        let mut bounds = TimestepBounds::seeded(seed);
        bounds.update(&a, &b, h, &params);
        assert!((bounds.cfl - h / 1.0e3).abs() < 1.0e-15);
        assert_eq!(bounds.combined(), bounds.cfl);
    }

    #[test]
    fn large_acceleration_tightens_force_bound() {
        let params = PhysicalParams::default();
        let h = 0.13;
        let mut a = Particle::new([0.0, 0.0], false, &params);
        let b = Particle::new([0.1, 0.0], false, &params);
        a.a = [0.0, -1.0e8];
        let mut bounds = TimestepBounds::seeded(1.0);
        bounds.update(&a, &b, h, &params);
        assert!((bounds.force - (h / 1.0e8).sqrt()).abs() < 1.0e-15);
    }

    #[test]
    fn compression_tightens_acoustic_bound() {
        let params = PhysicalParams::default();
        let h = 0.13;
        let mut a = Particle::new([0.0, 0.0], false, &params);
        let b = Particle::new([0.1, 0.0], false, &params);
        let mut bounds = TimestepBounds::seeded(1.0);
        bounds.update(&a, &b, h, &params);
        let at_rest = bounds.acoustic;
        assert!((at_rest - h / params.speed_of_sound).abs() < 1.0e-15);

        a.rho = 1100.0;
        bounds.update(&a, &b, h, &params);
        assert!(bounds.acoustic < at_rest);
    }

    #[test]
    fn combined_never_exceeds_any_bound() {
        let bounds = TimestepBounds {
            cfl: 0.3,
            force: 0.1,
            acoustic: 0.2,
        };
        let dt = bounds.combined();
        assert_eq!(dt, 0.1);
        assert!(dt <= bounds.cfl && dt <= bounds.force && dt <= bounds.acoustic);
    }

    #[test]
    fn merge_takes_component_minimum() {
        let a = TimestepBounds {
            cfl: 0.3,
            force: 0.1,
            acoustic: 0.2,
        };
        let b = TimestepBounds {
            cfl: 0.1,
            force: 0.4,
            acoustic: 0.2,
        };
        assert_eq!(
            a.merge(b),
            TimestepBounds {
                cfl: 0.1,
                force: 0.1,
                acoustic: 0.2
            }
        );
    }
}
