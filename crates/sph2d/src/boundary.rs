//! Inner-domain wall policy for fluid particles.
//!
//! Boundary particles hold the fluid back through pressure. As a backstop,
//! any fluid particle whose position update would leave the inner region has
//! that axis rolled back and its velocity on that axis reflected and damped.

use crate::params::{PhysicalParams, Rect};

/// The inner region walls plus the restitution applied on reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnerWalls {
    min: [f64; 2],
    max: [f64; 2],
    restitution: f64,
}

impl InnerWalls {
    /// Walls along the edges of `inner`.
    pub fn new(inner: &Rect, params: &PhysicalParams) -> Self {
        Self {
            min: inner.min,
            max: inner.max,
            restitution: params.velocity_lost_rate,
        }
    }

    /// `true` if `coord` lies outside the walls on `axis`. Points exactly on a
    /// wall are inside.
    #[inline]
    pub fn outside(&self, axis: usize, coord: f64) -> bool {
        coord < self.min[axis] || coord > self.max[axis]
    }

    /// Reflected, damped velocity component.
    #[inline]
    pub fn reflect(&self, velocity: f64) -> f64 {
        -self.restitution * velocity
    }
}
