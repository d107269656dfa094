//! Cubic-spline smoothing kernel and the pairwise SPH operators.
//!
//! The kernel is the 2D cubic B-spline with support radius 2h. The pair
//! operators compute the momentum (pressure gradient + viscosity) and
//! continuity contributions one neighbor pair at a time.

use std::f64::consts::PI;

use crate::particle::Particle;

/// 2D normalisation of the cubic spline: 10 / (7 pi).
const CUBIC_SPLINE_NORM_2D: f64 = 10.0 / (7.0 * PI);

/// Cubic-spline smoothing kernel in 2D.
///
/// ```text
/// W(r, h) = 10 / (7 pi h^2) * (1 - 1.5 q^2 + 0.75 q^3)   0 <= q <= 1
/// W(r, h) = 10 / (7 pi h^2) * 0.25 (2 - q)^3            1 <  q <= 2
/// W(r, h) = 0                                            q > 2
/// ```
/// with `q = r / h`. Callers filter pairs to `r < 2h` before calling.
pub fn cubic_spline(r: f64, h: f64) -> f64 {
    let q = r / h;
    let shape = if (0.0..=1.0).contains(&q) {
        1.0 - 1.5 * q * q + 0.75 * q * q * q
    } else if q > 1.0 && q <= 2.0 {
        let t = 2.0 - q;
        0.25 * t * t * t
    } else {
        return 0.0;
    };
    CUBIC_SPLINE_NORM_2D / (h * h) * shape
}

/// Radial derivative `dW/dr` of [`cubic_spline`].
///
/// ```text
/// dW/dr = 10 / (7 pi h^3) * (-3 q + 2.25 q^2)      0 <= q <= 1
/// dW/dr = 10 / (7 pi h^3) * (-0.75 (2 - q)^2)      1 <  q <= 2
/// ```
/// Non-positive everywhere inside the support.
pub fn cubic_spline_derivative(r: f64, h: f64) -> f64 {
    let q = r / h;
    let shape = if (0.0..=1.0).contains(&q) {
        -3.0 * q + 2.25 * q * q
    } else if q > 1.0 && q <= 2.0 {
        let t = 2.0 - q;
        -0.75 * t * t
    } else {
        return 0.0;
    };
    CUBIC_SPLINE_NORM_2D / (h * h * h) * shape
}

/// Euclidean distance between two particles.
#[inline]
pub fn distance(a: &Particle, b: &Particle) -> f64 {
    let dx = a.x[0] - b.x[0];
    let dy = a.x[1] - b.x[1];
    (dx * dx + dy * dy).sqrt()
}

/// Scalars every pair evaluation needs.
#[derive(Debug, Clone, Copy)]
pub struct PairContext {
    /// Smoothing length.
    pub h: f64,
    /// Mass of one particle (`dx^2 * rho0`).
    pub mass: f64,
    /// Viscosity coefficient.
    pub viscosity: f64,
}

/// What one neighbor contributes to a particle's acceleration and density
/// rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairContribution {
    /// Acceleration contribution (m/s^2).
    pub accel: [f64; 2],
    /// Density-rate contribution.
    pub drho: f64,
}

/// Contribution of `other` to `part` at separation `distance`.
///
/// ```text
/// a_i   += m * dW * [ mu (1/rho_i^2 + 1/rho_j^2) v_ij / r - (P_i/rho_i^2 + P_j/rho_j^2) e_ij ]
/// D_i   += m * dW * (v_ij . x_ij) / r
/// ```
/// with `x_ij = x_i - x_j`, `v_ij = v_i - v_j`, `e_ij = x_ij / r`.
///
/// The contribution of `part` to `other` is the same with the acceleration
/// negated and the density rate unchanged.
pub fn pair_contribution(
    part: &Particle,
    other: &Particle,
    distance: f64,
    ctx: &PairContext,
) -> PairContribution {
    let dw = cubic_spline_derivative(distance, ctx.h);
    let rho_i2 = part.rho * part.rho;
    let rho_j2 = other.rho * other.rho;
    let pressure_term = part.pressure / rho_i2 + other.pressure / rho_j2;
    let viscous_term = 1.0 / rho_i2 + 1.0 / rho_j2;

    let mut accel = [0.0; 2];
    let mut v_dot_x = 0.0;
    for k in 0..2 {
        let dx = part.x[k] - other.x[k];
        let dv = part.v[k] - other.v[k];
        let e = dx / distance;
        let pressure = ctx.mass * pressure_term * dw * e;
        let viscous = ctx.mass * viscous_term * dw * dv / distance;
        accel[k] = ctx.viscosity * viscous - pressure;
        v_dot_x += dv * dx;
    }

    PairContribution {
        accel,
        drho: ctx.mass * dw * v_dot_x / distance,
    }
}

/// Scratch accumulators for one force sweep, indexed like the particles.
///
/// Sweeps read particle state immutably and write here; the domain copies
/// the totals back once the sweep has finished.
#[derive(Debug, Clone, Default)]
pub struct Accumulators {
    /// Acceleration totals.
    pub accel: Vec<[f64; 2]>,
    /// Density-rate totals.
    pub drho: Vec<f64>,
}

impl Accumulators {
    /// Zeroed accumulators for `n` particles, reusing the allocation.
    pub fn reset(&mut self, n: usize) {
        self.accel.clear();
        self.accel.resize(n, [0.0; 2]);
        self.drho.clear();
        self.drho.resize(n, 0.0);
    }

    /// Accumulate the interaction of pair `(i, j)`.
    ///
    /// Non-boundary particles receive the momentum contribution. With
    /// `symmetric` set the opposite-signed force and the same density rate are
    /// also applied to `j`; this is how the half-stencil search visits each
    /// pair once. The full search must pass `symmetric = false` because it
    /// reaches the pair again from `j`.
    pub fn accumulate(
        &mut self,
        particles: &[Particle],
        i: usize,
        j: usize,
        distance: f64,
        symmetric: bool,
        ctx: &PairContext,
    ) {
        let part = &particles[i];
        let other = &particles[j];
        let c = pair_contribution(part, other, distance, ctx);

        if !part.is_boundary {
            self.accel[i][0] += c.accel[0];
            self.accel[i][1] += c.accel[1];
        }
        self.drho[i] += c.drho;

        if symmetric {
            if !other.is_boundary {
                self.accel[j][0] -= c.accel[0];
                self.accel[j][1] -= c.accel[1];
            }
            self.drho[j] += c.drho;
        }
    }
}
