//! Equation of state for the weakly-compressible fluid.
//!
//! All units are SI: meters, kg, seconds, Pascals.

use crate::params::PhysicalParams;

/// Tait equation of state.
///
/// ```text
/// P = B * ((rho / rho0)^gamma - 1)
/// ```
/// where `B = rho0 * c0^2 / gamma`.
///
/// Returns gauge pressure: exactly zero at `rest_density`, negative (tension)
/// below it.
pub fn tait_eos(density: f64, rest_density: f64, speed_of_sound: f64, gamma: f64) -> f64 {
    let b = rest_density * speed_of_sound * speed_of_sound / gamma;
    let ratio = density / rest_density;
    b * (ratio.powf(gamma) - 1.0)
}

/// Pressure for `density` under the domain's constants.
#[inline]
pub fn pressure(density: f64, params: &PhysicalParams) -> f64 {
    tait_eos(
        density,
        params.rest_density,
        params.speed_of_sound,
        params.gamma,
    )
}

/// Local speed of sound `c = c0 * (rho / rho0)^((gamma - 1) / 2)`.
///
/// This is `sqrt(dP/drho)` for the Tait relation.
pub fn sound_speed(density: f64, params: &PhysicalParams) -> f64 {
    let ratio = density / params.rest_density;
    params.speed_of_sound * ratio.powf(0.5 * (params.gamma - 1.0))
}
