//! Physical constants and the initial scene layout.

use serde::{Deserialize, Serialize};

/// Physical and equation-of-state constants shared by every particle.
///
/// Passed explicitly to any function that needs them; particles never hold a
/// reference back to the domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalParams {
    /// Vertical gravitational acceleration (m/s^2, negative is down).
    pub gravity: f64,
    /// Reference speed of sound `c0` (m/s).
    pub speed_of_sound: f64,
    /// Reference density `rho0` (kg/m^3). Pressure is zero here.
    pub rest_density: f64,
    /// Tait exponent.
    pub gamma: f64,
    /// Dynamic viscosity coefficient.
    pub viscosity: f64,
    /// Fraction of normal velocity kept when a particle is reflected off an
    /// inner-domain wall.
    pub velocity_lost_rate: f64,
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            speed_of_sound: 20.0,
            rest_density: 1000.0,
            gamma: 7.0,
            viscosity: 0.001,
            velocity_lost_rate: 0.5,
        }
    }
}

/// Axis-aligned rectangle, open on both axes unless marked closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Lower-left corner.
    pub min: [f64; 2],
    /// Upper-right corner.
    pub max: [f64; 2],
    /// Per axis, whether points on the edges count as inside.
    #[serde(default)]
    pub closed: [bool; 2],
}

impl Rect {
    /// Open rectangle spanning `min..max`.
    pub const fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self {
            min,
            max,
            closed: [false, false],
        }
    }

    /// Same rectangle with the given axes closed.
    pub const fn with_closed(mut self, closed: [bool; 2]) -> Self {
        self.closed = closed;
        self
    }

    /// Containment test; edges are outside on open axes and inside on
    /// closed ones.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        (0..2).all(|k| {
            if self.closed[k] {
                p[k] >= self.min[k] && p[k] <= self.max[k]
            } else {
                p[k] > self.min[k] && p[k] < self.max[k]
            }
        })
    }

    /// `true` when `min < max` on both axes.
    pub fn is_valid(&self) -> bool {
        self.min[0] < self.max[0] && self.min[1] < self.max[1]
    }
}

/// Where fluid starts and where the lattice sweep leaves gaps.
///
/// Lattice points strictly inside `inner` become fluid; everything else that
/// survives the void filter becomes boundary. The inner rectangle is also the
/// wall that fluid particles are reflected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainLayout {
    /// Inner fluid region.
    pub inner: Rect,
    /// Regions skipped by the lattice sweep.
    #[serde(default)]
    pub voids: Vec<Rect>,
}

impl DomainLayout {
    /// Layout with no voids: the whole inner region is filled with fluid.
    pub fn filled(inner: Rect) -> Self {
        Self {
            inner,
            voids: Vec::new(),
        }
    }

    /// Dam-break scene: a 20x10 tank holding a water column on the left and a
    /// shallow layer along the floor, with air above. The upper air void
    /// spans the tank wall to wall, so it also clears the wall columns at
    /// `x = 0` and `x = 20`.
    pub fn dam_break() -> Self {
        Self {
            inner: Rect::new([0.0, 0.0], [20.0, 10.0]),
            voids: vec![
                Rect::new([0.0, 5.0], [20.0, 10.0]).with_closed([true, false]),
                Rect::new([3.0, 2.0], [20.0, 5.0]),
            ],
        }
    }

    /// `true` if the lattice sweep should skip `p`.
    pub fn in_void(&self, p: [f64; 2]) -> bool {
        self.voids.iter().any(|v| v.contains(p))
    }
}

impl Default for DomainLayout {
    fn default() -> Self {
        Self::dam_break()
    }
}
