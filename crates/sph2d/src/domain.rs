//! The simulation domain: particle store, search grid and the sweeps that
//! feed the integrators.

use rayon::prelude::*;

use crate::boundary::InnerWalls;
use crate::diagnostics::Diagnostics;
use crate::error::{ParticleField, SimError};
use crate::neighbor::{SearchGrid, SearchMode};
use crate::params::{DomainLayout, PhysicalParams, Rect};
use crate::particle::{Particle, ParticleSample};
use crate::sph::{self, Accumulators, PairContext, PairContribution};
use crate::timestep::{self, TimestepBounds};

/// Width of the boundary padding around the inner region, in smoothing
/// lengths.
const PADDING_IN_H: f64 = 3.0;

/// Owns every particle, the search grid and the scalar setup of a run.
///
/// Lifecycle: [`configure`](Self::configure) → [`build_grid`](Self::build_grid)
/// → [`place_particles`](Self::place_particles) (and/or
/// [`insert_particle`](Self::insert_particle)) → repeated
/// [`forward_euler`](Self::forward_euler) or
/// [`predictor_corrector`](Self::predictor_corrector) steps. Stopping at
/// `t_max` is the driver's job.
#[derive(Debug, Clone)]
pub struct Domain {
    pub(crate) params: PhysicalParams,
    pub(crate) layout: DomainLayout,
    pub(crate) h_factor: f64,
    /// Smoothing length `h = h_factor * dx`.
    pub(crate) h: f64,
    /// Lattice spacing.
    pub(crate) dx: f64,
    pub(crate) t_max: f64,
    /// Step size used by the next integration.
    pub(crate) dt: f64,
    /// `0.1 h / c0`; seeds the running timestep minima.
    pub(crate) initial_dt: f64,
    /// Bounds from the most recent force sweep.
    pub(crate) bounds: TimestepBounds,
    /// Inner region padded by `3h` on every side.
    pub(crate) outer: Rect,
    pub(crate) grid: Option<SearchGrid>,
    pub(crate) particles: Vec<Particle>,
    scratch: Accumulators,
}

impl Domain {
    /// Set up a domain with default physics and the dam-break layout.
    pub fn configure(h_factor: f64, spacing: f64, t_max: f64) -> Self {
        Self::with_setup(
            h_factor,
            spacing,
            t_max,
            PhysicalParams::default(),
            DomainLayout::default(),
        )
    }

    /// Set up a domain with explicit physics and layout.
    ///
    /// No validation is performed here; the driver checks its inputs.
    pub fn with_setup(
        h_factor: f64,
        spacing: f64,
        t_max: f64,
        params: PhysicalParams,
        layout: DomainLayout,
    ) -> Self {
        let h = h_factor * spacing;
        let initial_dt = timestep::initial_timestep(h, &params);
        let pad = PADDING_IN_H * h;
        let outer = Rect::new(
            [layout.inner.min[0] - pad, layout.inner.min[1] - pad],
            [layout.inner.max[0] + pad, layout.inner.max[1] + pad],
        );

        tracing::info!(h, dx = spacing, dt = initial_dt, "domain configured");

        Self {
            params,
            layout,
            h_factor,
            h,
            dx: spacing,
            t_max,
            dt: initial_dt,
            initial_dt,
            bounds: TimestepBounds::seeded(initial_dt),
            outer,
            grid: None,
            particles: Vec::new(),
            scratch: Accumulators::default(),
        }
    }

    /// Allocate the bucket grid over the padded region with cells of `2h`.
    pub fn build_grid(&mut self) {
        let grid = SearchGrid::new(2.0 * self.h, self.outer.min, self.outer.max);
        let [nx, ny] = grid.dims();
        tracing::info!(nx, ny, cell_size = grid.cell_size(), "search grid allocated");
        self.grid = Some(grid);
    }

    /// Sweep a lattice of spacing `dx` over `[min, max]`, skipping voids.
    ///
    /// Points strictly inside the inner region become fluid, the rest
    /// boundary. Returns the number of particles added.
    pub fn place_particles(&mut self, min: [f64; 2], max: [f64; 2]) -> usize {
        let before = self.particles.len();
        let cell_size = 2.0 * self.h;
        let mut fluid = 0usize;

        let mut i = 0usize;
        loop {
            let x = min[0] + i as f64 * self.dx;
            if x > max[0] {
                break;
            }
            let mut j = 0usize;
            loop {
                let y = min[1] + j as f64 * self.dx;
                if y > max[1] {
                    break;
                }
                j += 1;

                let point = [x, y];
                if self.layout.in_void(point) {
                    continue;
                }
                let is_boundary = !self.layout.inner.contains(point);
                if !is_boundary {
                    fluid += 1;
                }
                let mut particle = Particle::new(point, is_boundary, &self.params);
                particle.update_cell(self.outer.min, cell_size);
                self.particles.push(particle);
            }
            i += 1;
        }

        let added = self.particles.len() - before;
        tracing::info!(fluid, boundary = added - fluid, "lattice placed");
        if fluid == 0 {
            tracing::warn!("lattice sweep produced no fluid particles");
        }
        added
    }

    /// [`place_particles`](Self::place_particles) over the whole padded region.
    pub fn place_lattice(&mut self) -> usize {
        let Rect { min, max, .. } = self.outer;
        self.place_particles(min, max)
    }

    /// Add one particle outside the lattice sweep. Boundary particles are
    /// stored at rest whatever `velocity` says. Returns its index.
    pub fn insert_particle(&mut self, position: [f64; 2], velocity: [f64; 2], is_boundary: bool) -> usize {
        let mut particle = Particle::new(position, is_boundary, &self.params);
        if !is_boundary {
            particle.v = velocity;
            particle.prev_v = velocity;
        }
        particle.update_cell(self.outer.min, 2.0 * self.h);
        self.particles.push(particle);
        self.particles.len() - 1
    }

    /// Reassign every particle to its bucket.
    pub fn rebuild_grid(&mut self) -> Result<(), SimError> {
        let grid = self.grid.as_mut().ok_or(SimError::GridNotBuilt)?;
        grid.rebuild(&mut self.particles)
    }

    fn pair_context(&self) -> PairContext {
        PairContext {
            h: self.h,
            mass: self.particle_mass(),
            viscosity: self.params.viscosity,
        }
    }

    /// Shepard-filter every density.
    ///
    /// `rho_i = sum_j W_ij / sum_j (W_ij / rho_j)` over all neighbors within
    /// `2h` plus the particle itself, using the full search since each
    /// particle only writes its own density. Pressures are refreshed from the
    /// new densities. The grid must be current.
    pub fn smooth_densities(&mut self) -> Result<(), SimError> {
        let grid = self.grid.as_ref().ok_or(SimError::GridNotBuilt)?;
        let h = self.h;
        let radius = 2.0 * h;
        let w0 = sph::cubic_spline(0.0, h);
        let particles = &self.particles;

        let smoothed: Vec<f64> = (0..particles.len())
            .into_par_iter()
            .map(|i| {
                let mut numerator = w0;
                let mut denominator = w0 / particles[i].rho;
                grid.for_each_neighbor(i, particles, radius, SearchMode::Full, |j, r| {
                    let w = sph::cubic_spline(r, h);
                    numerator += w;
                    denominator += w / particles[j].rho;
                });
                numerator / denominator
            })
            .collect();

        let params = self.params;
        for (p, rho) in self.particles.iter_mut().zip(smoothed) {
            p.rho = rho;
            p.update_pressure(&params);
        }
        tracing::trace!("densities smoothed");
        Ok(())
    }

    /// Reset and accumulate accelerations and density rates over all pairs
    /// within `2h`, then tighten the timestep bounds with the finished
    /// accelerations. Returns the bounds without committing a new step.
    ///
    /// The grid must be current.
    pub fn evaluate_forces(&mut self, mode: SearchMode) -> Result<TimestepBounds, SimError> {
        let ctx = self.pair_context();
        let params = self.params;
        let h = self.h;
        let radius = 2.0 * h;
        let grid = self.grid.as_ref().ok_or(SimError::GridNotBuilt)?;
        let n = self.particles.len();

        for p in &mut self.particles {
            p.reset_accumulators(params.gravity);
        }

        let particles = &self.particles;
        let acc = &mut self.scratch;
        acc.reset(n);

        match mode {
            SearchMode::Symmetric => {
                for i in 0..n {
                    grid.try_for_each_neighbor(i, particles, radius, mode, |j, r| {
                        if r == 0.0 {
                            return Err(SimError::CoincidentParticles { first: i, second: j });
                        }
                        acc.accumulate(particles, i, j, r, true, &ctx);
                        Ok(())
                    })?;
                }
            }
            SearchMode::Full => {
                // Each target only writes its own totals, so targets run in
                // parallel.
                let totals = (0..n)
                    .into_par_iter()
                    .map(|i| -> Result<PairContribution, SimError> {
                        let part = &particles[i];
                        let mut total = PairContribution::default();
                        grid.try_for_each_neighbor(i, particles, radius, mode, |j, r| {
                            if r == 0.0 {
                                return Err(SimError::CoincidentParticles { first: i, second: j });
                            }
                            let c = sph::pair_contribution(part, &particles[j], r, &ctx);
                            if !part.is_boundary {
                                total.accel[0] += c.accel[0];
                                total.accel[1] += c.accel[1];
                            }
                            total.drho += c.drho;
                            Ok(())
                        })?;
                        Ok(total)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                for (i, total) in totals.into_iter().enumerate() {
                    acc.accel[i] = total.accel;
                    acc.drho[i] = total.drho;
                }
            }
        }

        for (i, p) in self.particles.iter_mut().enumerate() {
            p.a[0] += self.scratch.accel[i][0];
            p.a[1] += self.scratch.accel[i][1];
            p.drho += self.scratch.drho[i];
        }

        // Bounds need the finished accelerations, so they are a separate
        // pass; each pair is visited once and tightens both orderings.
        let particles = &self.particles;
        let seed = TimestepBounds::seeded(self.initial_dt);
        let bounds = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut local = seed;
                grid.for_each_neighbor(i, particles, radius, SearchMode::Symmetric, |j, _| {
                    local.update(&particles[i], &particles[j], h, &params);
                    local.update(&particles[j], &particles[i], h, &params);
                });
                local
            })
            .reduce(|| seed, TimestepBounds::merge);

        tracing::trace!(
            cfl = bounds.cfl,
            force = bounds.force,
            acoustic = bounds.acoustic,
            "force sweep finished"
        );
        Ok(bounds)
    }

    /// Fail on the first particle with a non-finite field or non-positive
    /// density.
    pub(crate) fn check_state(&self) -> Result<(), SimError> {
        for (i, p) in self.particles.iter().enumerate() {
            let non_finite = |field| SimError::NonFiniteState { particle: i, field };
            if !(p.x[0].is_finite() && p.x[1].is_finite()) {
                return Err(non_finite(ParticleField::Position));
            }
            if !(p.v[0].is_finite() && p.v[1].is_finite()) {
                return Err(non_finite(ParticleField::Velocity));
            }
            if !p.rho.is_finite() {
                return Err(non_finite(ParticleField::Density));
            }
            if p.rho <= 0.0 {
                return Err(SimError::NonPositiveDensity {
                    particle: i,
                    density: p.rho,
                });
            }
            if !p.pressure.is_finite() {
                return Err(non_finite(ParticleField::Pressure));
            }
        }
        Ok(())
    }

    pub(crate) fn walls(&self) -> InnerWalls {
        InnerWalls::new(&self.layout.inner, &self.params)
    }

    /// All particles, in insertion order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access for setting up initial conditions. Cells are refreshed
    /// by the next grid rebuild; pressures are not recomputed.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Exporter view of every particle.
    pub fn snapshot(&self) -> Vec<ParticleSample> {
        self.particles.iter().map(ParticleSample::from).collect()
    }

    /// Aggregate metrics over the current state.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::measure(&self.particles, self.particle_mass(), &self.params)
    }

    /// Mass of one particle, `dx^2 * rho0`.
    pub fn particle_mass(&self) -> f64 {
        Particle::lattice_mass(self.dx, &self.params)
    }

    /// Smoothing length.
    pub fn h(&self) -> f64 {
        self.h
    }

    /// Factor relating `h` to the lattice spacing.
    pub fn h_factor(&self) -> f64 {
        self.h_factor
    }

    /// Lattice spacing.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Simulated time the driver should stop at.
    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Step size the next integration will use.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The `0.1 h / c0` estimate every sweep's bounds start from.
    pub fn initial_dt(&self) -> f64 {
        self.initial_dt
    }

    /// Bounds recorded by the most recent step.
    pub fn last_bounds(&self) -> TimestepBounds {
        self.bounds
    }

    /// Physical constants.
    pub fn params(&self) -> &PhysicalParams {
        &self.params
    }

    /// Initial layout.
    pub fn layout(&self) -> &DomainLayout {
        &self.layout
    }

    /// Inner region padded by `3h`.
    pub fn padded_bounds(&self) -> Rect {
        self.outer
    }

    /// The search grid, once built.
    pub fn grid(&self) -> Option<&SearchGrid> {
        self.grid.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_box() -> Domain {
        let layout = DomainLayout::filled(Rect::new([0.0, 0.0], [1.0, 1.0]));
        Domain::with_setup(1.3, 0.1, 1.0, PhysicalParams::default(), layout)
    }

    #[test]
    fn configure_derives_h_and_dt() {
        let domain = Domain::configure(1.3, 0.1, 2.0);
        assert!((domain.h() - 0.13).abs() < 1.0e-12);
        assert!((domain.dt() - 0.1 * 0.13 / 20.0).abs() < 1.0e-15);
        assert_eq!(domain.t_max(), 2.0);
        let outer = domain.padded_bounds();
        assert!((outer.min[0] + 0.39).abs() < 1.0e-12);
        assert!((outer.max[1] - 10.39).abs() < 1.0e-12);
    }

    #[test]
    fn steps_before_grid_fail() {
        let mut domain = small_box();
        domain.insert_particle([0.5, 0.5], [0.0, 0.0], false);
        assert_eq!(domain.rebuild_grid(), Err(SimError::GridNotBuilt));
        assert_eq!(
            domain.evaluate_forces(SearchMode::Symmetric),
            Err(SimError::GridNotBuilt)
        );
    }

    #[test]
    fn lattice_classifies_fluid_and_boundary() {
        let mut domain = small_box();
        domain.build_grid();
        let added = domain.place_lattice();
        assert_eq!(added, domain.particle_count());

        let inner = domain.layout().inner;
        for p in domain.particles() {
            assert_eq!(p.is_boundary, !inner.contains(p.x));
        }
        let fluid = domain.particles().iter().filter(|p| !p.is_boundary).count();
        assert!(fluid > 0);
        assert!(fluid < added);
    }

    #[test]
    fn lattice_skips_voids() {
        let mut layout = DomainLayout::filled(Rect::new([0.0, 0.0], [1.0, 1.0]));
        layout.voids.push(Rect::new([0.0, 0.5], [1.0, 1.0]));
        let mut domain = Domain::with_setup(1.3, 0.1, 1.0, PhysicalParams::default(), layout);
        domain.build_grid();
        domain.place_lattice();
        let void = domain.layout().voids[0];
        assert!(domain.particles().iter().all(|p| !void.contains(p.x)));
    }

    #[test]
    fn empty_inner_region_gives_only_boundary() {
        let mut layout = DomainLayout::filled(Rect::new([0.0, 0.0], [1.0, 1.0]));
        layout.voids.push(Rect::new([-0.01, -0.01], [1.01, 1.01]));
        let mut domain = Domain::with_setup(1.3, 0.1, 1.0, PhysicalParams::default(), layout);
        domain.build_grid();
        domain.place_lattice();
        assert!(domain.particles().iter().all(|p| p.is_boundary));
    }

    #[test]
    fn placed_particles_fit_the_grid() {
        let mut domain = Domain::configure(1.3, 0.25, 1.0);
        domain.build_grid();
        domain.place_lattice();
        domain.rebuild_grid().unwrap();
    }

    #[test]
    fn inserted_boundary_is_at_rest() {
        let mut domain = small_box();
        let i = domain.insert_particle([0.5, -0.1], [1.0, 1.0], true);
        assert_eq!(domain.particles()[i].v, [0.0, 0.0]);
        let j = domain.insert_particle([0.5, 0.5], [1.0, 0.0], false);
        assert_eq!(domain.particles()[j].v, [1.0, 0.0]);
    }

    #[test]
    fn coincident_pair_is_reported() {
        let mut domain = small_box();
        domain.build_grid();
        domain.insert_particle([0.5, 0.5], [0.0, 0.0], false);
        domain.insert_particle([0.5, 0.5], [0.0, 0.0], false);
        domain.rebuild_grid().unwrap();
        for mode in [SearchMode::Symmetric, SearchMode::Full] {
            let err = domain.evaluate_forces(mode).unwrap_err();
            assert!(
                matches!(err, SimError::CoincidentParticles { .. }),
                "{mode:?}: unexpected {err:?}"
            );
        }
    }

    /// Lattice with varied velocities and densities so every term is active.
    fn disturbed_box() -> Domain {
        let mut domain = small_box();
        domain.build_grid();
        domain.place_lattice();
        for (i, p) in domain.particles.iter_mut().enumerate() {
            if !p.is_boundary {
                let phase = i as f64 * 0.7;
                p.v = [0.3 * phase.sin(), 0.2 * phase.cos()];
                p.rho = 1000.0 + 5.0 * (phase * 1.3).sin();
            }
        }
        let params = domain.params;
        for p in &mut domain.particles {
            p.update_pressure(&params);
        }
        domain.rebuild_grid().unwrap();
        domain
    }

    #[test]
    fn parallel_bounds_match_serial_pair_scan() {
        let mut domain = disturbed_box();
        // Loose seed so the minima come from the pairs.
        domain.initial_dt = 1.0;
        let bounds = domain.evaluate_forces(SearchMode::Symmetric).unwrap();

        let (h, params) = (domain.h, domain.params);
        let particles = domain.particles();
        let mut expected = TimestepBounds::seeded(1.0);
        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                if sph::distance(&particles[i], &particles[j]) < 2.0 * h {
                    expected.update(&particles[i], &particles[j], h, &params);
                    expected.update(&particles[j], &particles[i], h, &params);
                }
            }
        }

        assert!(bounds.cfl < 1.0 && bounds.force < 1.0 && bounds.acoustic < 1.0);
        assert_eq!(bounds, expected);
    }

    #[test]
    fn search_modes_agree_on_forces() {
        let mut domain = disturbed_box();

        let sym_bounds = domain.evaluate_forces(SearchMode::Symmetric).unwrap();
        let sym: Vec<_> = domain.particles().iter().map(|p| (p.a, p.drho)).collect();
        let full_bounds = domain.evaluate_forces(SearchMode::Full).unwrap();
        let full: Vec<_> = domain.particles().iter().map(|p| (p.a, p.drho)).collect();

        assert_eq!(sym_bounds.cfl, full_bounds.cfl);
        assert_eq!(sym_bounds.acoustic, full_bounds.acoustic);
        assert!((sym_bounds.force - full_bounds.force).abs() < 1.0e-9 * full_bounds.force);
        for (i, ((a_s, d_s), (a_f, d_f))) in sym.iter().zip(&full).enumerate() {
            for k in 0..2 {
                let tol = 1.0e-9 * a_f[k].abs().max(1.0);
                assert!((a_s[k] - a_f[k]).abs() < tol, "particle {i} a[{k}]: {a_s:?} vs {a_f:?}");
            }
            assert!((d_s - d_f).abs() < 1.0e-9 * d_f.abs().max(1.0), "particle {i} drho");
        }
    }

    #[test]
    fn smoothing_uniform_density_is_identity() {
        let mut domain = small_box();
        domain.build_grid();
        domain.place_lattice();
        domain.rebuild_grid().unwrap();
        domain.smooth_densities().unwrap();
        for p in domain.particles() {
            assert!((p.rho - 1000.0).abs() < 1.0e-9, "rho = {}", p.rho);
            assert!(p.pressure.abs() < 1.0e-6);
        }
    }

    #[test]
    fn smoothing_pulls_outlier_toward_neighbors() {
        let mut domain = small_box();
        domain.build_grid();
        domain.place_lattice();
        let target = domain
            .particles()
            .iter()
            .position(|p| !p.is_boundary)
            .unwrap();
        domain.particles[target].rho = 1200.0;
        domain.rebuild_grid().unwrap();
        domain.smooth_densities().unwrap();
        let rho = domain.particles()[target].rho;
        assert!(rho > 1000.0 && rho < 1200.0, "smoothed rho = {rho}");
    }

    #[test]
    fn check_state_flags_bad_density() {
        let mut domain = small_box();
        domain.insert_particle([0.5, 0.5], [0.0, 0.0], false);
        domain.particles[0].rho = -1.0;
        assert_eq!(
            domain.check_state(),
            Err(SimError::NonPositiveDensity {
                particle: 0,
                density: -1.0
            })
        );
        domain.particles[0].rho = f64::NAN;
        assert_eq!(
            domain.check_state(),
            Err(SimError::NonFiniteState {
                particle: 0,
                field: ParticleField::Density
            })
        );
    }
}
