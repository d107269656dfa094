//! Kernel normalization via SPH density summation.
//!
//! Fills a box with a lattice at spacing `dx = h / 1.3` and checks that the
//! summed density `sum_j m W_ij` at an interior particle matches rho_0.

use sph2d::{cubic_spline, DomainLayout, Domain, PhysicalParams, Rect, SearchMode};

#[test]
fn density_at_rest_lattice_matches_rho0() {
    let dx = 0.1;
    let layout = DomainLayout::filled(Rect::new([0.0, 0.0], [2.0, 2.0]));
    let mut domain = Domain::with_setup(1.3, dx, 1.0, PhysicalParams::default(), layout);
    domain.build_grid();
    domain.place_lattice();
    domain.rebuild_grid().unwrap();

    let h = domain.h();
    let mass = domain.particle_mass();
    let particles = domain.particles();
    let grid = domain.grid().unwrap();

    // Particle nearest the middle of the box.
    let center = (0..particles.len())
        .min_by(|&a, &b| {
            let da = (particles[a].x[0] - 1.0).hypot(particles[a].x[1] - 1.0);
            let db = (particles[b].x[0] - 1.0).hypot(particles[b].x[1] - 1.0);
            da.total_cmp(&db)
        })
        .unwrap();

    let mut rho = mass * cubic_spline(0.0, h);
    let mut neighbors = 0;
    grid.for_each_neighbor(center, particles, 2.0 * h, SearchMode::Full, |_, r| {
        rho += mass * cubic_spline(r, h);
        neighbors += 1;
    });

    assert!(neighbors > 10, "only {neighbors} neighbors");
    let rel = (rho - 1000.0).abs() / 1000.0;
    assert!(rel < 1.0e-3, "summed density {rho} deviates {rel:.2e} from rho_0");
}

#[test]
fn kernel_integrates_to_one_over_its_support() {
    let h = 0.37;
    let n = 4000;
    let dr = 2.0 * h / n as f64;
    let integral: f64 = (0..n)
        .map(|i| {
            let r = (i as f64 + 0.5) * dr;
            2.0 * std::f64::consts::PI * r * cubic_spline(r, h) * dr
        })
        .sum();
    assert!((integral - 1.0).abs() < 1.0e-5, "integral = {integral}");
}
