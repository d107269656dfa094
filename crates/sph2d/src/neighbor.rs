//! Uniform 2D bucket grid for neighbor search.
//!
//! Buckets are stored as sorted-index + cell-offset arrays rather than a
//! `Vec<Vec<_>>` per cell, so a rebuild is a counting sort with no per-cell
//! allocation. The scatter walks particles in index order, so within a bucket
//! particles appear in insertion order and their position there is the
//! particle's `slot_in_cell`.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::particle::{cell_of, Particle};

/// Cells scanned by the half-stencil besides the particle's own cell.
///
/// For every nonzero offset `d` in the 3x3 block exactly one of `d` and `-d`
/// is listed, so each pair of adjacent cells is visited from one side only.
const FORWARD_OFFSETS: [[i64; 2]; 4] = [[-1, 1], [0, 1], [1, 1], [1, 0]];

/// Which neighbors a query enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// All particles in the 3x3 block around the target, self excluded.
    /// Every pair is seen twice over a full sweep, once from each side.
    Full,
    /// Four forward cells plus the earlier slots of the target's own cell.
    /// Every pair is seen exactly once over a full sweep, so the caller must
    /// apply each interaction to both members.
    #[default]
    Symmetric,
}

/// Uniform grid of square cells over a fixed axis-aligned region.
///
/// Cell size should equal the kernel support radius (2h) so the 3x3 block
/// around a particle's cell holds every particle within 2h of it.
#[derive(Debug, Clone)]
pub struct SearchGrid {
    cell_size: f64,
    grid_min: [f64; 2],
    grid_dims: [usize; 2],
    /// Particle indices sorted by cell.
    sorted_indices: Vec<usize>,
    /// Start offset in `sorted_indices` for each cell.
    cell_offsets: Vec<usize>,
    /// Number of particles in each cell.
    cell_counts: Vec<usize>,
    /// Per-cell write head used during the scatter.
    write_heads: Vec<usize>,
}

impl SearchGrid {
    /// Allocate a grid covering `[domain_min, domain_max]`.
    ///
    /// Each axis gets `floor(extent / cell_size) + 1` cells so a point lying
    /// exactly on `domain_max` still has a bucket.
    pub fn new(cell_size: f64, domain_min: [f64; 2], domain_max: [f64; 2]) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        let dims = [
            ((domain_max[0] - domain_min[0]) / cell_size + 1.0).floor().max(1.0) as usize,
            ((domain_max[1] - domain_min[1]) / cell_size + 1.0).floor().max(1.0) as usize,
        ];
        let total_cells = dims[0] * dims[1];
        Self {
            cell_size,
            grid_min: domain_min,
            grid_dims: dims,
            sorted_indices: Vec::new(),
            cell_offsets: vec![0; total_cells],
            cell_counts: vec![0; total_cells],
            write_heads: vec![0; total_cells],
        }
    }

    /// Side length of one cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of cells along each axis.
    pub fn dims(&self) -> [usize; 2] {
        self.grid_dims
    }

    fn total_cells(&self) -> usize {
        self.grid_dims[0] * self.grid_dims[1]
    }

    /// Flat cell index, or `None` if `cell` lies outside the grid.
    #[inline]
    fn cell_hash(&self, cell: [i64; 2]) -> Option<usize> {
        let in_x = cell[0] >= 0 && (cell[0] as usize) < self.grid_dims[0];
        let in_y = cell[1] >= 0 && (cell[1] as usize) < self.grid_dims[1];
        if in_x && in_y {
            Some(cell[0] as usize + cell[1] as usize * self.grid_dims[0])
        } else {
            None
        }
    }

    /// Particle indices in `cell`, in insertion order. Empty if out of range.
    pub fn bucket(&self, cell: [i64; 2]) -> &[usize] {
        match self.cell_hash(cell) {
            Some(c) => {
                let start = self.cell_offsets[c];
                &self.sorted_indices[start..start + self.cell_counts[c]]
            }
            None => &[],
        }
    }

    /// Rebuild every bucket from the current particle positions.
    ///
    /// Recomputes each particle's `cell` and `slot_in_cell`. Fails if any
    /// particle lies outside the grid, in which case neither the grid nor the
    /// particles are modified.
    pub fn rebuild(&mut self, particles: &mut [Particle]) -> Result<(), SimError> {
        let n = particles.len();
        let total_cells = self.total_cells();

        // --- 1. Flat cell per particle; reject escapes before touching buckets ---
        let mut flat_cells = Vec::with_capacity(n);
        for (i, p) in particles.iter().enumerate() {
            let cell = cell_of(p.x, self.grid_min, self.cell_size);
            let c = self
                .cell_hash(cell)
                .ok_or(SimError::OutsideGrid { particle: i, cell })?;
            flat_cells.push((cell, c));
        }

        // --- 2. Counts ---
        self.cell_counts.clear();
        self.cell_counts.resize(total_cells, 0);
        for (p, &(cell, c)) in particles.iter_mut().zip(&flat_cells) {
            p.cell = cell;
            self.cell_counts[c] += 1;
        }

        // --- 3. Prefix-sum to get cell offsets ---
        self.cell_offsets.clear();
        self.cell_offsets.resize(total_cells, 0);
        let mut running = 0;
        for c in 0..total_cells {
            self.cell_offsets[c] = running;
            running += self.cell_counts[c];
        }

        // --- 4. Scatter in index order, recording each slot ---
        self.sorted_indices.resize(n, 0);
        self.write_heads.clear();
        self.write_heads.extend_from_slice(&self.cell_offsets);
        for (i, (p, &(_, c))) in particles.iter_mut().zip(&flat_cells).enumerate() {
            let pos = self.write_heads[c];
            self.sorted_indices[pos] = i;
            p.slot_in_cell = pos - self.cell_offsets[c];
            self.write_heads[c] += 1;
        }

        tracing::trace!(particles = n, cells = total_cells, "search grid rebuilt");
        Ok(())
    }

    /// Visit neighbors of `target` closer than `radius`.
    ///
    /// `f` receives the neighbor index and the separation. The target's own
    /// `cell` and `slot_in_cell` must be current (i.e. set by the last
    /// [`rebuild`](Self::rebuild)).
    pub fn for_each_neighbor<F>(
        &self,
        target: usize,
        particles: &[Particle],
        radius: f64,
        mode: SearchMode,
        mut f: F,
    ) where
        F: FnMut(usize, f64),
    {
        let result: Result<(), Infallible> =
            self.try_for_each_neighbor(target, particles, radius, mode, |j, r| {
                f(j, r);
                Ok(())
            });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`for_each_neighbor`](Self::for_each_neighbor); stops
    /// at the first error returned by `f`.
    pub fn try_for_each_neighbor<E, F>(
        &self,
        target: usize,
        particles: &[Particle],
        radius: f64,
        mode: SearchMode,
        mut f: F,
    ) -> Result<(), E>
    where
        F: FnMut(usize, f64) -> Result<(), E>,
    {
        let part = &particles[target];
        let [cx, cy] = part.cell;

        let mut visit = |bucket: &[usize]| -> Result<(), E> {
            for &j in bucket {
                if j == target {
                    continue;
                }
                let dx = part.x[0] - particles[j].x[0];
                let dy = part.x[1] - particles[j].x[1];
                let r = (dx * dx + dy * dy).sqrt();
                if r < radius {
                    f(j, r)?;
                }
            }
            Ok(())
        };

        match mode {
            SearchMode::Full => {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        visit(self.bucket([cx + dx, cy + dy]))?;
                    }
                }
            }
            SearchMode::Symmetric => {
                let own = self.bucket(part.cell);
                let earlier = part.slot_in_cell.min(own.len());
                visit(&own[..earlier])?;
                for [dx, dy] in FORWARD_OFFSETS {
                    visit(self.bucket([cx + dx, cy + dy]))?;
                }
            }
        }
        Ok(())
    }
}
