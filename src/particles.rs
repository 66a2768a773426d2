//! Column-major particle store.
//!
//! The joint state of `R` robots and `T` targets is sampled by `P`
//! particles. Rather than an array of particle structs, the store keeps one
//! contiguous column per state dimension (a *subparticle set*): prediction
//! and fusion sweep a handful of columns across all particles, so the hot
//! loops stay cache-friendly and auto-vectorizable.
//!
//! Column layout: robot `r` owns columns `3r..3r+3` (x, y, θ); target `t`
//! owns `3R + 3t .. +3` (x, y, z); the final column holds the particle
//! weights. The store is allocated once and never reallocated.

use rand::Rng;

use crate::common::{sample_uniform, std_dev};

/// State dimensions per robot (x, y, θ).
pub const STATES_PER_ROBOT: usize = 3;
/// State dimensions per target (x, y, z).
pub const STATES_PER_TARGET: usize = 3;

/// The particle matrix, stored one column (subparticle set) at a time.
#[derive(Debug, Clone)]
pub struct ParticleStore {
    columns: Vec<Vec<f64>>,
    n_particles: usize,
    n_robots: usize,
    n_targets: usize,
}

impl ParticleStore {
    /// Allocate a zeroed store for `n_particles` particles.
    pub fn new(n_particles: usize, n_robots: usize, n_targets: usize) -> Self {
        let n_columns = n_robots * STATES_PER_ROBOT + n_targets * STATES_PER_TARGET + 1;
        Self {
            columns: vec![vec![0.0; n_particles]; n_columns],
            n_particles,
            n_robots,
            n_targets,
        }
    }

    /// Number of particles `P`.
    #[inline]
    pub fn num_particles(&self) -> usize {
        self.n_particles
    }

    /// Number of columns `D` (state dimensions plus the weight column).
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of robot slots.
    #[inline]
    pub fn num_robots(&self) -> usize {
        self.n_robots
    }

    /// Number of targets.
    #[inline]
    pub fn num_targets(&self) -> usize {
        self.n_targets
    }

    /// First column of robot `r`.
    #[inline]
    pub fn robot_offset(&self, robot: usize) -> usize {
        robot * STATES_PER_ROBOT
    }

    /// First target column.
    #[inline]
    pub fn target_offset(&self) -> usize {
        self.n_robots * STATES_PER_ROBOT
    }

    /// Index of the weight column.
    #[inline]
    pub fn weight_offset(&self) -> usize {
        self.columns.len() - 1
    }

    /// One subparticle set.
    #[inline]
    pub fn column(&self, k: usize) -> &[f64] {
        &self.columns[k]
    }

    #[inline]
    pub(crate) fn column_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.columns[k]
    }

    /// The weight column.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.columns[self.weight_offset()]
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> &mut [f64] {
        let k = self.weight_offset();
        &mut self.columns[k]
    }

    /// Robot `r`'s (x, y, θ) columns.
    #[inline]
    pub fn robot_columns(&self, robot: usize) -> (&[f64], &[f64], &[f64]) {
        let base = self.robot_offset(robot);
        (
            self.columns[base].as_slice(),
            self.columns[base + 1].as_slice(),
            self.columns[base + 2].as_slice(),
        )
    }

    /// Robot `r`'s (x, y, θ) columns, mutable.
    #[inline]
    pub(crate) fn robot_columns_mut(
        &mut self,
        robot: usize,
    ) -> (&mut [f64], &mut [f64], &mut [f64]) {
        let base = self.robot_offset(robot);
        let [x, y, theta] = &mut self.columns[base..base + 3] else {
            unreachable!("robot column range is always 3 wide");
        };
        (x.as_mut_slice(), y.as_mut_slice(), theta.as_mut_slice())
    }

    /// Target `t`'s (x, y, z) columns.
    #[inline]
    pub fn target_columns(&self, target: usize) -> (&[f64], &[f64], &[f64]) {
        let base = self.target_offset() + target * STATES_PER_TARGET;
        (
            self.columns[base].as_slice(),
            self.columns[base + 1].as_slice(),
            self.columns[base + 2].as_slice(),
        )
    }

    /// Target `t`'s (x, y, z) columns, mutable.
    #[inline]
    pub(crate) fn target_columns_mut(
        &mut self,
        target: usize,
    ) -> (&mut [f64], &mut [f64], &mut [f64]) {
        let base = self.target_offset() + target * STATES_PER_TARGET;
        let [x, y, z] = &mut self.columns[base..base + 3] else {
            unreachable!("target column range is always 3 wide");
        };
        (x.as_mut_slice(), y.as_mut_slice(), z.as_mut_slice())
    }

    /// Gather one full particle (row view across all columns).
    pub fn particle(&self, p: usize) -> Vec<f64> {
        self.columns.iter().map(|col| col[p]).collect()
    }

    /// Copy particle `src_idx` of `src` into slot `dst_idx`, restricted to
    /// the listed columns.
    pub(crate) fn copy_particle_cols(
        &mut self,
        dst_idx: usize,
        src: &ParticleStore,
        src_idx: usize,
        cols: &[usize],
    ) {
        for &k in cols {
            self.columns[k][dst_idx] = src.columns[k][src_idx];
        }
    }

    /// Apply the permutation `order` to the listed columns:
    /// `column[k][i] = old[k][order[i]]`.
    pub(crate) fn reorder_cols(&mut self, order: &[usize], cols: &[usize]) {
        debug_assert_eq!(order.len(), self.n_particles);
        let mut scratch = vec![0.0; self.n_particles];
        for &k in cols {
            let col = &mut self.columns[k];
            for (i, &src) in order.iter().enumerate() {
                scratch[i] = col[src];
            }
            col.copy_from_slice(&scratch);
        }
    }

    /// Assign `value` to every weight.
    pub(crate) fn reset_weights(&mut self, value: f64) {
        self.weights_mut().fill(value);
    }

    /// Standard deviation of one column.
    pub fn column_std_dev(&self, k: usize) -> f64 {
        std_dev(&self.columns[k])
    }

    /// Draw every state column uniformly from its `[lo, hi)` interval and
    /// reset the weights to `1/P`.
    ///
    /// `bounds` holds one interval per state column (`D − 1` entries).
    pub(crate) fn init_uniform<R: Rng + ?Sized>(&mut self, bounds: &[(f64, f64)], rng: &mut R) {
        debug_assert_eq!(bounds.len(), self.num_columns() - 1);
        for (col, &(lo, hi)) in self.columns.iter_mut().zip(bounds) {
            for v in col.iter_mut() {
                *v = sample_uniform(rng, lo, hi);
            }
        }
        let w = 1.0 / self.n_particles as f64;
        self.reset_weights(w);
    }
}
