//! Modified multinomial resampler with elitism.
//!
//! Particles are sorted by weight, the best `κ·P` survive verbatim and the
//! remainder is redrawn from the categorical distribution of the normalized
//! weights. Absent robots' columns are excluded from every move so their
//! subparticles stay frozen.

use rand::Rng;

use crate::common::descending_order;
use crate::particles::ParticleStore;

/// Fraction of the (sorted) particle set kept verbatim.
pub const RESAMPLE_START_AT: f64 = 0.5;

/// Weight mass below which the set is considered collapsed.
pub const MIN_WEIGHT_SUM: f64 = 1e-10;

/// Resample the store in place, touching only the listed columns.
///
/// `active_cols` must contain the weight column and the state columns of
/// every playing robot and every target. The particle count is preserved
/// and all weights end up at `1/P`.
pub(crate) fn resample<R: Rng + ?Sized>(
    store: &mut ParticleStore,
    active_cols: &[usize],
    rng: &mut R,
) {
    let n = store.num_particles();
    let uniform = 1.0 / n as f64;

    let sum: f64 = store.weights().iter().sum();
    if sum < MIN_WEIGHT_SUM {
        // collapsed set: nothing to rank, keep the particles and flatten
        store.reset_weights(uniform);
        return;
    }

    // rank particles by weight, best first
    let order = descending_order(store.weights());
    store.reorder_cols(&order, active_cols);

    for w in store.weights_mut() {
        *w /= sum;
    }

    let mut cumulative = vec![0.0; n];
    let mut acc = 0.0;
    for (c, &w) in cumulative.iter_mut().zip(store.weights()) {
        acc += w;
        *c = acc;
    }

    let duplicate = store.clone();
    let keep = (n as f64 * RESAMPLE_START_AT) as usize;
    for par in keep..n {
        let draw: f64 = rng.gen();
        let m = cumulative
            .iter()
            .position(|&c| draw <= c)
            .unwrap_or(n - 1);
        store.copy_particle_cols(par, &duplicate, m, active_cols);
    }

    store.reset_weights(uniform);
}
