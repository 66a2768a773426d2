//! Measurement fusion: landmark likelihoods, target likelihoods and the
//! target motion step.
//!
//! Landmark fusion refreshes one robot's weight-component column; the global
//! weight column is then recombined as the product of all playing robots'
//! components, so a single robot's new measurement set never discards the
//! information contributed by its teammates.

use std::f64::consts::PI;

use nalgebra::{Rotation2, Vector2};
use rand::Rng;

use crate::common::sample_normal;
use crate::map::LandmarkMap;
use crate::observation::{usable_indices, LandmarkObservation, TargetObservation};
use crate::particles::ParticleStore;

/// Acceleration noise deviation for the target motion step, m/s².
pub const TARGET_ACCEL_STDDEV: f64 = 20.0;

/// Refresh robot `robot`'s weight-component column from its buffered
/// landmark set.
///
/// For every usable landmark the predicted body-frame observation is
/// `ẑ = R(θ)ᵀ·(m − t)` and the per-particle likelihood
/// `(2π·√(covXX·covYY))⁻¹ · exp(−½·rᵀQ⁻¹r)` is **summed** into the column
/// (sum, not product: a single dropped-out landmark then cannot zero the
/// whole component).
///
/// Returns the number of landmarks used. With an empty usable set the
/// column is left unchanged.
pub(crate) fn fuse_robots(
    store: &ParticleStore,
    component: &mut [f64],
    robot: usize,
    observations: &[LandmarkObservation],
    map: &LandmarkMap,
) -> usize {
    let used = usable_indices(observations);
    if used.is_empty() {
        return 0;
    }

    component.fill(0.0);
    let (xs, ys, thetas) = store.robot_columns(robot);

    for &l in &used {
        let obs = &observations[l];
        let landmark = map[l].position();
        let z = Vector2::new(obs.x, obs.y);
        let inv_xx = 1.0 / obs.cov_xx;
        let inv_yy = 1.0 / obs.cov_yy;
        let norm = 1.0 / (2.0 * PI * (obs.cov_xx * obs.cov_yy).sqrt());

        for (p, weight) in component.iter_mut().enumerate() {
            let delta = Vector2::new(landmark.x - xs[p], landmark.y - ys[p]);
            let z_hat = Rotation2::new(thetas[p]).inverse() * delta;
            let r = z - z_hat;
            let exp_arg = -0.5 * (r.x * r.x * inv_xx + r.y * r.y * inv_yy);
            *weight += norm * exp_arg.exp();
        }
    }
    used.len()
}

/// Recombine the weight column as the product of the playing robots'
/// component columns.
pub(crate) fn combine_weights(
    store: &mut ParticleStore,
    components: &[Vec<f64>],
    playing: &[bool],
) {
    let weights = store.weights_mut();
    weights.fill(1.0);
    for (component, _) in components.iter().zip(playing).filter(|(_, &p)| p) {
        for (w, &c) in weights.iter_mut().zip(component) {
            *w *= c;
        }
    }
}

/// Multiply every particle's weight by the target likelihood of each
/// observing robot.
///
/// The observer-frame sighting is moved into world coordinates through the
/// particle's own pose for that robot, then compared against the particle's
/// target position with `Q = diag(covXX, covYY, covZZ)`.
pub(crate) fn fuse_target(
    store: &mut ParticleStore,
    target: usize,
    observations: &[TargetObservation],
    playing: &[bool],
) {
    let n = store.num_particles();
    let mut factors = vec![1.0; n];
    let mut any = false;

    {
        let (tx, ty, tz) = store.target_columns(target);
        for (robot, obs) in observations.iter().enumerate() {
            if !playing.get(robot).copied().unwrap_or(false) || !obs.is_usable() {
                continue;
            }
            any = true;

            let cov_zz = obs.cov_dd;
            let inv_xx = 1.0 / obs.cov_xx;
            let inv_yy = 1.0 / obs.cov_yy;
            let inv_zz = 1.0 / cov_zz;
            let norm =
                1.0 / ((2.0 * PI).powi(3).sqrt() * (obs.cov_xx * obs.cov_yy * cov_zz).sqrt());
            let body = Vector2::new(obs.x, obs.y);

            let (xs, ys, thetas) = store.robot_columns(robot);
            for (p, factor) in factors.iter_mut().enumerate() {
                let world = Rotation2::new(thetas[p]) * body + Vector2::new(xs[p], ys[p]);
                let rx = world.x - tx[p];
                let ry = world.y - ty[p];
                let rz = obs.z - tz[p];
                let exp_arg =
                    -0.5 * (rx * rx * inv_xx + ry * ry * inv_yy + rz * rz * inv_zz);
                *factor *= norm * exp_arg.exp();
            }
        }
    }

    if any {
        for (w, &f) in store.weights_mut().iter_mut().zip(&factors) {
            *w *= f;
        }
    }
}

/// Propagate the target columns through one iteration interval using the
/// current velocity estimate plus sampled acceleration noise.
pub(crate) fn predict_target<R: Rng + ?Sized>(
    store: &mut ParticleStore,
    target: usize,
    velocity: &[f64; 3],
    dt: f64,
    rng: &mut R,
) {
    let half_dt2 = 0.5 * dt * dt;
    let (tx, ty, tz) = store.target_columns_mut(target);
    for (axis, column) in [tx, ty, tz].into_iter().enumerate() {
        let drift = velocity[axis] * dt;
        for v in column.iter_mut() {
            *v += drift + sample_normal(rng, 0.0, TARGET_ACCEL_STDDEV) * half_dt2;
        }
    }
}
