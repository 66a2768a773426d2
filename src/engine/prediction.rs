//! Odometry-driven propagation of one robot's pose columns.
//!
//! The body-frame odometry increment is treated as a relative SE(2) step
//! and decomposed into an initial rotation, a translation and a final
//! rotation. Each component is perturbed with zero-mean Gaussian noise whose
//! deviation mixes the rotational and translational magnitudes through the
//! four α coefficients, then the noisy step is composed onto every particle.

use rand::Rng;

use crate::common::{sample_normal, wrap_angle};
use crate::particles::ParticleStore;

/// One odometry reading: the body-frame pose increment since the previous
/// reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Odometry {
    /// Forward displacement, meters
    pub x: f64,
    /// Lateral displacement, meters
    pub y: f64,
    /// Heading change, radians
    pub theta: f64,
}

/// Propagate robot `robot`'s subparticle triple through one odometry step.
///
/// Only columns `3·robot .. 3·robot+3` are touched; weights and every other
/// robot's columns are left alone, so predictions for different robots are
/// independent.
pub(crate) fn predict_robot<R: Rng + ?Sized>(
    store: &mut ParticleStore,
    robot: usize,
    odom: &Odometry,
    alpha: &[f64; 4],
    rng: &mut R,
) {
    let rot1 = odom.y.atan2(odom.x);
    let trans = (odom.x * odom.x + odom.y * odom.y).sqrt();
    let rot2 = odom.theta - rot1;

    let sigma_rot1 = alpha[0] * rot1.abs() + alpha[1] * trans;
    let sigma_trans = alpha[2] * trans + alpha[3] * (rot1 + rot2).abs();
    let sigma_rot2 = alpha[0] * rot2.abs() + alpha[1] * trans;

    let (xs, ys, thetas) = store.robot_columns_mut(robot);
    for ((x, y), theta) in xs.iter_mut().zip(ys.iter_mut()).zip(thetas.iter_mut()) {
        *theta = wrap_angle(*theta + sample_normal(rng, rot1, sigma_rot1));
        let step = sample_normal(rng, trans, sigma_trans);
        *x += step * theta.cos();
        *y += step * theta.sin();
        *theta = wrap_angle(*theta + sample_normal(rng, rot2, sigma_rot2));
    }
}
