//! State estimation: weighted means, confidence, target velocity.
//!
//! The estimator refreshes the belief summary after each resample. Robot
//! confidence is a cluster-compactness proxy: the share of weight mass
//! sitting close to the weighted-mean pose. The target velocity comes from
//! an ordinary-least-squares regression over a bounded window of world-frame
//! sightings contributed by whichever robot currently sees the target best.

use nalgebra::{Rotation2, Vector2};

use crate::common::{linear_regression_slope, weighted_mean, wrap_angle};
use crate::output::RobotBelief;

use super::EngineCore;

/// Samples banked before the regression runs.
pub const VELOCITY_ESTIMATOR_CAPACITY: usize = 15;

/// Body-frame window (both axes) inside which a target sighting may feed
/// the velocity estimator, meters.
pub const TARGET_OBSERVATION_WINDOW: f64 = 4.0;

/// Planar distance to the mean pose inside which a particle counts toward
/// the confidence mass, meters.
pub const CONF_POSITION_RADIUS: f64 = 0.3;

/// Heading distance to the mean pose inside which a particle counts toward
/// the confidence mass, radians.
pub const CONF_HEADING_RADIUS: f64 = 0.3;

/// Bounded FIFO of timestamped world-frame target positions with per-axis
/// regression slopes.
#[derive(Debug, Clone)]
pub struct TargetVelocityEstimator {
    capacity: usize,
    origin: Option<f64>,
    times: Vec<f64>,
    positions: [Vec<f64>; 3],
}

impl TargetVelocityEstimator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            origin: None,
            times: Vec::with_capacity(capacity + 1),
            positions: [
                Vec::with_capacity(capacity + 1),
                Vec::with_capacity(capacity + 1),
                Vec::with_capacity(capacity + 1),
            ],
        }
    }

    /// Bank one sighting; evicts the oldest sample past the capacity.
    pub fn insert(&mut self, stamp: f64, position: [f64; 3]) {
        let origin = *self.origin.get_or_insert(stamp);
        self.times.push(stamp - origin);
        for (axis, column) in self.positions.iter_mut().enumerate() {
            column.push(position[axis]);
        }
        if self.times.len() > self.capacity {
            self.times.remove(0);
            for column in self.positions.iter_mut() {
                column.remove(0);
            }
        }
    }

    /// Number of banked samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// True once the window is full.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.times.len() == self.capacity
    }

    /// Per-axis regression slope of position against time.
    pub fn slopes(&self) -> [f64; 3] {
        let mut slopes = [0.0; 3];
        for (axis, column) in self.positions.iter().enumerate() {
            slopes[axis] = linear_regression_slope(&self.times, column);
            log::debug!("target velocity axis {}: {:.4} m/s", axis, slopes[axis]);
        }
        slopes
    }
}

impl EngineCore {
    /// Refresh the belief summary from the current particle set.
    pub(crate) fn estimate(&mut self, stamp: f64) {
        let weights = self.store.weights().to_vec();
        let mass: f64 = weights.iter().sum();

        for robot in 0..self.config.n_robots {
            if !self.config.playing[robot] {
                continue;
            }
            let (xs, ys, thetas) = self.store.robot_columns(robot);
            let mean = [
                weighted_mean(xs, &weights),
                weighted_mean(ys, &weights),
                weighted_mean(thetas, &weights),
            ];

            let mut conf = 0.0;
            if mass > 1e-15 {
                for (p, &w) in weights.iter().enumerate() {
                    let dx = xs[p] - mean[0];
                    let dy = ys[p] - mean[1];
                    let close_in_plane = dx * dx + dy * dy
                        <= CONF_POSITION_RADIUS * CONF_POSITION_RADIUS;
                    let close_in_heading =
                        wrap_angle(thetas[p] - mean[2]).abs() <= CONF_HEADING_RADIUS;
                    if close_in_plane && close_in_heading {
                        conf += w;
                    }
                }
                conf /= mass;
            }
            self.beliefs[robot] = RobotBelief { pose: mean, conf };
        }

        let target_pos = {
            let (tx, ty, tz) = self.store.target_columns(0);
            [
                weighted_mean(tx, &weights),
                weighted_mean(ty, &weights),
                weighted_mean(tz, &weights),
            ]
        };
        self.target.pos = target_pos;

        self.insert_velocity_sample(stamp);
        if self.velocity_estimator.is_ready() {
            self.target.vel = self.velocity_estimator.slopes();
        }

        self.iteration_time.update(stamp);
        self.stats.iterations += 1;
        self.collapse_flagged = false;
    }

    /// Feed the velocity estimator from the best-placed observer: the
    /// highest-confidence playing robot that found the target inside the
    /// observation window.
    fn insert_velocity_sample(&mut self, stamp: f64) {
        let mut chosen = None;
        let mut max_conf = 0.0;
        for robot in 0..self.config.n_robots {
            if !self.config.playing[robot] {
                continue;
            }
            let obs = &self.target_buf[robot];
            if obs.found
                && obs.x < TARGET_OBSERVATION_WINDOW
                && obs.y < TARGET_OBSERVATION_WINDOW
                && self.beliefs[robot].conf > max_conf
            {
                chosen = Some(robot);
                max_conf = self.beliefs[robot].conf;
            }
        }
        let Some(robot) = chosen else {
            return;
        };

        let obs = &self.target_buf[robot];
        let pose = self.beliefs[robot].pose;
        let world =
            Rotation2::new(pose[2]) * Vector2::new(obs.x, obs.y) + Vector2::new(pose[0], pose[1]);
        self.velocity_estimator
            .insert(stamp, [world.x, world.y, obs.z]);
    }
}
