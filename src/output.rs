//! Belief summaries, snapshots and the observer seam.
//!
//! The engine publishes nothing itself. Pull accessors return copies of the
//! belief state, and any number of [`Observer`]s can be attached to receive
//! an [`IterationSnapshot`] after each completed fuse/resample/estimate
//! cycle; the snapshot is delivered outside the engine lock, so observers
//! may block without stalling sensor callbacks.

/// Estimated pose and confidence of one robot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RobotBelief {
    /// Weighted-mean pose (x, y, θ)
    pub pose: [f64; 3],
    /// Cluster-compactness confidence in `[0, 1]`
    pub conf: f64,
}

/// Estimated target position and velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetBelief {
    /// Weighted-mean position (x, y, z)
    pub pos: [f64; 3],
    /// Regression velocity estimate (vx, vy, vz)
    pub vel: [f64; 3],
}

/// The three iteration clocks, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationTiming {
    /// Interval between the two most recent odometry stamps, per robot
    pub odometry_dt: Vec<f64>,
    /// Clamped interval between the main robot's target stamps
    pub target_dt: f64,
    /// Interval between successive completed fuse cycles
    pub iteration_dt: f64,
}

/// Counters describing engine health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Completed fuse/resample/estimate cycles
    pub iterations: u64,
    /// Resampler executions
    pub resamples: u64,
    /// Weight-collapse recoveries (at most one counted per cycle)
    pub weight_collapses: u64,
}

/// Read-only copy of the particle matrix with per-column spread.
#[derive(Debug, Clone)]
pub struct ParticlesSnapshot {
    /// All `D` columns, `P` values each; the last column holds the weights
    pub columns: Vec<Vec<f64>>,
    /// Standard deviation of every column
    pub std_devs: Vec<f64>,
}

impl ParticlesSnapshot {
    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }
}

/// Everything an observer needs to publish one completed iteration.
#[derive(Debug, Clone)]
pub struct IterationSnapshot {
    /// Per-robot beliefs (absent robots keep their last value)
    pub robots: Vec<RobotBelief>,
    /// Target belief
    pub target: TargetBelief,
    /// Iteration clocks
    pub timing: IterationTiming,
    /// Engine counters
    pub stats: EngineStats,
    /// Fixed height for publishing robot poses, from the configuration
    pub robot_height: f64,
}

/// Capability interface for result publication.
///
/// Implementations receive a snapshot after every completed iteration. All
/// methods have empty defaults, so an observer only overrides what it needs.
pub trait Observer: Send {
    /// Called after each fuse/resample/estimate cycle, outside the engine
    /// lock.
    fn on_iteration_complete(&mut self, _snapshot: &IterationSnapshot) {}
}

/// Observer that discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl Observer for NoOpObserver {}
