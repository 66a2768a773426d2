//! The particle-filter engine.
//!
//! One engine owns the particle store, the weight components, the
//! observation buffers and the belief summary. Sensor adapters call the
//! `on_*` callbacks from their own threads; a single mutex serializes every
//! callback against the filter state, so the fuse/resample/estimate chain is
//! atomic with respect to concurrent odometry. Observers are notified after
//! the lock is released.
//!
//! Iteration discipline: the engine waits for a first odometry reading from
//! every playing robot before lazily initializing the particle set. After
//! that, odometry drives prediction, each completed landmark set refreshes
//! one robot's weight component, and only the *main* robot's target stream
//! advances the global cycle (target fusion, target motion, resampling,
//! estimation, publication).

pub mod estimate;
pub mod fusion;
pub mod prediction;
pub mod resample;

use parking_lot::Mutex;

use crate::common::{TimeAccumulator, XorShift64};
use crate::config::EngineConfig;
use crate::errors::ConfigError;
use crate::map::LandmarkMap;
use crate::observation::{
    apply_visibility_heuristics, LandmarkObservation, LandmarkReading, TargetObservation,
    TargetReading,
};
use crate::output::{
    EngineStats, IterationSnapshot, IterationTiming, Observer, ParticlesSnapshot, RobotBelief,
    TargetBelief,
};
use crate::particles::ParticleStore;

use estimate::{TargetVelocityEstimator, VELOCITY_ESTIMATOR_CAPACITY};
pub use prediction::Odometry;
pub use resample::{MIN_WEIGHT_SUM, RESAMPLE_START_AT};

/// Filter state behind the engine mutex.
pub(crate) struct EngineCore {
    pub(crate) config: EngineConfig,
    pub(crate) map: LandmarkMap,
    pub(crate) store: ParticleStore,
    /// Per-robot likelihood factors, one column of length `P` per robot
    pub(crate) weight_components: Vec<Vec<f64>>,
    pub(crate) landmark_buf: Vec<Vec<LandmarkObservation>>,
    pub(crate) target_buf: Vec<TargetObservation>,
    pub(crate) beliefs: Vec<RobotBelief>,
    pub(crate) target: TargetBelief,
    pub(crate) velocity_estimator: TargetVelocityEstimator,
    pub(crate) rng: XorShift64,
    pub(crate) odometry_time: Vec<TimeAccumulator>,
    pub(crate) target_time: TimeAccumulator,
    pub(crate) iteration_time: TimeAccumulator,
    pub(crate) started: Vec<bool>,
    pub(crate) initialized: bool,
    pub(crate) stats: EngineStats,
    pub(crate) collapse_flagged: bool,
}

impl EngineCore {
    fn new(config: EngineConfig, map: LandmarkMap) -> Result<Self, ConfigError> {
        if map.len() != config.n_landmarks {
            return Err(ConfigError::MapMismatch {
                expected: config.n_landmarks,
                actual: map.len(),
            });
        }

        let store = ParticleStore::new(config.n_particles, config.n_robots, config.n_targets);
        Ok(Self {
            weight_components: vec![vec![1.0; config.n_particles]; config.n_robots],
            landmark_buf: vec![
                vec![LandmarkObservation::default(); config.n_landmarks];
                config.n_robots
            ],
            target_buf: vec![TargetObservation::default(); config.n_robots],
            beliefs: vec![RobotBelief::default(); config.n_robots],
            target: TargetBelief::default(),
            velocity_estimator: TargetVelocityEstimator::new(VELOCITY_ESTIMATOR_CAPACITY),
            rng: XorShift64::new(config.rng_seed),
            odometry_time: vec![TimeAccumulator::new(); config.n_robots],
            target_time: TimeAccumulator::new(),
            iteration_time: TimeAccumulator::new(),
            started: vec![false; config.n_robots],
            initialized: false,
            stats: EngineStats::default(),
            collapse_flagged: false,
            store,
            map,
            config,
        })
    }

    /// True for indices the engine will process.
    fn check_robot(&self, robot: usize) -> bool {
        if robot >= self.config.n_robots {
            log::warn!("ignoring message for unknown robot index {}", robot);
            return false;
        }
        if !self.config.playing[robot] {
            log::warn!("ignoring message for absent robot {}", robot + 1);
            return false;
        }
        true
    }

    fn init_particles(&mut self) {
        let bounds = self.config.init_bounds();
        self.store.init_uniform(&bounds, &mut self.rng);
        for component in self.weight_components.iter_mut() {
            component.fill(1.0);
        }
        self.initialized = true;
        log::info!(
            "particle set initialized: {} particles, {} columns",
            self.store.num_particles(),
            self.store.num_columns()
        );
    }

    fn on_odometry(&mut self, robot: usize, stamp: f64, odom: &Odometry) {
        if !self.check_robot(robot) {
            return;
        }
        self.odometry_time[robot].update(stamp);
        if !self.started[robot] {
            self.started[robot] = true;
            log::debug!("robot {} delivered its first odometry", robot + 1);
        }

        if !self.initialized {
            let all_started = self
                .config
                .playing
                .iter()
                .zip(&self.started)
                .all(|(&playing, &started)| !playing || started);
            if all_started {
                self.init_particles();
            }
        }

        if self.initialized {
            let alpha = self.config.alpha_for(robot);
            prediction::predict_robot(&mut self.store, robot, odom, &alpha, &mut self.rng);
        }
    }

    fn on_landmarks(&mut self, robot: usize, _stamp: f64, readings: &[LandmarkReading]) {
        if !self.check_robot(robot) {
            return;
        }
        if readings.len() != self.config.n_landmarks {
            log::warn!(
                "robot {} delivered {} landmark readings, expected {}",
                robot + 1,
                readings.len(),
                self.config.n_landmarks
            );
            return;
        }

        let mut found: Vec<bool> = readings.iter().map(|r| r.found).collect();
        if self.config.apply_visibility_heuristics {
            let dist: Vec<f64> = readings
                .iter()
                .map(|r| (r.x * r.x + r.y * r.y).sqrt())
                .collect();
            apply_visibility_heuristics(
                &mut found,
                &dist,
                &self.config.landmark_range_limits[robot],
            );
        }

        for (l, reading) in readings.iter().enumerate() {
            self.landmark_buf[robot][l] = if found[l] {
                LandmarkObservation::from_reading(
                    reading,
                    self.config.n_landmarks,
                    &self.config.landmark_cov,
                )
            } else {
                LandmarkObservation::default()
            };
        }

        if self.initialized {
            let used = fusion::fuse_robots(
                &self.store,
                &mut self.weight_components[robot],
                robot,
                &self.landmark_buf[robot],
                &self.map,
            );
            if used > 0 {
                fusion::combine_weights(
                    &mut self.store,
                    &self.weight_components,
                    &self.config.playing,
                );
                self.recover_if_collapsed();
            }
        }
    }

    fn on_target(
        &mut self,
        robot: usize,
        stamp: f64,
        reading: &TargetReading,
    ) -> Option<IterationSnapshot> {
        if !self.check_robot(robot) {
            return None;
        }
        self.target_buf[robot] = TargetObservation::from_reading(reading, &self.config.target_cov);

        if robot != self.config.main_index() {
            return None;
        }
        self.target_time.update_clamped(stamp);
        if !self.initialized {
            return None;
        }

        fusion::fuse_target(&mut self.store, 0, &self.target_buf, &self.config.playing);
        self.recover_if_collapsed();

        let velocity = self.target.vel;
        let dt = self.target_time.diff();
        fusion::predict_target(&mut self.store, 0, &velocity, dt, &mut self.rng);

        let active = self.active_columns();
        resample::resample(&mut self.store, &active, &mut self.rng);
        self.stats.resamples += 1;

        self.estimate(stamp);
        Some(self.snapshot())
    }

    /// Columns the resampler may move: playing robots, targets, weights.
    /// Absent robots' columns stay frozen.
    fn active_columns(&self) -> Vec<usize> {
        let mut cols = Vec::new();
        for (robot, &playing) in self.config.playing.iter().enumerate() {
            if playing {
                let base = self.store.robot_offset(robot);
                cols.extend([base, base + 1, base + 2]);
            }
        }
        let target_base = self.store.target_offset();
        cols.extend(target_base..target_base + 3 * self.config.n_targets);
        cols.push(self.store.weight_offset());
        cols
    }

    fn recover_if_collapsed(&mut self) {
        let sum: f64 = self.store.weights().iter().sum();
        if sum < MIN_WEIGHT_SUM {
            let uniform = 1.0 / self.store.num_particles() as f64;
            self.store.reset_weights(uniform);
            if !self.collapse_flagged {
                log::warn!("weight collapse (sum = {:.3e}), resetting to uniform", sum);
                self.stats.weight_collapses += 1;
                self.collapse_flagged = true;
            }
        }
    }

    fn timing(&self) -> IterationTiming {
        IterationTiming {
            odometry_dt: self.odometry_time.iter().map(|t| t.diff()).collect(),
            target_dt: self.target_time.diff(),
            iteration_dt: self.iteration_time.diff(),
        }
    }

    fn snapshot(&self) -> IterationSnapshot {
        IterationSnapshot {
            robots: self.beliefs.clone(),
            target: self.target,
            timing: self.timing(),
            stats: self.stats,
            robot_height: self.config.robot_height,
        }
    }
}

/// Thread-safe facade over the filter.
///
/// Callbacks may be invoked from any number of sensor threads; each one
/// takes the engine mutex, so filter state is always observed between whole
/// steps. The engine owns its particle store exclusively; accessors hand out
/// copies, never references into the live matrix.
pub struct Engine {
    core: Mutex<EngineCore>,
    observers: Mutex<Vec<Box<dyn Observer>>>,
}

impl Engine {
    /// Build an engine from a validated configuration and a landmark map.
    pub fn new(config: EngineConfig, map: LandmarkMap) -> Result<Self, ConfigError> {
        Ok(Self {
            core: Mutex::new(EngineCore::new(config, map)?),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Attach an observer; it will receive every completed iteration.
    pub fn add_observer(&self, observer: Box<dyn Observer>) {
        self.observers.lock().push(observer);
    }

    /// Odometry callback for robot `robot` (0-based).
    pub fn on_odometry(&self, robot: usize, stamp: f64, odom: Odometry) {
        self.core.lock().on_odometry(robot, stamp, &odom);
    }

    /// Landmark-set callback: one reading per mapped landmark. Delivering
    /// the full set is the "all measurements done" signal.
    pub fn on_landmarks(&self, robot: usize, stamp: f64, readings: &[LandmarkReading]) {
        self.core.lock().on_landmarks(robot, stamp, readings);
    }

    /// Target callback. When `robot` is the main robot this runs the full
    /// fuse/resample/estimate cycle and notifies observers.
    pub fn on_target(&self, robot: usize, stamp: f64, reading: TargetReading) {
        let snapshot = self.core.lock().on_target(robot, stamp, &reading);
        if let Some(snapshot) = snapshot {
            for observer in self.observers.lock().iter_mut() {
                observer.on_iteration_complete(&snapshot);
            }
        }
    }

    /// Whether the lazy particle initialization has happened.
    pub fn is_initialized(&self) -> bool {
        self.core.lock().initialized
    }

    /// Current belief for one robot.
    pub fn robot_belief(&self, robot: usize) -> Option<RobotBelief> {
        self.core.lock().beliefs.get(robot).copied()
    }

    /// Current target belief.
    pub fn target_belief(&self) -> TargetBelief {
        self.core.lock().target
    }

    /// Iteration clocks.
    pub fn timing(&self) -> IterationTiming {
        self.core.lock().timing()
    }

    /// Engine counters.
    pub fn stats(&self) -> EngineStats {
        self.core.lock().stats
    }

    /// Read-only copy of the particle matrix with per-column spread.
    pub fn particles(&self) -> ParticlesSnapshot {
        let core = self.core.lock();
        let n_columns = core.store.num_columns();
        ParticlesSnapshot {
            columns: (0..n_columns)
                .map(|k| core.store.column(k).to_vec())
                .collect(),
            std_devs: (0..n_columns).map(|k| core.store.column_std_dev(k)).collect(),
        }
    }

    /// One robot's per-particle likelihood factors, for diagnostics.
    pub fn weight_component(&self, robot: usize) -> Option<Vec<f64>> {
        self.core.lock().weight_components.get(robot).cloned()
    }

    /// The buffered (heuristics-filtered) landmark observation for one
    /// robot and landmark, for diagnostics.
    pub fn landmark_observation(&self, robot: usize, landmark: usize) -> Option<LandmarkObservation> {
        self.core
            .lock()
            .landmark_buf
            .get(robot)
            .and_then(|row| row.get(landmark))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Landmark;

    fn test_map(n: usize) -> LandmarkMap {
        LandmarkMap::new(
            (0..n)
                .map(|i| Landmark {
                    serial: i as u32,
                    x: i as f64,
                    y: 0.0,
                })
                .collect(),
        )
    }

    fn test_engine() -> Engine {
        let config = EngineConfig::builder()
            .particles(50)
            .robots(2)
            .landmarks(3)
            .rng_seed(42)
            .build()
            .unwrap();
        Engine::new(config, test_map(3)).unwrap()
    }

    #[test]
    fn test_map_size_checked() {
        let config = EngineConfig::builder()
            .particles(10)
            .robots(1)
            .landmarks(10)
            .build()
            .unwrap();
        let err = Engine::new(config, test_map(3)).err().unwrap();
        assert!(matches!(err, ConfigError::MapMismatch { .. }));
    }

    #[test]
    fn test_waits_for_all_playing_robots() {
        let engine = test_engine();
        assert!(!engine.is_initialized());
        engine.on_odometry(0, 0.0, Odometry::default());
        assert!(!engine.is_initialized());
        engine.on_odometry(1, 0.0, Odometry::default());
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_absent_robot_does_not_gate_init() {
        let config = EngineConfig::builder()
            .particles(50)
            .robots(2)
            .landmarks(3)
            .playing(vec![true, false])
            .build()
            .unwrap();
        let engine = Engine::new(config, test_map(3)).unwrap();
        engine.on_odometry(0, 0.0, Odometry::default());
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_absent_robot_messages_ignored() {
        let config = EngineConfig::builder()
            .particles(50)
            .robots(2)
            .landmarks(3)
            .playing(vec![true, false])
            .build()
            .unwrap();
        let engine = Engine::new(config, test_map(3)).unwrap();
        engine.on_odometry(0, 0.0, Odometry::default());

        let before = engine.particles();
        engine.on_odometry(1, 0.1, Odometry { x: 1.0, y: 0.0, theta: 0.0 });
        let after = engine.particles();
        assert_eq!(before.columns[3], after.columns[3]);
        assert_eq!(before.columns[4], after.columns[4]);
    }

    #[test]
    fn test_non_main_target_never_cycles() {
        let engine = test_engine();
        engine.on_odometry(0, 0.0, Odometry::default());
        engine.on_odometry(1, 0.0, Odometry::default());

        engine.on_target(1, 0.1, TargetReading::default());
        assert_eq!(engine.stats().resamples, 0);
        assert_eq!(engine.stats().iterations, 0);
    }

    #[test]
    fn test_main_target_runs_cycle() {
        let engine = test_engine();
        engine.on_odometry(0, 0.0, Odometry::default());
        engine.on_odometry(1, 0.0, Odometry::default());

        engine.on_target(0, 0.1, TargetReading::default());
        let stats = engine.stats();
        assert_eq!(stats.resamples, 1);
        assert_eq!(stats.iterations, 1);
    }
}
