//! Engine configuration.
//!
//! A single strongly-typed record replaces the parameter-server lookups of
//! the original system. The builder fills sensible defaults for everything
//! except the team shape; `build` validates every cross-field constraint so
//! the engine can assume a coherent configuration.

use std::f64::consts::PI;

use crate::errors::ConfigError;
use crate::particles::{STATES_PER_ROBOT, STATES_PER_TARGET};

/// Uniform init range for robot/target x, meters.
pub const FIELD_X_RANGE: (f64, f64) = (0.0, 6.0);
/// Uniform init range for robot/target y, meters.
pub const FIELD_Y_RANGE: (f64, f64) = (-4.5, 4.5);
/// Uniform init range for robot heading, radians.
pub const HEADING_RANGE: (f64, f64) = (-PI, PI);
/// Uniform init range for the target height, meters.
pub const TARGET_Z_RANGE: (f64, f64) = (0.0, 1.0);

/// Default odometry noise coefficients per robot:
/// (rotation-from-rotation, rotation-from-translation,
/// translation-from-translation, translation-from-rotation).
pub const DEFAULT_ALPHA: [f64; 4] = [0.015, 0.1, 0.5, 0.001];

/// Landmark observation covariance calibration.
#[derive(Debug, Clone, Copy)]
pub struct LandmarkCovariance {
    /// Range-variance gain against blob-area mismatch
    pub k1: f64,
    /// Bearing-variance gain
    pub k2: f64,
}

impl Default for LandmarkCovariance {
    fn default() -> Self {
        Self { k1: 0.2, k2: 0.5 }
    }
}

/// Target observation covariance calibration.
#[derive(Debug, Clone, Copy)]
pub struct TargetCovariance {
    /// Linear range-variance gain
    pub k3: f64,
    /// Quadratic range-variance gain
    pub k4: f64,
    /// Bearing-variance gain
    pub k5: f64,
}

impl Default for TargetCovariance {
    fn default() -> Self {
        Self {
            k3: 0.1,
            k4: 0.05,
            k5: 0.5,
        }
    }
}

/// Complete, validated engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Particle count `P`
    pub n_particles: usize,
    /// Robot slots `R`, absent robots included
    pub n_robots: usize,
    /// Target count `T`
    pub n_targets: usize,
    /// Landmark count `L`, must match the loaded map
    pub n_landmarks: usize,
    /// Per-robot participation; absent robots keep frozen columns
    pub playing: Vec<bool>,
    /// 1-based id of the robot whose target stream drives the iteration
    /// clock
    pub main_id: usize,
    /// Per-robot initial position anchors, published with the beliefs
    pub pos_init: Vec<[f64; 2]>,
    /// Optional uniform-bound override for initialization: one `[lo, hi]`
    /// pair per state column
    pub custom_init: Option<Vec<f64>>,
    /// Landmark covariance calibration (K1, K2)
    pub landmark_cov: LandmarkCovariance,
    /// Target covariance calibration (K3, K4, K5)
    pub target_cov: TargetCovariance,
    /// Odometry noise model, 4 coefficients per robot
    pub alpha: Vec<f64>,
    /// Fixed height of published robot poses, meters
    pub robot_height: f64,
    /// Per-robot per-landmark maximum observation range, meters
    pub landmark_range_limits: Vec<Vec<f64>>,
    /// Whether the occlusion/range heuristics filter found-sets before
    /// fusion
    pub apply_visibility_heuristics: bool,
    /// Seed for the engine's deterministic RNG
    pub rng_seed: u64,
}

impl EngineConfig {
    /// Start building a configuration.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// State dimensions (robot poses plus target states, no weight).
    #[inline]
    pub fn state_dims(&self) -> usize {
        self.n_robots * STATES_PER_ROBOT + self.n_targets * STATES_PER_TARGET
    }

    /// 0-based index of the main robot.
    #[inline]
    pub fn main_index(&self) -> usize {
        self.main_id - 1
    }

    /// Number of robots actually playing.
    #[inline]
    pub fn num_playing(&self) -> usize {
        self.playing.iter().filter(|&&p| p).count()
    }

    /// Noise coefficients for one robot.
    #[inline]
    pub fn alpha_for(&self, robot: usize) -> [f64; 4] {
        let base = robot * 4;
        [
            self.alpha[base],
            self.alpha[base + 1],
            self.alpha[base + 2],
            self.alpha[base + 3],
        ]
    }

    /// Uniform bounds used to initialize the particle set, one interval per
    /// state column.
    pub(crate) fn init_bounds(&self) -> Vec<(f64, f64)> {
        if let Some(custom) = &self.custom_init {
            return custom.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        }
        let mut bounds = Vec::with_capacity(self.state_dims());
        for _ in 0..self.n_robots {
            bounds.push(FIELD_X_RANGE);
            bounds.push(FIELD_Y_RANGE);
            bounds.push(HEADING_RANGE);
        }
        for _ in 0..self.n_targets {
            bounds.push(FIELD_X_RANGE);
            bounds.push(FIELD_Y_RANGE);
            bounds.push(TARGET_Z_RANGE);
        }
        bounds
    }
}

/// Per-robot range limit for the paired corner landmarks (4, 5, 8, 9) in
/// the 10-landmark arena, by 1-based robot id. Ids without a calibrated
/// entry fall back to 6.5 m.
fn paired_landmark_limit(robot_id: usize) -> f64 {
    match robot_id {
        4 => 3.0,
        5 => 3.5,
        _ => 6.5,
    }
}

/// Default range-limit table. The 10-landmark arena uses the calibrated
/// per-robot values; any other landmark count disables range gating.
pub fn default_range_limits(n_robots: usize, n_landmarks: usize) -> Vec<Vec<f64>> {
    (0..n_robots)
        .map(|r| {
            if n_landmarks == 10 {
                let paired = paired_landmark_limit(r + 1);
                vec![2.5, 2.5, 2.5, 2.5, paired, paired, 3.5, 3.5, paired, paired]
            } else {
                vec![f64::INFINITY; n_landmarks]
            }
        })
        .collect()
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    n_particles: Option<usize>,
    n_robots: Option<usize>,
    n_targets: usize,
    n_landmarks: Option<usize>,
    playing: Option<Vec<bool>>,
    main_id: usize,
    pos_init: Option<Vec<[f64; 2]>>,
    custom_init: Option<Vec<f64>>,
    landmark_cov: Option<LandmarkCovariance>,
    target_cov: Option<TargetCovariance>,
    alpha: Option<Vec<f64>>,
    robot_height: Option<f64>,
    landmark_range_limits: Option<Vec<Vec<f64>>>,
    apply_visibility_heuristics: Option<bool>,
    rng_seed: Option<u64>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            n_targets: 1,
            main_id: 1,
            ..Self::default()
        }
    }

    /// Particle count `P`.
    pub fn particles(mut self, n: usize) -> Self {
        self.n_particles = Some(n);
        self
    }

    /// Robot slot count `R` (absent robots included).
    pub fn robots(mut self, n: usize) -> Self {
        self.n_robots = Some(n);
        self
    }

    /// Target count `T`.
    pub fn targets(mut self, n: usize) -> Self {
        self.n_targets = n;
        self
    }

    /// Landmark count `L`.
    pub fn landmarks(mut self, n: usize) -> Self {
        self.n_landmarks = Some(n);
        self
    }

    /// Per-robot participation flags.
    pub fn playing(mut self, playing: Vec<bool>) -> Self {
        self.playing = Some(playing);
        self
    }

    /// 1-based id of the main robot.
    pub fn main_id(mut self, id: usize) -> Self {
        self.main_id = id;
        self
    }

    /// Per-robot initial position anchors.
    pub fn pos_init(mut self, anchors: Vec<[f64; 2]>) -> Self {
        self.pos_init = Some(anchors);
        self
    }

    /// Custom uniform init bounds, `[lo, hi]` per state column.
    pub fn custom_init(mut self, bounds: Vec<f64>) -> Self {
        self.custom_init = Some(bounds);
        self
    }

    /// Landmark covariance calibration.
    pub fn landmark_cov(mut self, cov: LandmarkCovariance) -> Self {
        self.landmark_cov = Some(cov);
        self
    }

    /// Target covariance calibration.
    pub fn target_cov(mut self, cov: TargetCovariance) -> Self {
        self.target_cov = Some(cov);
        self
    }

    /// Odometry noise coefficients, 4 per robot.
    pub fn alpha(mut self, alpha: Vec<f64>) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Fixed published robot height.
    pub fn robot_height(mut self, height: f64) -> Self {
        self.robot_height = Some(height);
        self
    }

    /// Per-robot per-landmark maximum observation range.
    pub fn landmark_range_limits(mut self, limits: Vec<Vec<f64>>) -> Self {
        self.landmark_range_limits = Some(limits);
        self
    }

    /// Enable or disable the visibility heuristics.
    pub fn visibility_heuristics(mut self, enabled: bool) -> Self {
        self.apply_visibility_heuristics = Some(enabled);
        self
    }

    /// RNG seed.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let n_particles = self.n_particles.ok_or(ConfigError::InvalidParameter {
            name: "n_particles",
            reason: "is required".to_string(),
        })?;
        let n_robots = self.n_robots.ok_or(ConfigError::InvalidParameter {
            name: "n_robots",
            reason: "is required".to_string(),
        })?;
        let n_landmarks = self.n_landmarks.ok_or(ConfigError::InvalidParameter {
            name: "n_landmarks",
            reason: "is required".to_string(),
        })?;

        let config = EngineConfig {
            n_particles,
            n_robots,
            n_targets: self.n_targets,
            n_landmarks,
            playing: self.playing.unwrap_or_else(|| vec![true; n_robots]),
            main_id: self.main_id,
            pos_init: self.pos_init.unwrap_or_else(|| vec![[0.0, 0.0]; n_robots]),
            custom_init: self.custom_init,
            landmark_cov: self.landmark_cov.unwrap_or_default(),
            target_cov: self.target_cov.unwrap_or_default(),
            alpha: self
                .alpha
                .unwrap_or_else(|| DEFAULT_ALPHA.repeat(n_robots)),
            robot_height: self.robot_height.unwrap_or(0.81),
            landmark_range_limits: self
                .landmark_range_limits
                .unwrap_or_else(|| default_range_limits(n_robots, n_landmarks)),
            apply_visibility_heuristics: self.apply_visibility_heuristics.unwrap_or(true),
            rng_seed: self.rng_seed.unwrap_or(0x6f6d6e69),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.n_particles == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "n_particles",
            reason: "must be positive".to_string(),
        });
    }
    if config.n_robots == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "n_robots",
            reason: "must be positive".to_string(),
        });
    }
    if config.n_targets != 1 {
        return Err(ConfigError::InvalidParameter {
            name: "n_targets",
            reason: "this filter tracks exactly one target".to_string(),
        });
    }
    if config.playing.len() != config.n_robots {
        return Err(ConfigError::LengthMismatch {
            name: "playing",
            expected: config.n_robots,
            actual: config.playing.len(),
        });
    }
    if config.num_playing() == 0 {
        return Err(ConfigError::InvalidParameter {
            name: "playing",
            reason: "at least one robot must be playing".to_string(),
        });
    }
    if config.main_id == 0 || config.main_id > config.n_robots {
        return Err(ConfigError::InvalidParameter {
            name: "main_id",
            reason: format!("must be in 1..={}", config.n_robots),
        });
    }
    if config.pos_init.len() != config.n_robots {
        return Err(ConfigError::LengthMismatch {
            name: "pos_init",
            expected: config.n_robots,
            actual: config.pos_init.len(),
        });
    }
    if config.alpha.len() != 4 * config.n_robots {
        return Err(ConfigError::LengthMismatch {
            name: "alpha",
            expected: 4 * config.n_robots,
            actual: config.alpha.len(),
        });
    }
    if config.alpha.iter().any(|&a| !a.is_finite() || a < 0.0) {
        return Err(ConfigError::InvalidParameter {
            name: "alpha",
            reason: "coefficients must be finite and non-negative".to_string(),
        });
    }
    if let Some(custom) = &config.custom_init {
        let expected = 2 * config.state_dims();
        if custom.len() != expected {
            return Err(ConfigError::LengthMismatch {
                name: "custom_init",
                expected,
                actual: custom.len(),
            });
        }
        for pair in custom.chunks_exact(2) {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[0] > pair[1] {
                return Err(ConfigError::InvalidParameter {
                    name: "custom_init",
                    reason: format!("bad interval [{}, {}]", pair[0], pair[1]),
                });
            }
        }
    }
    if config.landmark_range_limits.len() != config.n_robots {
        return Err(ConfigError::LengthMismatch {
            name: "landmark_range_limits",
            expected: config.n_robots,
            actual: config.landmark_range_limits.len(),
        });
    }
    for row in &config.landmark_range_limits {
        if row.len() != config.n_landmarks {
            return Err(ConfigError::LengthMismatch {
                name: "landmark_range_limits",
                expected: config.n_landmarks,
                actual: row.len(),
            });
        }
    }
    let ks = [
        ("landmark_cov.k1", config.landmark_cov.k1),
        ("landmark_cov.k2", config.landmark_cov.k2),
        ("target_cov.k3", config.target_cov.k3),
        ("target_cov.k4", config.target_cov.k4),
        ("target_cov.k5", config.target_cov.k5),
    ];
    for (name, k) in ks {
        if !k.is_finite() || k < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "covariance calibration",
                reason: format!("{} must be finite and non-negative, got {}", name, k),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> EngineConfigBuilder {
        EngineConfig::builder().particles(100).robots(5).landmarks(10)
    }

    #[test]
    fn test_builder_defaults() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.n_targets, 1);
        assert_eq!(config.main_id, 1);
        assert_eq!(config.playing, vec![true; 5]);
        assert_eq!(config.alpha.len(), 20);
        assert_eq!(config.state_dims(), 18);
        assert!(config.apply_visibility_heuristics);
    }

    #[test]
    fn test_missing_particles_is_fatal() {
        let err = EngineConfig::builder().robots(5).landmarks(10).build();
        assert!(err.is_err());
    }

    #[test]
    fn test_alpha_length_checked() {
        let err = base_builder().alpha(vec![0.1; 4]).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LengthMismatch { name: "alpha", .. }
        ));
    }

    #[test]
    fn test_alpha_must_be_finite_and_non_negative() {
        let mut alpha = DEFAULT_ALPHA.repeat(5);
        alpha[3] = f64::NAN;
        match base_builder().alpha(alpha).build().unwrap_err() {
            ConfigError::InvalidParameter { name, reason } => {
                assert_eq!(name, "alpha");
                assert!(reason.contains("finite and non-negative"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut alpha = DEFAULT_ALPHA.repeat(5);
        alpha[0] = -0.1;
        assert!(matches!(
            base_builder().alpha(alpha).build(),
            Err(ConfigError::InvalidParameter { name: "alpha", .. })
        ));

        let mut alpha = DEFAULT_ALPHA.repeat(5);
        alpha[19] = f64::INFINITY;
        assert!(base_builder().alpha(alpha).build().is_err());
    }

    #[test]
    fn test_custom_init_length_checked() {
        let err = base_builder().custom_init(vec![0.0; 7]).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::LengthMismatch {
                name: "custom_init",
                ..
            }
        ));
    }

    #[test]
    fn test_custom_init_interval_order_checked() {
        let mut bounds = vec![0.0; 36];
        bounds[0] = 2.0;
        bounds[1] = 1.0; // lo > hi
        let err = base_builder().custom_init(bounds).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }

    #[test]
    fn test_main_id_bounds() {
        assert!(base_builder().main_id(0).build().is_err());
        assert!(base_builder().main_id(6).build().is_err());
        assert!(base_builder().main_id(5).build().is_ok());
    }

    #[test]
    fn test_main_robot_may_be_absent() {
        // a non-playing main never advances the clock but is a legal config
        let config = base_builder()
            .playing(vec![true, false, true, true, true])
            .main_id(2)
            .build()
            .unwrap();
        assert!(!config.playing[config.main_index()]);
    }

    #[test]
    fn test_default_range_limits_table() {
        let limits = default_range_limits(5, 10);
        // 1-based id 4 (index 3) uses the short 3.0 m pairing
        assert_eq!(limits[3][8], 3.0);
        // 1-based id 5 (index 4) uses 3.5 m
        assert_eq!(limits[4][4], 3.5);
        // ids 1..3 use 6.5 m
        assert_eq!(limits[0][9], 6.5);
        // near landmarks are always 2.5 m
        assert_eq!(limits[2][0], 2.5);
        // goal posts are 3.5 m
        assert_eq!(limits[1][6], 3.5);
    }

    #[test]
    fn test_init_bounds_default_layout() {
        let config = base_builder().build().unwrap();
        let bounds = config.init_bounds();
        assert_eq!(bounds.len(), 18);
        assert_eq!(bounds[0], FIELD_X_RANGE);
        assert_eq!(bounds[2], HEADING_RANGE);
        assert_eq!(bounds[17], TARGET_Z_RANGE);
    }
}
