//! Shared fixtures for the integration suites.
//!
//! Builds the reference team layout (5 robots, robot 2 absent, 10
//! landmarks) and synthetic perfect observations from ground-truth poses.

#![allow(dead_code)]

use omniloc::{
    Engine, EngineConfig, EngineConfigBuilder, Landmark, LandmarkCovariance, LandmarkMap,
    LandmarkReading, Odometry, TargetCovariance,
};

/// Ten fixed landmarks on a 6 m × 9 m arena. Landmark 0 sits at (5, 0) so
/// the single-landmark scenarios can sight it straight down the field.
pub fn arena_map() -> LandmarkMap {
    let positions = [
        (5.0, 0.0),
        (0.0, 4.5),
        (0.0, -4.5),
        (6.0, 4.5),
        (6.0, -4.5),
        (3.0, 4.5),
        (0.0, 2.25),
        (0.0, -2.25),
        (6.0, 2.25),
        (6.0, -2.25),
    ];
    LandmarkMap::new(
        positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Landmark {
                serial: i as u32,
                x,
                y,
            })
            .collect(),
    )
}

/// Reference configuration: `R = 5`, `playing = [T,F,T,T,T]`, `main_id = 1`,
/// `L = 10`, `P = 500`, `K = (0.2, 0.5, 0.1, 0.05, 0.5)`.
pub fn reference_builder() -> EngineConfigBuilder {
    EngineConfig::builder()
        .particles(500)
        .robots(5)
        .landmarks(10)
        .playing(vec![true, false, true, true, true])
        .main_id(1)
        .landmark_cov(LandmarkCovariance { k1: 0.2, k2: 0.5 })
        .target_cov(TargetCovariance {
            k3: 0.1,
            k4: 0.05,
            k5: 0.5,
        })
        .rng_seed(42)
}

/// Zero-width custom-init bounds pinning every robot and the target to
/// exact states (5 robots + 1 target).
pub fn point_init(poses: &[[f64; 3]; 5], target: [f64; 3]) -> Vec<f64> {
    let mut bounds = Vec::with_capacity(36);
    for pose in poses {
        for &v in pose {
            bounds.push(v);
            bounds.push(v);
        }
    }
    for &v in &target {
        bounds.push(v);
        bounds.push(v);
    }
    bounds
}

/// Feed one zero odometry reading to every playing robot so the engine
/// leaves the WAITING state.
pub fn start_all(engine: &Engine, playing: &[bool], stamp: f64) {
    for (robot, &p) in playing.iter().enumerate() {
        if p {
            engine.on_odometry(robot, stamp, Odometry::default());
        }
    }
}

/// A perfect sighting of `landmark` (world frame) from the ground-truth
/// `pose`, with the given blob-area ratio.
pub fn perfect_landmark_reading(pose: [f64; 3], landmark: (f64, f64), area_ratio: f64) -> LandmarkReading {
    let dx = landmark.0 - pose[0];
    let dy = landmark.1 - pose[1];
    let (sin, cos) = pose[2].sin_cos();
    LandmarkReading {
        found: true,
        x: dx * cos + dy * sin,
        y: -dx * sin + dy * cos,
        area_actual: 100.0 * area_ratio,
        area_expected: 100.0,
    }
}

/// A 10-entry landmark set with only landmark `index` found.
pub fn single_landmark_set(index: usize, reading: LandmarkReading) -> Vec<LandmarkReading> {
    let mut set = vec![LandmarkReading::default(); 10];
    set[index] = reading;
    set
}
