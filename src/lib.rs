/*!
# Omniloc - Cooperative localization and target tracking

Joint-state particle filter for a team of mobile robots observing fixed
landmarks and one shared moving target. Each robot contributes odometry,
landmark sightings and target sightings; the filter fuses all streams into
a single belief over every robot pose `(x, y, θ)` and the target state
`(x, y, z)` plus a regression-based velocity estimate.

## Features

- Column-major particle store sized `P × (3R + 3T + 1)` with per-robot
  weight components
- α-parameterized odometry prediction, landmark/target Gaussian fusion,
  elitist modified-multinomial resampling
- Main-robot iteration gating: one fuse/resample/estimate cycle per target
  sighting of the designated robot
- Mutex-serialized sensor callbacks, observer notification outside the lock

## Modules

- [`engine`] - The filter itself: prediction, fusion, resampling, estimation
- [`config`] - Strongly-typed configuration with builder and validation
- [`map`] - Landmark map and its text-file loader
- [`observation`] - Sensor readings, covariance model, visibility heuristics
- [`particles`] - The subparticle-set store
- [`output`] - Belief summaries, snapshots, the [`Observer`] seam
- [`common`] - Deterministic RNG, numeric helpers, iteration clocks

## Example

```rust,no_run
use omniloc::{Engine, EngineConfig, LandmarkMap, Odometry, TargetReading};

let map = LandmarkMap::load("landmarks.txt").unwrap();
let config = EngineConfig::builder()
    .particles(500)
    .robots(5)
    .landmarks(10)
    .playing(vec![true, false, true, true, true])
    .main_id(1)
    .build()
    .unwrap();

let engine = Engine::new(config, map).unwrap();

// sensor adapters feed the callbacks; the main robot's target stream
// drives the iteration clock
engine.on_odometry(0, 0.0, Odometry { x: 0.1, y: 0.0, theta: 0.0 });
engine.on_target(0, 0.033, TargetReading::default());

let belief = engine.robot_belief(0).unwrap();
println!("robot 0 at ({:.2}, {:.2})", belief.pose[0], belief.pose[1]);
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// The particle-filter engine and its stages
pub mod engine;

/// Engine configuration
pub mod config;

/// Fixed landmark map
pub mod map;

/// Sensor readings and the observation covariance model
pub mod observation;

/// Column-major particle storage
pub mod particles;

/// Belief summaries and the observer seam
pub mod output;

/// Low-level utilities (RNG, statistics, clocks)
pub mod common;

/// Configuration errors
pub mod errors;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use config::{
    EngineConfig, EngineConfigBuilder, LandmarkCovariance, TargetCovariance, DEFAULT_ALPHA,
};
pub use engine::{Engine, Odometry, MIN_WEIGHT_SUM, RESAMPLE_START_AT};
pub use errors::ConfigError;
pub use map::{Landmark, LandmarkMap};
pub use observation::{LandmarkObservation, LandmarkReading, TargetObservation, TargetReading};
pub use output::{
    EngineStats, IterationSnapshot, IterationTiming, NoOpObserver, Observer, ParticlesSnapshot,
    RobotBelief, TargetBelief,
};
pub use particles::{ParticleStore, STATES_PER_ROBOT, STATES_PER_TARGET};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
