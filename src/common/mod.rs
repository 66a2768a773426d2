//! Low-level utilities: deterministic RNG, numeric helpers, iteration clocks.

pub mod rng;
pub mod stats;
pub mod timing;

pub use rng::{sample_normal, sample_uniform, XorShift64};
pub use stats::{descending_order, linear_regression_slope, std_dev, weighted_mean, wrap_angle};
pub use timing::{TimeAccumulator, TARGET_ITERATION_TIME_DEFAULT, TARGET_ITERATION_TIME_MAX};
