//! Stamp-difference accumulators for the three iteration clocks.

/// Longest believable interval between two target sightings, in seconds.
/// Anything larger is treated as a lost timestamp.
pub const TARGET_ITERATION_TIME_MAX: f64 = 1.0;

/// Fallback interval used when the target clock is out of range (~30 Hz).
pub const TARGET_ITERATION_TIME_DEFAULT: f64 = 0.0333;

/// Tracks the interval between successive timestamps of one stream.
#[derive(Debug, Clone, Default)]
pub struct TimeAccumulator {
    last: Option<f64>,
    diff: f64,
}

impl TimeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stamp and return the interval since the previous one.
    /// The first stamp yields 0.
    pub fn update(&mut self, stamp: f64) -> f64 {
        self.diff = match self.last {
            Some(prev) => stamp - prev,
            None => 0.0,
        };
        self.last = Some(stamp);
        self.diff
    }

    /// Record a stamp, replacing out-of-range intervals with
    /// [`TARGET_ITERATION_TIME_DEFAULT`].
    pub fn update_clamped(&mut self, stamp: f64) -> f64 {
        self.update(stamp);
        if self.diff.abs() > TARGET_ITERATION_TIME_MAX {
            log::debug!(
                "interval {:.3}s out of range, using default {:.4}s",
                self.diff,
                TARGET_ITERATION_TIME_DEFAULT
            );
            self.diff = TARGET_ITERATION_TIME_DEFAULT;
        }
        self.diff
    }

    /// The most recent interval, in seconds.
    #[inline]
    pub fn diff(&self) -> f64 {
        self.diff
    }
}
