//! Sensor readings, buffered observations and the visual covariance model.
//!
//! Raw readings arrive in the observer's body frame. Before buffering, each
//! reading is enriched with its polar form `(d, φ)` and the four covariance
//! scalars of the vision model, so the fusion stages never recompute them.
//! The range/bearing variances follow the omni dataset calibration:
//!
//! - landmark: `covDD = K1·|1 − area_actual/area_expected|·d²`,
//!   `covPP = L·K2/(d+1)`
//! - target:   `covDD = (1/mismatch)·(K3·d + K4·d²)`, `covPP = K5/(d+1)`
//!
//! both converted to Cartesian variances through
//! `covXX = cos²φ·covDD + sin²φ·(d²·covPP + covDD·covPP)` (and the mirrored
//! expression for `covYY`).

use smallvec::SmallVec;

use crate::config::{LandmarkCovariance, TargetCovariance};

/// Raw landmark sighting in the observer frame, one per mapped landmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkReading {
    /// Whether this landmark was detected in the current frame
    pub found: bool,
    /// Body-frame x, meters
    pub x: f64,
    /// Body-frame y, meters
    pub y: f64,
    /// Detected blob area, pixels
    pub area_actual: f64,
    /// Expected blob area at this range, pixels
    pub area_expected: f64,
}

/// Raw target sighting in the observer frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetReading {
    /// Whether the target was detected in the current frame
    pub found: bool,
    /// Body-frame x, meters
    pub x: f64,
    /// Body-frame y, meters
    pub y: f64,
    /// Height above ground, meters
    pub z: f64,
    /// Detector template mismatch, larger is better
    pub mismatch_factor: f64,
}

/// Buffered landmark observation with derived polar form and covariances.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkObservation {
    pub found: bool,
    pub x: f64,
    pub y: f64,
    /// Range `√(x²+y²)`
    pub d: f64,
    /// Bearing `atan2(y, x)`
    pub phi: f64,
    pub cov_dd: f64,
    pub cov_pp: f64,
    pub cov_xx: f64,
    pub cov_yy: f64,
}

impl LandmarkObservation {
    /// Enrich a raw reading with the landmark covariance model.
    ///
    /// `num_landmarks` scales the bearing variance (the `L·K2` term).
    pub fn from_reading(
        reading: &LandmarkReading,
        num_landmarks: usize,
        cov: &LandmarkCovariance,
    ) -> Self {
        if !reading.found {
            return Self::default();
        }
        let d = (reading.x * reading.x + reading.y * reading.y).sqrt();
        let phi = reading.y.atan2(reading.x);

        let area_ratio = if reading.area_expected != 0.0 {
            reading.area_actual / reading.area_expected
        } else {
            // degenerate expected area; poison the covariance so the fusion
            // stage skips this contribution
            f64::NAN
        };
        let cov_dd = cov.k1 * (1.0 - area_ratio).abs() * d * d;
        let cov_pp = num_landmarks as f64 * cov.k2 / (d + 1.0);
        let (cov_xx, cov_yy) = cartesian_covariance(d, phi, cov_dd, cov_pp);

        Self {
            found: true,
            x: reading.x,
            y: reading.y,
            d,
            phi,
            cov_dd,
            cov_pp,
            cov_xx,
            cov_yy,
        }
    }

    /// True when this observation can contribute a finite likelihood.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.found
            && self.d > 1e-6
            && self.cov_xx.is_finite()
            && self.cov_yy.is_finite()
            && self.cov_xx > 0.0
            && self.cov_yy > 0.0
    }
}

/// Buffered target observation with derived polar form and covariances.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetObservation {
    pub found: bool,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub d: f64,
    pub phi: f64,
    pub cov_dd: f64,
    pub cov_pp: f64,
    pub cov_xx: f64,
    pub cov_yy: f64,
}

impl TargetObservation {
    /// Enrich a raw reading with the target covariance model.
    pub fn from_reading(reading: &TargetReading, cov: &TargetCovariance) -> Self {
        if !reading.found {
            return Self::default();
        }
        let d = (reading.x * reading.x + reading.y * reading.y).sqrt();
        let phi = reading.y.atan2(reading.x);

        let cov_dd = if reading.mismatch_factor != 0.0 {
            (1.0 / reading.mismatch_factor) * (cov.k3 * d + cov.k4 * d * d)
        } else {
            f64::NAN
        };
        let cov_pp = cov.k5 / (d + 1.0);
        let (cov_xx, cov_yy) = cartesian_covariance(d, phi, cov_dd, cov_pp);

        Self {
            found: true,
            x: reading.x,
            y: reading.y,
            z: reading.z,
            d,
            phi,
            cov_dd,
            cov_pp,
            cov_xx,
            cov_yy,
        }
    }

    /// True when this observation can contribute a finite likelihood.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.found
            && self.d > 1e-6
            && self.cov_xx.is_finite()
            && self.cov_yy.is_finite()
            && self.cov_xx > 0.0
            && self.cov_yy > 0.0
    }
}

/// Convert polar variances `(covDD, covPP)` at `(d, φ)` to Cartesian
/// `(covXX, covYY)`.
#[inline]
pub fn cartesian_covariance(d: f64, phi: f64, cov_dd: f64, cov_pp: f64) -> (f64, f64) {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let cross = d * d * cov_pp + cov_dd * cov_pp;
    let cov_xx = cos_phi * cos_phi * cov_dd + sin_phi * sin_phi * cross;
    let cov_yy = sin_phi * sin_phi * cov_dd + cos_phi * cos_phi * cross;
    (cov_xx, cov_yy)
}

/// Occlusion and range gating applied to a robot's found-set before fusion.
///
/// The four goal-corner landmarks 6..9 occlude each other in the omni
/// arena: seeing 8 without 9 means 7 was a misdetection, seeing 9 without 8
/// means the same for 6, and when both posts are visible the closer one
/// decides which far corner to drop. After the occlusion rules, every
/// landmark observed beyond its per-robot range limit is discarded.
///
/// `found` is modified in place; `dist` holds the body-frame range of every
/// reading (valid wherever `found` was set); `range_limits` is this robot's
/// per-landmark row.
pub fn apply_visibility_heuristics(found: &mut [bool], dist: &[f64], range_limits: &[f64]) {
    debug_assert_eq!(found.len(), dist.len());

    if found.len() > 9 {
        let saw_8 = found[8];
        let saw_9 = found[9];
        if saw_8 && !saw_9 {
            found[7] = false;
        }
        if saw_9 && !saw_8 {
            found[6] = false;
        }
        if saw_8 && saw_9 {
            if dist[9] < dist[8] {
                found[6] = false;
            }
            if dist[8] < dist[9] {
                found[7] = false;
            }
        }
    }

    for (l, seen) in found.iter_mut().enumerate() {
        if *seen {
            let limit = range_limits.get(l).copied().unwrap_or(f64::INFINITY);
            if dist[l] > limit {
                *seen = false;
            }
        }
    }
}

/// Indices of usable observations, bounded by the landmark count.
pub(crate) fn usable_indices(observations: &[LandmarkObservation]) -> SmallVec<[usize; 16]> {
    observations
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_usable())
        .map(|(i, _)| i)
        .collect()
}
