//! Fixed landmark map.
//!
//! The map is loaded once at startup from a plain text table (one
//! `serial x y` record per line) and is immutable afterwards. A malformed
//! file is a fatal configuration error; the filter refuses to start without
//! a usable map.

use std::fs;
use std::path::Path;

use nalgebra::Point2;

use crate::errors::ConfigError;

/// One fixed landmark in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Dataset serial id
    pub serial: u32,
    /// World x coordinate, meters
    pub x: f64,
    /// World y coordinate, meters
    pub y: f64,
}

impl Landmark {
    /// World position as a point.
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Ordered, immutable collection of fixed landmarks.
#[derive(Debug, Clone, Default)]
pub struct LandmarkMap {
    landmarks: Vec<Landmark>,
}

impl LandmarkMap {
    /// Build a map from an ordered landmark list.
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Load a map from a `serial x y` text table.
    ///
    /// Blank lines are skipped; any other malformed line aborts the load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LandmarkFile {
            path: path.to_path_buf(),
            line: None,
            reason: e.to_string(),
        })?;

        let map = Self::parse(&content).map_err(|(line, reason)| ConfigError::LandmarkFile {
            path: path.to_path_buf(),
            line: Some(line),
            reason,
        })?;

        for lm in map.iter() {
            log::info!(
                "fixed landmark {} at {{x={:.2}, y={:.2}}}",
                lm.serial,
                lm.x,
                lm.y
            );
        }
        Ok(map)
    }

    /// Parse the text table; on failure returns the 1-based line number and
    /// a description.
    pub(crate) fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut landmarks = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let serial = fields
                .next()
                .ok_or_else(|| (idx + 1, "missing serial field".to_string()))?
                .parse::<u32>()
                .map_err(|e| (idx + 1, format!("bad serial: {}", e)))?;
            let x = fields
                .next()
                .ok_or_else(|| (idx + 1, "missing x field".to_string()))?
                .parse::<f64>()
                .map_err(|e| (idx + 1, format!("bad x: {}", e)))?;
            let y = fields
                .next()
                .ok_or_else(|| (idx + 1, "missing y field".to_string()))?
                .parse::<f64>()
                .map_err(|e| (idx + 1, format!("bad y: {}", e)))?;
            if fields.next().is_some() {
                return Err((idx + 1, "expected exactly 3 fields".to_string()));
            }
            landmarks.push(Landmark { serial, x, y });
        }
        Ok(Self { landmarks })
    }

    /// Number of landmarks.
    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// True when the map holds no landmarks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Landmark by map index (not serial).
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Iterate over landmarks in map order.
    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }
}

impl std::ops::Index<usize> for LandmarkMap {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.landmarks[index]
    }
}
