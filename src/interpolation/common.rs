//! Common utilities for interpolation algorithms.
//!
//! This module provides shared functionality used by various interpolation methods.

use crate::error::{RegridError, Result};

/// Relative tolerance for points lying on the edge of an axis
const EDGE_TOLERANCE: f64 = 1e-9;

/// A strictly monotonic coordinate axis, ascending or descending
#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicAxis {
    values: Vec<f64>,
    tolerance: f64,
}

impl MonotonicAxis {
    pub fn new(name: &str, values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(RegridError::grid(format!(
                "Axis {} needs at least 2 points, found {}",
                name,
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RegridError::grid(format!(
                "Axis {} contains non-finite values",
                name
            )));
        }

        let ascending = values.windows(2).all(|w| w[1] > w[0]);
        let descending = values.windows(2).all(|w| w[1] < w[0]);
        if !ascending && !descending {
            return Err(RegridError::grid(format!(
                "Axis {} is not strictly monotonic",
                name
            )));
        }

        let span = (values[values.len() - 1] - values[0]).abs();
        Ok(Self {
            values: values.to_vec(),
            tolerance: span * EDGE_TOLERANCE,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_descending(&self) -> bool {
        self.values[1] < self.values[0]
    }

    pub fn min(&self) -> f64 {
        self.values[0].min(self.values[self.values.len() - 1])
    }

    pub fn max(&self) -> f64 {
        self.values[0].max(self.values[self.values.len() - 1])
    }

    /// Map a coordinate value to a fractional index, `None` outside the axis
    pub fn coord_to_index(&self, coord: f64) -> Option<f64> {
        if !coord.is_finite() {
            return None;
        }

        let (lo, hi) = (self.min(), self.max());
        if coord < lo - self.tolerance || coord > hi + self.tolerance {
            return None;
        }
        let coord = coord.clamp(lo, hi);

        let n = self.values.len();
        let above = if self.is_descending() {
            self.values.partition_point(|&v| v >= coord)
        } else {
            self.values.partition_point(|&v| v <= coord)
        };
        let i = above.saturating_sub(1).min(n - 2);

        let fraction = (coord - self.values[i]) / (self.values[i + 1] - self.values[i]);
        Some(i as f64 + fraction.clamp(0.0, 1.0))
    }
}

/// Latitude and longitude axes of a rectilinear source grid
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAxes {
    pub lat: MonotonicAxis,
    pub lon: MonotonicAxis,
}

impl SourceAxes {
    pub fn new(lat: &[f64], lon: &[f64]) -> Result<Self> {
        Ok(Self {
            lat: MonotonicAxis::new("latitude", lat)?,
            lon: MonotonicAxis::new("longitude", lon)?,
        })
    }

    /// Number of source cells
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major flat index of a source cell
    pub fn flat_index(&self, lat_idx: usize, lon_idx: usize) -> usize {
        lat_idx * self.lon.len() + lon_idx
    }

    /// Fractional `(lat, lon)` indices of a point, `None` outside the domain
    pub fn locate(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        let lon = wrap_longitude(lon, self.lon.min(), self.lon.max());
        Some((self.lat.coord_to_index(lat)?, self.lon.coord_to_index(lon)?))
    }
}

/// Shift a longitude by whole turns so it falls within `[lo, hi]` when
/// possible. Values that fit no shift are returned unchanged.
pub fn wrap_longitude(lon: f64, lo: f64, hi: f64) -> f64 {
    if !lon.is_finite() || (lo..=hi).contains(&lon) {
        return lon;
    }
    let shifted = lon - 360.0 * ((lon - lo) / 360.0).floor();
    if shifted <= hi {
        shifted
    } else {
        lon
    }
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}
