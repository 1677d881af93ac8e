//! Nearest neighbor interpolation.
//!
//! This method selects the value of the nearest grid point.
//! It's the simplest interpolation method, offering the fastest
//! performance but with less smooth results compared to higher-order methods.

use super::common::SourceAxes;
use super::{Interpolator, StencilEntry};

/// Nearest neighbor interpolator
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn stencil(&self, source: &SourceAxes, lat: f64, lon: f64) -> Option<Vec<StencilEntry>> {
        let (fi, fj) = source.locate(lat, lon)?;
        let i = (fi.round() as usize).min(source.lat.len() - 1);
        let j = (fj.round() as usize).min(source.lon.len() - 1);
        Some(vec![(source.flat_index(i, j), 1.0)])
    }

    fn name(&self) -> &str {
        "nearest"
    }
}
