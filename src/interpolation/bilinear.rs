//! Bilinear interpolation.
//!
//! This method performs linear interpolation in two dimensions using
//! the four nearest grid points.

use super::common::{linear_weight, SourceAxes};
use super::{Interpolator, StencilEntry};

/// Bilinear interpolator
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn stencil(&self, source: &SourceAxes, lat: f64, lon: f64) -> Option<Vec<StencilEntry>> {
        let (fi, fj) = source.locate(lat, lon)?;

        let i0 = (fi.floor() as usize).min(source.lat.len() - 2);
        let j0 = (fj.floor() as usize).min(source.lon.len() - 2);
        let (wi0, wi1) = linear_weight(fi - i0 as f64);
        let (wj0, wj1) = linear_weight(fj - j0 as f64);

        // Zero-weight corners are left out so a missing value there
        // cannot leak into the result.
        let corners = [
            (source.flat_index(i0, j0), wi0 * wj0),
            (source.flat_index(i0, j0 + 1), wi0 * wj1),
            (source.flat_index(i0 + 1, j0), wi1 * wj0),
            (source.flat_index(i0 + 1, j0 + 1), wi1 * wj1),
        ];

        Some(corners.into_iter().filter(|(_, w)| *w > 0.0).collect())
    }

    fn name(&self) -> &str {
        "bilinear"
    }
}
