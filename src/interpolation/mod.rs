//! Interpolation from a rectilinear source grid onto arbitrary target points.
//!
//! An [`Interpolator`] turns one target point into a stencil of weighted
//! source cells. [`build_operator`] collects the stencils of every target
//! point into a sparse [`WeightMatrix`], which is then applied to each
//! horizontal slice of each regridded variable. Any weight scheme can be
//! plugged in through the trait without touching the regrid routine.

pub mod bilinear;
pub mod common;
pub mod nearest;
pub mod operator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RegridError, Result};
use crate::grid::HorizontalGrid;

pub use common::SourceAxes;
pub use operator::WeightMatrix;

/// One source cell contributing to a target point
pub type StencilEntry = (usize, f64);

/// Trait for interpolation methods
pub trait Interpolator {
    /// Weights of the source cells for the target point `(lat, lon)`, or
    /// `None` when the point lies outside the source domain.
    fn stencil(&self, source: &SourceAxes, lat: f64, lon: f64) -> Option<Vec<StencilEntry>>;

    /// Get the name of this interpolation method
    fn name(&self) -> &str;
}

/// Supported interpolation methods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Bilinear,
    Nearest,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Bilinear => "bilinear",
            Method::Nearest => "nearest",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RegridError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "bilinear" => Ok(Method::Bilinear),
            "nearest" | "nearest_s2d" => Ok(Method::Nearest),
            _ => Err(RegridError::InvalidParameter {
                param: "method".to_string(),
                message: format!("Unknown interpolation method: {}", name),
            }),
        }
    }
}

/// Get the interpolator implementing a method
pub fn get_interpolator(method: Method) -> Box<dyn Interpolator> {
    match method {
        Method::Bilinear => Box::new(bilinear::BilinearInterpolator),
        Method::Nearest => Box::new(nearest::NearestInterpolator),
    }
}

/// Build the regridding operator from source to target coordinates.
///
/// The source longitude axis is never treated as periodic: target points
/// beyond either longitude edge of the source are left unmapped.
pub fn build_operator(
    source: &HorizontalGrid,
    target: &HorizontalGrid,
    method: Method,
) -> Result<WeightMatrix> {
    WeightMatrix::build(source, target, get_interpolator(method).as_ref())
}
