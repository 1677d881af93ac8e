//! Horizontal grid detection.
//!
//! Latitude and longitude variables are recognised the way CF-aware tools do:
//! by `standard_name`, then by `units`, then by conventional names. A grid is
//! rectilinear when both coordinates are one-dimensional over distinct
//! dimensions and curvilinear when both are two-dimensional over the same
//! pair of dimensions.

use ndarray::{Array2, Ix2};
use serde::Serialize;

use crate::dataset::{AttributeValue, SourceDataset, Variable};
use crate::error::{RegridError, Result};

const LAT_UNITS: [&str; 6] = [
    "degrees_north",
    "degree_north",
    "degree_n",
    "degrees_n",
    "degreen",
    "degreesn",
];
const LON_UNITS: [&str; 6] = [
    "degrees_east",
    "degree_east",
    "degree_e",
    "degrees_e",
    "degreee",
    "degreese",
];
const LAT_NAMES: [&str; 4] = ["lat", "latitude", "nav_lat", "xlat"];
const LON_NAMES: [&str; 4] = ["lon", "longitude", "nav_lon", "xlong"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn label(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    /// Match strength of a variable for this axis, 0 meaning no match
    fn score(self, var: &Variable) -> u8 {
        let (units, names) = match self {
            Axis::Latitude => (&LAT_UNITS, &LAT_NAMES),
            Axis::Longitude => (&LON_UNITS, &LON_NAMES),
        };

        let text = |name: &str| {
            var.attribute(name)
                .and_then(AttributeValue::as_text)
                .map(|s| s.trim().to_lowercase())
        };

        if text("standard_name").as_deref() == Some(self.label()) {
            return 3;
        }
        if let Some(u) = text("units") {
            if units.contains(&u.as_str()) {
                return 2;
            }
        }
        if names.contains(&var.name.to_lowercase().as_str()) {
            return 1;
        }
        0
    }
}

/// A grid whose coordinates are 1-D axes over separate dimensions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectilinearGrid {
    pub lat_name: String,
    pub lon_name: String,
    pub lat_dim: String,
    pub lon_dim: String,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

/// A grid whose coordinates are 2-D fields over `(y, x)` dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct CurvilinearGrid {
    pub lat_name: String,
    pub lon_name: String,
    pub y_dim: String,
    pub x_dim: String,
    pub lat: Array2<f64>,
    pub lon: Array2<f64>,
}

/// The horizontal sampling grid of a dataset
#[derive(Debug, Clone, PartialEq)]
pub enum HorizontalGrid {
    Rectilinear(RectilinearGrid),
    Curvilinear(CurvilinearGrid),
}

impl HorizontalGrid {
    /// Detect the horizontal grid of a dataset
    pub fn detect(dataset: &SourceDataset) -> Result<Self> {
        let variables = &dataset.metadata().variables;
        let lat = find_coordinate(variables, Axis::Latitude)?;
        let lon = find_coordinate(variables, Axis::Longitude)?;

        match (lat.dimensions.as_slice(), lon.dimensions.as_slice()) {
            ([lat_dim], [lon_dim]) if lat_dim != lon_dim => {
                Ok(HorizontalGrid::Rectilinear(RectilinearGrid {
                    lat_name: lat.name.clone(),
                    lon_name: lon.name.clone(),
                    lat_dim: lat_dim.clone(),
                    lon_dim: lon_dim.clone(),
                    lat: dataset.read(&lat.name)?.into_raw_vec(),
                    lon: dataset.read(&lon.name)?.into_raw_vec(),
                }))
            }
            ([y_lat, x_lat], [y_lon, x_lon]) if y_lat == y_lon && x_lat == x_lon => {
                Ok(HorizontalGrid::Curvilinear(CurvilinearGrid {
                    lat_name: lat.name.clone(),
                    lon_name: lon.name.clone(),
                    y_dim: y_lat.clone(),
                    x_dim: x_lat.clone(),
                    lat: dataset.read(&lat.name)?.into_dimensionality::<Ix2>()?,
                    lon: dataset.read(&lon.name)?.into_dimensionality::<Ix2>()?,
                }))
            }
            (lat_dims, lon_dims) => Err(RegridError::grid(format!(
                "Unsupported coordinate layout: {}{:?} and {}{:?}",
                lat.name, lat_dims, lon.name, lon_dims
            ))),
        }
    }

    pub fn is_rectilinear(&self) -> bool {
        matches!(self, HorizontalGrid::Rectilinear(_))
    }

    /// Names of the latitude and longitude variables
    pub fn coordinate_names(&self) -> (&str, &str) {
        match self {
            HorizontalGrid::Rectilinear(g) => (&g.lat_name, &g.lon_name),
            HorizontalGrid::Curvilinear(g) => (&g.lat_name, &g.lon_name),
        }
    }

    /// Horizontal dimensions in row-major order
    pub fn dims(&self) -> (&str, &str) {
        match self {
            HorizontalGrid::Rectilinear(g) => (&g.lat_dim, &g.lon_dim),
            HorizontalGrid::Curvilinear(g) => (&g.y_dim, &g.x_dim),
        }
    }

    /// Grid shape as (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            HorizontalGrid::Rectilinear(g) => (g.lat.len(), g.lon.len()),
            HorizontalGrid::Curvilinear(g) => g.lat.dim(),
        }
    }

    pub fn len(&self) -> usize {
        let (rows, cols) = self.shape();
        rows * cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every grid point as `(lat, lon)`, row-major
    pub fn points(&self) -> Vec<(f64, f64)> {
        match self {
            HorizontalGrid::Rectilinear(g) => g
                .lat
                .iter()
                .flat_map(|&lat| g.lon.iter().map(move |&lon| (lat, lon)))
                .collect(),
            HorizontalGrid::Curvilinear(g) => g
                .lat
                .iter()
                .zip(g.lon.iter())
                .map(|(&lat, &lon)| (lat, lon))
                .collect(),
        }
    }
}

/// Pick the best candidate coordinate variable for an axis.
///
/// Bounds variables (named by another variable's `bounds` attribute) are
/// never candidates. Ties prefer 1-D coordinate variables.
fn find_coordinate(variables: &[Variable], axis: Axis) -> Result<&Variable> {
    let bounds: Vec<&str> = variables
        .iter()
        .filter_map(|v| v.attribute("bounds").and_then(AttributeValue::as_text))
        .collect();

    variables
        .iter()
        .filter(|v| matches!(v.dimensions.len(), 1 | 2))
        .filter(|v| !bounds.contains(&v.name.as_str()))
        .map(|v| (axis.score(v), v.is_coordinate(), v))
        .filter(|(score, _, _)| *score > 0)
        .max_by_key(|(score, is_coord, _)| (*score, *is_coord))
        .map(|(_, _, v)| v)
        .ok_or_else(|| {
            RegridError::grid(format!("No {} coordinate variable found", axis.label()))
        })
}
