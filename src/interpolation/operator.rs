//! Sparse regridding operator.
//!
//! Rows correspond to target cells and columns to source cells, both in
//! row-major order of their horizontal grids. Target cells outside the source
//! domain have empty rows and receive NaN.

use ndarray::{Array2, ArrayD, ArrayView2, Axis, IxDyn};
use tracing::{debug, warn};

use super::common::SourceAxes;
use super::Interpolator;
use crate::error::{RegridError, Result};
use crate::grid::HorizontalGrid;

/// Weights mapping a source grid onto a target grid
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    method: String,
    source_shape: (usize, usize),
    target_shape: (usize, usize),
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    weights: Vec<f64>,
}

impl WeightMatrix {
    /// Compute the weights of every target point
    pub fn build(
        source: &HorizontalGrid,
        target: &HorizontalGrid,
        interpolator: &dyn Interpolator,
    ) -> Result<Self> {
        let HorizontalGrid::Rectilinear(src) = source else {
            return Err(RegridError::grid(
                "Source grid must be rectilinear (1-D latitude and longitude)",
            ));
        };
        if target.is_empty() {
            return Err(RegridError::grid("Target grid has no points"));
        }

        let axes = SourceAxes::new(&src.lat, &src.lon)?;
        let points = target.points();

        let mut row_offsets = Vec::with_capacity(points.len() + 1);
        let mut columns = Vec::new();
        let mut weights = Vec::new();
        row_offsets.push(0);

        for (lat, lon) in points {
            if let Some(stencil) = interpolator.stencil(&axes, lat, lon) {
                for (column, weight) in stencil {
                    columns.push(column);
                    weights.push(weight);
                }
            }
            row_offsets.push(columns.len());
        }

        let matrix = Self {
            method: interpolator.name().to_string(),
            source_shape: source.shape(),
            target_shape: target.shape(),
            row_offsets,
            columns,
            weights,
        };

        debug!(
            method = %matrix.method,
            nnz = matrix.weights.len(),
            mapped = matrix.mapped_count(),
            "Built weight matrix"
        );
        if matrix.mapped_count() == 0 {
            warn!("No target point lies within the source domain; output will be all missing");
        }

        Ok(matrix)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn source_shape(&self) -> (usize, usize) {
        self.source_shape
    }

    pub fn target_shape(&self) -> (usize, usize) {
        self.target_shape
    }

    pub fn n_source(&self) -> usize {
        self.source_shape.0 * self.source_shape.1
    }

    pub fn n_target(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of target cells with at least one contributing source cell
    pub fn mapped_count(&self) -> usize {
        self.row_offsets.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Stencil of one target cell
    pub fn row(&self, target: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_offsets[target]..self.row_offsets[target + 1];
        self.columns[span.clone()]
            .iter()
            .copied()
            .zip(self.weights[span].iter().copied())
    }

    /// Apply to stacked horizontal fields, one flattened field per row
    pub fn apply(&self, fields: ArrayView2<f64>) -> Result<Array2<f64>> {
        if fields.ncols() != self.n_source() {
            return Err(RegridError::grid(format!(
                "Field has {} cells but the operator was built for {}",
                fields.ncols(),
                self.n_source()
            )));
        }

        let mut output = Array2::from_elem((fields.nrows(), self.n_target()), f64::NAN);
        for (field, mut out) in fields.outer_iter().zip(output.outer_iter_mut()) {
            for (target, value) in out.iter_mut().enumerate() {
                if self.row_offsets[target] == self.row_offsets[target + 1] {
                    continue;
                }
                *value = self.row(target).map(|(col, w)| field[col] * w).sum();
            }
        }

        Ok(output)
    }

    /// Regrid an n-dimensional array whose horizontal axes are `lat_axis`
    /// and `lon_axis`. The result keeps the other axes in order and appends
    /// the two target axes.
    pub fn apply_to_array(
        &self,
        array: ArrayD<f64>,
        lat_axis: usize,
        lon_axis: usize,
    ) -> Result<ArrayD<f64>> {
        let ndim = array.ndim();
        if lat_axis >= ndim || lon_axis >= ndim || lat_axis == lon_axis {
            return Err(RegridError::InvalidParameter {
                param: "axes".to_string(),
                message: format!(
                    "Invalid horizontal axes ({}, {}) for a {}-d array",
                    lat_axis, lon_axis, ndim
                ),
            });
        }

        let mut order: Vec<usize> = (0..ndim)
            .filter(|&ax| ax != lat_axis && ax != lon_axis)
            .collect();
        let outer_shape: Vec<usize> = order.iter().map(|&ax| array.len_of(Axis(ax))).collect();
        order.extend([lat_axis, lon_axis]);

        let outer: usize = outer_shape.iter().product();
        let fields = array
            .permuted_axes(IxDyn(&order))
            .as_standard_layout()
            .into_owned()
            .into_shape((outer, self.n_source()))?;

        let regridded = self.apply(fields.view())?;

        let mut out_shape = outer_shape;
        out_shape.extend([self.target_shape.0, self.target_shape.1]);
        Ok(regridded.into_shape(IxDyn(&out_shape))?)
    }
}
