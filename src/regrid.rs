//! The regrid routine.
//!
//! Load source, load target grid, build the interpolation operator, apply it,
//! persist the result. Every step either completes or returns its error to
//! the caller; there are no retries and no partial results.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunks::ChunkSpec;
use crate::dataset::{
    AttributeValue, CfDecoding, DataType, Dimension, SourceDataset, Variable, ENCODING_ATTRIBUTES,
};
use crate::error::{RegridError, Result};
use crate::grid::HorizontalGrid;
use crate::interpolation::{build_operator, Method, WeightMatrix};
use crate::logging::{log_error, log_timed_operation};
use crate::output::{DeferredRegrid, OutputDataset, OutputVariable, VariableData};

/// Global attribute recording the interpolation method on the output
pub const REGRID_METHOD_ATTRIBUTE: &str = "regrid_method";

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RegridSummary {
    pub output: PathBuf,
    pub method: Method,
    /// Variables interpolated onto the target grid
    pub regridded: Vec<String>,
    /// Variables copied unchanged
    pub passed_through: Vec<String>,
    /// Variables left out of the output
    pub dropped: Vec<String>,
    pub target_shape: (usize, usize),
    /// Target cells inside the source domain
    pub mapped_cells: usize,
    pub lazy: bool,
}

/// Regrid `source_path` onto the grid of `target_path` with bilinear
/// interpolation and write the result to `output_path`.
///
/// With a chunk spec the source is read lazily and the regrid is evaluated
/// block by block during the write.
pub fn regrid(
    source_path: &Path,
    target_path: &Path,
    output_path: &Path,
    chunks: Option<&ChunkSpec>,
) -> Result<RegridSummary> {
    regrid_with(source_path, target_path, output_path, chunks, Method::Bilinear)
}

/// [`regrid`] with an explicit interpolation method
pub fn regrid_with(
    source_path: &Path,
    target_path: &Path,
    output_path: &Path,
    chunks: Option<&ChunkSpec>,
    method: Method,
) -> Result<RegridSummary> {
    run(source_path, target_path, output_path, chunks, method).map_err(|e| {
        log_error(&e, "regrid");
        e
    })
}

fn run(
    source_path: &Path,
    target_path: &Path,
    output_path: &Path,
    chunks: Option<&ChunkSpec>,
    method: Method,
) -> Result<RegridSummary> {
    let source_label = source_path.display().to_string();
    let target_label = target_path.display().to_string();
    let output_label = output_path.display().to_string();

    let source = log_timed_operation("load_source", Some(&source_label), || {
        SourceDataset::open(source_path, chunks)
    })?;
    let target = log_timed_operation("load_target", Some(&target_label), || {
        SourceDataset::open(target_path, None)
    })?;

    let regridder = log_timed_operation("build_operator", Some(method.as_str()), || {
        Regridder::new(&source, &target, method)
    })?;

    let output = log_timed_operation("apply", None, || regridder.apply(&source))?;

    log_timed_operation("save", Some(&output_label), || output.write(output_path))?;

    let summary = regridder.summarize(&source, &output, output_path);
    info!(
        output = %summary.output.display(),
        regridded = summary.regridded.len(),
        passed_through = summary.passed_through.len(),
        dropped = summary.dropped.len(),
        mapped_cells = summary.mapped_cells,
        "Regridding complete"
    );

    Ok(summary)
}

/// A target coordinate variable copied verbatim to the output
#[derive(Debug, Clone)]
struct TargetCoordinate {
    meta: Variable,
    values: ndarray::ArrayD<f64>,
}

/// An interpolation operator bound to a source and a target grid
#[derive(Debug, Clone)]
pub struct Regridder {
    method: Method,
    operator: WeightMatrix,
    source_grid: HorizontalGrid,
    target_dimensions: Vec<Dimension>,
    target_coordinates: Vec<TargetCoordinate>,
}

impl Regridder {
    /// Build the operator from the horizontal coordinates of both datasets.
    /// The longitude axis is treated as non-periodic.
    pub fn new(source: &SourceDataset, target: &SourceDataset, method: Method) -> Result<Self> {
        let source_grid = HorizontalGrid::detect(source)?;
        let target_grid = HorizontalGrid::detect(target)?;
        let operator = build_operator(&source_grid, &target_grid, method)?;

        let (y_dim, x_dim) = target_grid.dims();
        let target_dimensions = [y_dim, x_dim]
            .iter()
            .map(|name| {
                target
                    .metadata()
                    .dimension(name)
                    .map(|d| Dimension {
                        is_unlimited: false,
                        ..d.clone()
                    })
                    .ok_or_else(|| RegridError::grid(format!("Target dimension {} not found", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        // lat/lon plus any 1-D coordinate variables of the horizontal dims
        let (lat_name, lon_name) = target_grid.coordinate_names();
        let mut names: Vec<&str> = vec![lat_name, lon_name];
        for dim in [y_dim, x_dim] {
            if !names.contains(&dim) && target.metadata().variable(dim).is_some() {
                names.push(dim);
            }
        }

        let target_coordinates = names
            .into_iter()
            .map(|name| {
                Ok(TargetCoordinate {
                    meta: target.metadata().variable_checked(name)?.clone(),
                    values: target.read(name)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            method = %method,
            source_shape = ?operator.source_shape(),
            target_shape = ?operator.target_shape(),
            mapped = operator.mapped_count(),
            target_kind = if target_grid.is_rectilinear() { "rectilinear" } else { "curvilinear" },
            "Regridder ready"
        );

        Ok(Self {
            method,
            operator,
            source_grid,
            target_dimensions,
            target_coordinates,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn operator(&self) -> &WeightMatrix {
        &self.operator
    }

    /// Apply the operator to every variable of `source`.
    ///
    /// `source` must share the horizontal grid the regridder was built from.
    /// Eager sources are regridded immediately; lazy sources yield deferred
    /// variables evaluated when the output is written.
    pub fn apply<'a>(&'a self, source: &'a SourceDataset) -> Result<OutputDataset<'a>> {
        if HorizontalGrid::detect(source)? != self.source_grid {
            return Err(RegridError::grid(
                "Dataset grid differs from the grid the regridder was built for",
            ));
        }

        let metadata = source.metadata();
        let (lat_dim, lon_dim) = self.source_grid.dims();
        let (lat_name, lon_name) = self.source_grid.coordinate_names();
        let is_spatial = |dim: &str| dim == lat_dim || dim == lon_dim;

        for dim in &self.target_dimensions {
            if metadata.dimension(&dim.name).is_some() && !is_spatial(dim.name.as_str()) {
                return Err(RegridError::grid(format!(
                    "Target dimension {} clashes with a non-horizontal source dimension",
                    dim.name
                )));
            }
        }

        if let Some(spec) = source.chunks() {
            let ignored = horizontal_chunk_dims(spec, lat_dim, lon_dim);
            if !ignored.is_empty() {
                info!(
                    dims = ?ignored,
                    "Horizontal chunk sizes ignored; each block reads whole horizontal planes"
                );
            }
        }

        let mut dimensions: Vec<Dimension> = metadata
            .dimensions
            .iter()
            .filter(|d| !is_spatial(d.name.as_str()))
            .cloned()
            .collect();
        dimensions.extend(self.target_dimensions.iter().cloned());

        let mut variables: Vec<OutputVariable<'a>> = self
            .target_coordinates
            .iter()
            .map(|coord| OutputVariable {
                meta: coord.meta.clone(),
                data: VariableData::Loaded(coord.values.clone()),
            })
            .collect();

        let mut regridded = 0;
        for var in &metadata.variables {
            if var.name == lat_name || var.name == lon_name {
                continue;
            }
            if self.target_coordinates.iter().any(|c| c.meta.name == var.name) {
                return Err(RegridError::grid(format!(
                    "Source variable {} clashes with a target coordinate variable",
                    var.name
                )));
            }

            match (position(var, lat_dim), position(var, lon_dim)) {
                (Some(lat_axis), Some(lon_axis)) => {
                    variables.push(self.regrid_variable(source, var, lat_axis, lon_axis)?);
                    regridded += 1;
                }
                (None, None) => variables.push(OutputVariable {
                    meta: var.clone(),
                    data: VariableData::Loaded(source.read(&var.name)?),
                }),
                _ => warn!(
                    variable = %var.name,
                    "Dropping variable that spans only one horizontal dimension"
                ),
            }
        }

        if regridded == 0 {
            return Err(RegridError::DataNotFound {
                message: format!(
                    "No data variable spans both horizontal dimensions ({}, {})",
                    lat_dim, lon_dim
                ),
            });
        }

        let mut global_attributes: Vec<(String, AttributeValue)> = metadata
            .global_attributes
            .iter()
            .filter(|(name, _)| name != REGRID_METHOD_ATTRIBUTE)
            .cloned()
            .collect();
        global_attributes.push((
            REGRID_METHOD_ATTRIBUTE.to_string(),
            AttributeValue::Text(self.method.to_string()),
        ));

        Ok(OutputDataset {
            global_attributes,
            dimensions,
            variables,
        })
    }

    fn regrid_variable<'a>(
        &'a self,
        source: &'a SourceDataset,
        var: &Variable,
        lat_axis: usize,
        lon_axis: usize,
    ) -> Result<OutputVariable<'a>> {
        let decoding = CfDecoding::from_variable(var);
        let dtype = if var.dtype == DataType::F64 && !decoding.is_packed() {
            DataType::F64
        } else {
            DataType::F32
        };

        let (rows, cols) = self.operator.target_shape();
        let mut dimensions = Vec::with_capacity(var.dimensions.len());
        let mut shape = Vec::with_capacity(var.shape.len());
        for (ax, (dim, size)) in var.dimensions.iter().zip(&var.shape).enumerate() {
            if ax != lat_axis && ax != lon_axis {
                dimensions.push(dim.clone());
                shape.push(*size);
            }
        }
        dimensions.extend(self.target_dimensions.iter().map(|d| d.name.clone()));
        shape.extend([rows, cols]);

        let fill = match dtype {
            DataType::F64 => AttributeValue::Double(f64::NAN),
            _ => AttributeValue::Float(f32::NAN),
        };
        let mut attributes = vec![("_FillValue".to_string(), fill)];
        attributes.extend(
            var.attributes
                .iter()
                .filter(|(name, _)| !ENCODING_ATTRIBUTES.contains(&name.as_str()))
                .cloned(),
        );

        let deferred = DeferredRegrid {
            source,
            operator: &self.operator,
            variable: var.name.clone(),
            lat_axis,
            lon_axis,
        };
        let data = if source.is_lazy() {
            VariableData::Deferred(deferred)
        } else {
            VariableData::Loaded(deferred.compute()?)
        };

        Ok(OutputVariable {
            meta: Variable {
                name: var.name.clone(),
                dimensions,
                shape,
                attributes,
                dtype,
            },
            data,
        })
    }

    fn summarize(
        &self,
        source: &SourceDataset,
        output: &OutputDataset<'_>,
        output_path: &Path,
    ) -> RegridSummary {
        let mut regridded = Vec::new();
        let mut passed_through = Vec::new();
        let mut dropped = Vec::new();
        let (lat_dim, _) = self.source_grid.dims();
        let (lat_name, lon_name) = self.source_grid.coordinate_names();

        for var in &source.metadata().variables {
            if var.name == lat_name || var.name == lon_name {
                dropped.push(var.name.clone());
                continue;
            }
            match output.variable(&var.name) {
                Some(_) if var.has_dimension(lat_dim) => regridded.push(var.name.clone()),
                Some(_) => passed_through.push(var.name.clone()),
                None => dropped.push(var.name.clone()),
            }
        }

        RegridSummary {
            output: output_path.to_path_buf(),
            method: self.method,
            regridded,
            passed_through,
            dropped,
            target_shape: self.operator.target_shape(),
            mapped_cells: self.operator.mapped_count(),
            lazy: source.is_lazy(),
        }
    }
}

fn position(var: &Variable, dim: &str) -> Option<usize> {
    var.dimensions.iter().position(|d| d == dim)
}

/// Horizontal dimensions named in a chunk spec
fn horizontal_chunk_dims<'a>(spec: &ChunkSpec, lat_dim: &'a str, lon_dim: &'a str) -> Vec<&'a str> {
    [lat_dim, lon_dim]
        .into_iter()
        .filter(|dim| spec.get(dim).is_some())
        .collect()
}
