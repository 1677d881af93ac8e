//! Regridded output and its NetCDF writer.
//!
//! Variables of an [`OutputDataset`] are either materialized arrays or
//! deferred regrid computations over a lazily opened source. Deferred
//! variables are evaluated block by block while [`OutputDataset::write`]
//! runs, so the write always completes with fully computed values.

use ndarray::ArrayD;
use netcdf::{AttributeValue as NcAttributeValue, Extent};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunks::block_plan;
use crate::dataset::{AttributeValue, DataType, Dimension, SourceDataset, Variable};
use crate::error::{RegridError, Result};
use crate::interpolation::WeightMatrix;

/// A regrid of one source variable, evaluated on demand
#[derive(Debug)]
pub struct DeferredRegrid<'a> {
    pub(crate) source: &'a SourceDataset,
    pub(crate) operator: &'a WeightMatrix,
    pub(crate) variable: String,
    pub(crate) lat_axis: usize,
    pub(crate) lon_axis: usize,
}

impl DeferredRegrid<'_> {
    /// Evaluate the whole variable
    pub fn compute(&self) -> Result<ArrayD<f64>> {
        let var = self.source.metadata().variable_checked(&self.variable)?;
        let full: Vec<Range<usize>> = var.shape.iter().map(|&n| 0..n).collect();
        self.compute_block(&full)
    }

    fn compute_block(&self, source_ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let block = self.source.read_decoded_block(&self.variable, source_ranges)?;
        self.operator
            .apply_to_array(block, self.lat_axis, self.lon_axis)
    }

    /// Visit each output block with its position in the output variable
    fn for_each_block<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[Range<usize>], &ArrayD<f64>) -> Result<()>,
    {
        let var = self.source.metadata().variable_checked(&self.variable)?;
        let outer_axes: Vec<usize> = (0..var.shape.len())
            .filter(|&ax| ax != self.lat_axis && ax != self.lon_axis)
            .collect();

        let per_axis: Vec<Vec<Range<usize>>> = outer_axes
            .iter()
            .map(|&ax| match self.source.chunks() {
                Some(spec) => spec.ranges_for(&var.dimensions[ax], var.shape[ax]),
                None => vec![0..var.shape[ax]],
            })
            .collect();

        let (rows, cols) = self.operator.target_shape();
        for outer in block_plan(&per_axis) {
            let mut source_ranges: Vec<Range<usize>> = var.shape.iter().map(|&n| 0..n).collect();
            for (&ax, range) in outer_axes.iter().zip(&outer) {
                source_ranges[ax] = range.clone();
            }

            let mut output_ranges = outer;
            output_ranges.extend([0..rows, 0..cols]);

            debug!(variable = %self.variable, block = ?output_ranges, "Computing block");
            let block = self.compute_block(&source_ranges)?;
            f(&output_ranges, &block)?;
        }

        Ok(())
    }
}

/// Values of an output variable
#[derive(Debug)]
pub enum VariableData<'a> {
    Loaded(ArrayD<f64>),
    Deferred(DeferredRegrid<'a>),
}

/// A variable of the output dataset
#[derive(Debug)]
pub struct OutputVariable<'a> {
    /// Output metadata: dimensions, shape, attributes and storage type
    pub meta: Variable,
    pub data: VariableData<'a>,
}

impl OutputVariable<'_> {
    fn for_each_block<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[Range<usize>], &ArrayD<f64>) -> Result<()>,
    {
        match &self.data {
            VariableData::Loaded(array) => {
                let full: Vec<Range<usize>> = array.shape().iter().map(|&n| 0..n).collect();
                f(&full, array)
            }
            VariableData::Deferred(deferred) => deferred.for_each_block(f),
        }
    }
}

/// The regridded dataset, ready to be persisted
#[derive(Debug)]
pub struct OutputDataset<'a> {
    pub global_attributes: Vec<(String, AttributeValue)>,
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<OutputVariable<'a>>,
}

impl<'a> OutputDataset<'a> {
    pub fn variable(&self, name: &str) -> Option<&OutputVariable<'a>> {
        self.variables.iter().find(|v| v.meta.name == name)
    }

    /// Write the dataset to `path`.
    ///
    /// The file is written under a temporary name next to `path` and renamed
    /// into place once complete; on failure the temporary file is removed and
    /// any existing file at `path` is left untouched.
    pub fn write(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(RegridError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Output directory not found: {}", parent.display()),
            )));
        }

        let tmp = temporary_path(path);
        debug!("Writing to temporary file {}", tmp.display());

        let result = write_netcdf(self, &tmp)
            .and_then(|_| std::fs::rename(&tmp, path).map_err(RegridError::from));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result?;

        info!("Wrote {}", path.display());
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.nc".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

macro_rules! write_variable {
    ($file:expr, $var:expr, $ty:ty) => {{
        let dims: Vec<&str> = $var.meta.dimensions.iter().map(String::as_str).collect();
        let mut nc_var = $file.add_variable::<$ty>(&$var.meta.name, &dims)?;
        for (name, value) in &$var.meta.attributes {
            nc_var.put_attribute(name, NcAttributeValue::from(value.clone()))?;
        }

        $var.for_each_block(|ranges, block| {
            if block.is_empty() {
                return Ok(());
            }
            let values: Vec<$ty> = block.iter().map(|v| *v as $ty).collect();
            let extents: Vec<Extent> = ranges.iter().map(|r| r.clone().into()).collect();
            nc_var.put_values(&values, extents.as_slice())?;
            Ok(())
        })?;
    }};
}

fn write_netcdf(dataset: &OutputDataset<'_>, path: &Path) -> Result<()> {
    let mut file = netcdf::create(path)?;

    for dim in &dataset.dimensions {
        if dim.is_unlimited {
            file.add_unlimited_dimension(&dim.name)?;
        } else {
            file.add_dimension(&dim.name, dim.size)?;
        }
    }

    for (name, value) in &dataset.global_attributes {
        file.add_attribute(name, NcAttributeValue::from(value.clone()))?;
    }

    for var in &dataset.variables {
        debug!(variable = %var.meta.name, dtype = ?var.meta.dtype, "Writing variable");
        match var.meta.dtype {
            DataType::I8 => write_variable!(file, var, i8),
            DataType::U8 => write_variable!(file, var, u8),
            DataType::I16 => write_variable!(file, var, i16),
            DataType::U16 => write_variable!(file, var, u16),
            DataType::I32 => write_variable!(file, var, i32),
            DataType::U32 => write_variable!(file, var, u32),
            DataType::I64 => write_variable!(file, var, i64),
            DataType::U64 => write_variable!(file, var, u64),
            DataType::F32 => write_variable!(file, var, f32),
            DataType::F64 => write_variable!(file, var, f64),
        }
    }

    Ok(())
}
