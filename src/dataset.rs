//! NetCDF dataset model and source loading.
//!
//! A [`SourceDataset`] is opened either eagerly (every supported variable is
//! read into memory up front) or lazily when a [`ChunkSpec`] is supplied, in
//! which case values are read from the file on demand in hyperslab blocks.
//! Values are held as `f64` regardless of storage type; the original type is
//! kept in [`Variable::dtype`] so pass-through variables can be written back
//! unchanged.

use ndarray::{ArrayD, IxDyn, Slice};
use netcdf::types::{BasicType, VariableType};
use netcdf::{AttributeValue as NcAttributeValue, Extent};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::chunks::ChunkSpec;
use crate::error::{RegridError, Result};
use crate::logging::log_data_load_stats;

/// Attributes that describe packing or masking of stored values. They are
/// consumed when a variable is decoded and are not carried to regridded
/// output.
pub const ENCODING_ATTRIBUTES: [&str; 4] =
    ["_FillValue", "missing_value", "scale_factor", "add_offset"];

/// Metadata about a NetCDF dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,
    /// Size of the dimension
    pub size: usize,
    /// Whether this dimension is unlimited
    pub is_unlimited: bool,
}

/// Numeric storage type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl DataType {
    /// Map a NetCDF variable type; characters, strings and user-defined
    /// types are unsupported
    pub fn from_nc(vartype: &VariableType) -> Option<Self> {
        match vartype {
            VariableType::Basic(BasicType::Byte) => Some(DataType::I8),
            VariableType::Basic(BasicType::Ubyte) => Some(DataType::U8),
            VariableType::Basic(BasicType::Short) => Some(DataType::I16),
            VariableType::Basic(BasicType::Ushort) => Some(DataType::U16),
            VariableType::Basic(BasicType::Int) => Some(DataType::I32),
            VariableType::Basic(BasicType::Uint) => Some(DataType::U32),
            VariableType::Basic(BasicType::Int64) => Some(DataType::I64),
            VariableType::Basic(BasicType::Uint64) => Some(DataType::U64),
            VariableType::Basic(BasicType::Float) => Some(DataType::F32),
            VariableType::Basic(BasicType::Double) => Some(DataType::F64),
            _ => None,
        }
    }
}

/// Metadata about a NetCDF variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,
    /// Dimensions of the variable
    pub dimensions: Vec<String>,
    /// Shape of the variable (dimension sizes)
    pub shape: Vec<usize>,
    /// Variable attributes, in file order
    pub attributes: Vec<(String, AttributeValue)>,
    /// Storage type
    pub dtype: DataType,
}

impl Variable {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        find_attribute(&self.attributes, name)
    }

    pub fn has_dimension(&self, dim: &str) -> bool {
        self.dimensions.iter().any(|d| d == dim)
    }

    /// A coordinate variable is one-dimensional and named after its dimension
    pub fn is_coordinate(&self) -> bool {
        self.dimensions.len() == 1 && self.dimensions[0] == self.name
    }
}

/// NetCDF attribute values, keeping the stored type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Texts(Vec<String>),
    Byte(i8),
    Bytes(Vec<i8>),
    UByte(u8),
    UBytes(Vec<u8>),
    Short(i16),
    Shorts(Vec<i16>),
    UShort(u16),
    UShorts(Vec<u16>),
    Int(i32),
    Ints(Vec<i32>),
    UInt(u32),
    UInts(Vec<u32>),
    Long(i64),
    Longs(Vec<i64>),
    ULong(u64),
    ULongs(Vec<u64>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
}

impl AttributeValue {
    /// Numeric view of the attribute; single-element arrays count as scalars
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_f64_vec()?.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    /// All numeric values of the attribute
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        let values = match self {
            AttributeValue::Text(_) | AttributeValue::Texts(_) => return None,
            AttributeValue::Byte(v) => vec![*v as f64],
            AttributeValue::Bytes(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::UByte(v) => vec![*v as f64],
            AttributeValue::UBytes(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::Short(v) => vec![*v as f64],
            AttributeValue::Shorts(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::UShort(v) => vec![*v as f64],
            AttributeValue::UShorts(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::Int(v) => vec![*v as f64],
            AttributeValue::Ints(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::UInt(v) => vec![*v as f64],
            AttributeValue::UInts(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::Long(v) => vec![*v as f64],
            AttributeValue::Longs(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::ULong(v) => vec![*v as f64],
            AttributeValue::ULongs(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::Float(v) => vec![*v as f64],
            AttributeValue::Floats(v) => v.iter().map(|x| *x as f64).collect(),
            AttributeValue::Double(v) => vec![*v],
            AttributeValue::Doubles(v) => v.clone(),
        };
        Some(values)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<NcAttributeValue> for AttributeValue {
    fn from(value: NcAttributeValue) -> Self {
        match value {
            NcAttributeValue::Str(v) => AttributeValue::Text(v),
            NcAttributeValue::Strs(v) => AttributeValue::Texts(v),
            NcAttributeValue::Schar(v) => AttributeValue::Byte(v),
            NcAttributeValue::Schars(v) => AttributeValue::Bytes(v),
            NcAttributeValue::Uchar(v) => AttributeValue::UByte(v),
            NcAttributeValue::Uchars(v) => AttributeValue::UBytes(v),
            NcAttributeValue::Short(v) => AttributeValue::Short(v),
            NcAttributeValue::Shorts(v) => AttributeValue::Shorts(v),
            NcAttributeValue::Ushort(v) => AttributeValue::UShort(v),
            NcAttributeValue::Ushorts(v) => AttributeValue::UShorts(v),
            NcAttributeValue::Int(v) => AttributeValue::Int(v),
            NcAttributeValue::Ints(v) => AttributeValue::Ints(v),
            NcAttributeValue::Uint(v) => AttributeValue::UInt(v),
            NcAttributeValue::Uints(v) => AttributeValue::UInts(v),
            NcAttributeValue::Longlong(v) => AttributeValue::Long(v),
            NcAttributeValue::Longlongs(v) => AttributeValue::Longs(v),
            NcAttributeValue::Ulonglong(v) => AttributeValue::ULong(v),
            NcAttributeValue::Ulonglongs(v) => AttributeValue::ULongs(v),
            NcAttributeValue::Float(v) => AttributeValue::Float(v),
            NcAttributeValue::Floats(v) => AttributeValue::Floats(v),
            NcAttributeValue::Double(v) => AttributeValue::Double(v),
            NcAttributeValue::Doubles(v) => AttributeValue::Doubles(v),
        }
    }
}

impl From<AttributeValue> for NcAttributeValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Text(v) => NcAttributeValue::Str(v),
            AttributeValue::Texts(v) => NcAttributeValue::Strs(v),
            AttributeValue::Byte(v) => NcAttributeValue::Schar(v),
            AttributeValue::Bytes(v) => NcAttributeValue::Schars(v),
            AttributeValue::UByte(v) => NcAttributeValue::Uchar(v),
            AttributeValue::UBytes(v) => NcAttributeValue::Uchars(v),
            AttributeValue::Short(v) => NcAttributeValue::Short(v),
            AttributeValue::Shorts(v) => NcAttributeValue::Shorts(v),
            AttributeValue::UShort(v) => NcAttributeValue::Ushort(v),
            AttributeValue::UShorts(v) => NcAttributeValue::Ushorts(v),
            AttributeValue::Int(v) => NcAttributeValue::Int(v),
            AttributeValue::Ints(v) => NcAttributeValue::Ints(v),
            AttributeValue::UInt(v) => NcAttributeValue::Uint(v),
            AttributeValue::UInts(v) => NcAttributeValue::Uints(v),
            AttributeValue::Long(v) => NcAttributeValue::Longlong(v),
            AttributeValue::Longs(v) => NcAttributeValue::Longlongs(v),
            AttributeValue::ULong(v) => NcAttributeValue::Ulonglong(v),
            AttributeValue::ULongs(v) => NcAttributeValue::Ulonglongs(v),
            AttributeValue::Float(v) => NcAttributeValue::Float(v),
            AttributeValue::Floats(v) => NcAttributeValue::Floats(v),
            AttributeValue::Double(v) => NcAttributeValue::Double(v),
            AttributeValue::Doubles(v) => NcAttributeValue::Doubles(v),
        }
    }
}

/// Look up an attribute by name in an ordered attribute list
pub fn find_attribute<'a>(
    attributes: &'a [(String, AttributeValue)],
    name: &str,
) -> Option<&'a AttributeValue> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

/// Complete metadata for a NetCDF file
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// File-level attributes, in file order
    pub global_attributes: Vec<(String, AttributeValue)>,
    /// Dimensions in the file
    pub dimensions: Vec<Dimension>,
    /// Supported (numeric) variables in the file
    pub variables: Vec<Variable>,
}

impl Metadata {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Get variable metadata with error handling
    pub fn variable_checked(&self, name: &str) -> Result<&Variable> {
        self.variable(name).ok_or_else(|| RegridError::DataNotFound {
            message: format!("Variable not found: {}", name),
        })
    }
}

/// CF packing and masking parameters of a stored variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfDecoding {
    pub fill_values: Vec<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl CfDecoding {
    pub fn from_variable(var: &Variable) -> Self {
        let mut fill_values = Vec::new();
        for name in ["_FillValue", "missing_value"] {
            if let Some(values) = var.attribute(name).and_then(AttributeValue::as_f64_vec) {
                fill_values.extend(values);
            }
        }

        Self {
            fill_values,
            scale_factor: var.attribute("scale_factor").and_then(AttributeValue::as_f64),
            add_offset: var.attribute("add_offset").and_then(AttributeValue::as_f64),
        }
    }

    /// Whether stored values are scaled integers
    pub fn is_packed(&self) -> bool {
        self.scale_factor.is_some() || self.add_offset.is_some()
    }

    /// Mask fill values to NaN and unpack a single stored value
    pub fn decode(&self, raw: f64) -> f64 {
        if self.fill_values.iter().any(|fill| *fill == raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }

    pub fn decode_array(&self, array: &mut ArrayD<f64>) {
        if self.fill_values.is_empty() && !self.is_packed() {
            return;
        }
        array.mapv_inplace(|v| self.decode(v));
    }
}

/// A dataset opened for reading, either fully loaded or backed by the file
pub struct SourceDataset {
    path: PathBuf,
    file: netcdf::File,
    metadata: Metadata,
    chunks: Option<ChunkSpec>,
    data: HashMap<String, ArrayD<f64>>,
}

impl std::fmt::Debug for SourceDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDataset")
            .field("path", &self.path)
            .field("lazy", &self.is_lazy())
            .field("variables", &self.metadata.variables.len())
            .finish()
    }
}

impl SourceDataset {
    /// Open a NetCDF file.
    ///
    /// With a chunk spec the dataset is lazy: the spec is checked against the
    /// file's dimensions and no variable data is read yet. Without one every
    /// supported variable is loaded into memory.
    pub fn open(path: &Path, chunks: Option<&ChunkSpec>) -> Result<Self> {
        if !path.exists() {
            return Err(RegridError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        let file = netcdf::open(path)?;
        info!("Opened NetCDF file: {}", path.display());

        let metadata = extract_metadata(&file)?;
        debug!("File has {} variables", metadata.variables.len());
        debug!("File has {} dimensions", metadata.dimensions.len());

        if let Some(spec) = chunks {
            spec.validate_against(&metadata.dimensions)?;
        }

        let mut data = HashMap::new();
        if chunks.is_none() {
            for var in &metadata.variables {
                let full = full_ranges(&var.shape);
                data.insert(var.name.clone(), read_hyperslab(&file, var, &full)?);
            }
        }

        let dataset = Self {
            path: path.to_path_buf(),
            file,
            metadata,
            chunks: chunks.cloned(),
            data,
        };
        dataset.log_load_stats();

        Ok(dataset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn chunks(&self) -> Option<&ChunkSpec> {
        self.chunks.as_ref()
    }

    /// True when values are read from the file on demand
    pub fn is_lazy(&self) -> bool {
        self.chunks.is_some()
    }

    /// Read a whole variable
    pub fn read(&self, name: &str) -> Result<ArrayD<f64>> {
        let var = self.metadata.variable_checked(name)?;
        self.read_block(name, &full_ranges(&var.shape))
    }

    /// Read a block of a variable, one range per dimension
    pub fn read_block(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let var = self.metadata.variable_checked(name)?;

        if ranges.len() != var.shape.len() {
            return Err(RegridError::InvalidParameter {
                param: "ranges".to_string(),
                message: format!(
                    "Variable {} has {} dimensions but {} ranges were given",
                    name,
                    var.shape.len(),
                    ranges.len()
                ),
            });
        }
        for (range, (dim, size)) in ranges.iter().zip(var.dimensions.iter().zip(&var.shape)) {
            if range.start > range.end || range.end > *size {
                return Err(RegridError::InvalidParameter {
                    param: "ranges".to_string(),
                    message: format!(
                        "Range {:?} out of bounds for dimension {} of size {}",
                        range, dim, size
                    ),
                });
            }
        }

        match self.data.get(name) {
            Some(array) => Ok(array
                .slice_each_axis(|axis| Slice::from(ranges[axis.axis.index()].clone()))
                .to_owned()),
            None => read_hyperslab(&self.file, var, ranges),
        }
    }

    /// Read a variable and apply CF masking and unpacking
    pub fn read_decoded_block(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let var = self.metadata.variable_checked(name)?;
        let mut array = self.read_block(name, ranges)?;
        CfDecoding::from_variable(var).decode_array(&mut array);
        Ok(array)
    }

    fn log_load_stats(&self) {
        let var_names: Vec<&str> = self
            .metadata
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        let dim_details = self
            .metadata
            .dimensions
            .iter()
            .map(|d| format!("{}={}", d.name, d.size))
            .collect::<Vec<_>>()
            .join(", ");
        let memory_usage = self
            .data
            .values()
            .map(|a| a.len() * std::mem::size_of::<f64>())
            .sum();

        log_data_load_stats(
            &self.path.display().to_string(),
            var_names.len(),
            &var_names,
            self.metadata.dimensions.len(),
            &dim_details,
            memory_usage,
            self.is_lazy(),
        );
    }
}

fn full_ranges(shape: &[usize]) -> Vec<Range<usize>> {
    shape.iter().map(|&n| 0..n).collect()
}

/// Extract metadata from the NetCDF file
fn extract_metadata(file: &netcdf::File) -> Result<Metadata> {
    let mut global_attributes = Vec::new();
    for attr in file.attributes() {
        global_attributes.push((attr.name().to_string(), attr.value()?.into()));
    }

    let dimensions: Vec<Dimension> = file
        .dimensions()
        .map(|dim| Dimension {
            name: dim.name(),
            size: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        let Some(dtype) = DataType::from_nc(&var.vartype()) else {
            warn!("Skipping unsupported variable: {}", var.name());
            continue;
        };

        let mut attributes = Vec::new();
        for attr in var.attributes() {
            attributes.push((attr.name().to_string(), attr.value()?.into()));
        }

        variables.push(Variable {
            name: var.name(),
            dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            attributes,
            dtype,
        });
    }

    Ok(Metadata {
        global_attributes,
        dimensions,
        variables,
    })
}

macro_rules! get_as_f64 {
    ($var:expr, $extents:expr, $ty:ty) => {
        $var.get_values::<$ty, _>($extents)?
            .into_iter()
            .map(|v| v as f64)
            .collect::<Vec<f64>>()
    };
}

/// Read a hyperslab of a variable into an `f64` array
fn read_hyperslab(
    file: &netcdf::File,
    var: &Variable,
    ranges: &[Range<usize>],
) -> Result<ArrayD<f64>> {
    let shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
    if shape.iter().any(|&n| n == 0) {
        return Ok(ArrayD::zeros(IxDyn(&shape)));
    }

    let nc_var = file
        .variable(&var.name)
        .ok_or_else(|| RegridError::DataNotFound {
            message: format!("Variable not found in file: {}", var.name),
        })?;
    let extents: Vec<Extent> = ranges.iter().map(|r| r.clone().into()).collect();
    let extents = extents.as_slice();

    let values = match var.dtype {
        DataType::I8 => get_as_f64!(nc_var, extents, i8),
        DataType::U8 => get_as_f64!(nc_var, extents, u8),
        DataType::I16 => get_as_f64!(nc_var, extents, i16),
        DataType::U16 => get_as_f64!(nc_var, extents, u16),
        DataType::I32 => get_as_f64!(nc_var, extents, i32),
        DataType::U32 => get_as_f64!(nc_var, extents, u32),
        DataType::I64 => get_as_f64!(nc_var, extents, i64),
        DataType::U64 => get_as_f64!(nc_var, extents, u64),
        DataType::F32 => get_as_f64!(nc_var, extents, f32),
        DataType::F64 => nc_var.get_values::<f64, _>(extents)?,
    };

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}
