//! # regridder
//!
//! Bilinear regridding of NetCDF climate datasets onto another spatial grid.
//!
//! The crate loads a source dataset (e.g. ERA5 on a regular latitude/longitude
//! grid), reads the coordinates of a target grid (regular or curvilinear, e.g.
//! a CARRA domain), builds a sparse interpolation operator between the two and
//! writes every source variable resampled onto the target grid.
//!
//! ## Architecture
//!
//! - **Data Layer**: [`dataset`] opens NetCDF files eagerly, or lazily when a
//!   [`ChunkSpec`] is given
//! - **Grids**: [`grid`] recognises latitude/longitude coordinates
//! - **Processing**: [`interpolation`] computes the weight matrix; the source
//!   longitude axis is never treated as periodic
//! - **Output**: [`output`] writes the result atomically, evaluating deferred
//!   blocks as it goes
//!
//! ```no_run
//! use regridder::{regrid, ChunkSpec};
//! use std::path::Path;
//!
//! let chunks = ChunkSpec::new().with("time", 40);
//! regrid(
//!     Path::new("ERA5_wind_speed.nc"),
//!     Path::new("CARRA_East_grid.nc"),
//!     Path::new("regridded.nc"),
//!     Some(&chunks),
//! )?;
//! # Ok::<(), regridder::RegridError>(())
//! ```

pub mod chunks;
pub mod config;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod logging;
pub mod output;
pub mod regrid;

pub use chunks::ChunkSpec;
pub use config::Config;
pub use dataset::{AttributeValue, DataType, Dimension, Metadata, SourceDataset, Variable};
pub use error::{RegridError, Result};
pub use grid::HorizontalGrid;
pub use interpolation::{build_operator, Method, WeightMatrix};
pub use logging::{init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation};
pub use output::OutputDataset;
pub use regrid::{regrid, regrid_with, RegridSummary, Regridder};
