//! Error types for the regridder.
//!
//! Every failure is surfaced to the caller unchanged; nothing in the crate
//! retries or recovers.

use thiserror::Error;

/// The main error type for regridder operations.
#[derive(Error, Debug)]
pub enum RegridError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors, including chunk specs that do not fit the source
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Source and target coordinates cannot be used for interpolation
    #[error("Grid error: {message}")]
    Grid { message: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Array shape mismatches
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegridError {
    pub(crate) fn grid(message: impl Into<String>) -> Self {
        RegridError::Grid {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        RegridError::Config {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with RegridError
pub type Result<T> = std::result::Result<T, RegridError>;
