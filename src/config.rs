//! Configuration management for the regridder.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunks::ChunkSpec;
use crate::error::{RegridError, Result};
use crate::interpolation::Method;

/// Command-line arguments for the regridder
#[derive(Parser, Debug)]
#[command(name = "regridder")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source NetCDF file (e.g. ERA5 data)
    #[arg(env = "REGRIDDER_SOURCE")]
    pub source: Option<PathBuf>,

    /// NetCDF file defining the target grid (e.g. a CARRA grid)
    #[arg(env = "REGRIDDER_TARGET")]
    pub target: Option<PathBuf>,

    /// Output NetCDF file
    #[arg(env = "REGRIDDER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Chunk sizes enabling lazy block processing, e.g. time=40,latitude=70,longitude=70
    #[arg(short = 'k', long, env = "REGRIDDER_CHUNKS")]
    pub chunks: Option<ChunkSpec>,

    /// Interpolation method (bilinear, nearest)
    #[arg(short, long, env = "REGRIDDER_METHOD")]
    pub method: Option<Method>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "REGRIDDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "REGRIDDER_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Input and output files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub source: PathBuf,

    #[serde(default)]
    pub target: PathBuf,

    #[serde(default)]
    pub output: PathBuf,
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input and output files
    #[serde(default)]
    pub paths: PathsConfig,

    /// Chunk sizes; absent means the source is loaded eagerly
    #[serde(default)]
    pub chunks: Option<ChunkSpec>,

    /// Interpolation method
    #[serde(default)]
    pub method: Method,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Layer parsed arguments over the config file and defaults
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(source) = args.source {
            config.paths.source = source;
        }
        if let Some(target) = args.target {
            config.paths.target = target;
        }
        if let Some(output) = args.output {
            config.paths.output = output;
        }
        if args.chunks.is_some() {
            config.chunks = args.chunks;
        }
        if let Some(method) = args.method {
            config.method = method;
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("source", &self.paths.source),
            ("target", &self.paths.target),
            ("output", &self.paths.output),
        ] {
            if path.as_os_str().is_empty() {
                return Err(RegridError::config(format!("No {} path given", name)));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(RegridError::config(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.log_level
                )));
            }
        }

        if let Some(chunks) = &self.chunks {
            chunks.validate()?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            chunks: None,
            method: Method::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
