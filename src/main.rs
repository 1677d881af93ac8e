//! regridder - bilinear regridding of NetCDF datasets
//!
//! This is the command-line entry point.

use tracing::{error, info};

use regridder::{init_tracing, regrid_with, Config, Result};

fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.log_level);

    info!("Starting regridder v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let summary = regrid_with(
        &config.paths.source,
        &config.paths.target,
        &config.paths.output,
        config.chunks.as_ref(),
        config.method,
    )?;

    info!(
        "Regridded {} variable(s) onto a {}x{} grid: {}",
        summary.regridded.len(),
        summary.target_shape.0,
        summary.target_shape.1,
        summary.output.display()
    );
    Ok(())
}
