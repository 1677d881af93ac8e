//! Print what the regridder sees in a NetCDF file: dimensions, variables
//! and the detected horizontal grid.

use std::path::PathBuf;

use clap::Parser;
use regridder::{HorizontalGrid, Result, SourceDataset};

#[derive(Parser, Debug)]
#[command(name = "inspect_grid", about = "Inspect the horizontal grid of a NetCDF file")]
struct Args {
    /// NetCDF file to inspect
    file: PathBuf,

    /// Print the full metadata as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dataset = SourceDataset::open(&args.file, None)?;
    let metadata = dataset.metadata();

    if args.json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }

    println!("Inspecting NetCDF file: {}", dataset.path().display());

    println!("\nDimensions:");
    for dim in &metadata.dimensions {
        println!(
            "  {} = {} {}",
            dim.name,
            dim.size,
            if dim.is_unlimited { "(unlimited)" } else { "" }
        );
    }

    println!("\nVariables:");
    for var in &metadata.variables {
        println!("  {} ({:?}) {:?}", var.name, var.dtype, var.dimensions);
    }

    println!("\nHorizontal grid:");
    match HorizontalGrid::detect(&dataset) {
        Ok(grid) => {
            let (lat, lon) = grid.coordinate_names();
            let (rows, cols) = grid.shape();
            let kind = if grid.is_rectilinear() { "rectilinear" } else { "curvilinear" };
            println!("  {} {}x{} ({}, {})", kind, rows, cols, lat, lon);

            let points = grid.points();
            let (min_lat, max_lat) = extent(points.iter().map(|p| p.0));
            let (min_lon, max_lon) = extent(points.iter().map(|p| p.1));
            println!("  latitude  {:.4} .. {:.4}", min_lat, max_lat);
            println!("  longitude {:.4} .. {:.4}", min_lon, max_lon);
        }
        Err(e) => println!("  not detected: {}", e),
    }

    Ok(())
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
