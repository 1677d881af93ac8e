//! Test data generation utilities.
//!
//! This module provides functions to generate NetCDF source datasets and
//! target grids with known coordinates and analytic data patterns.

use netcdf::Extent;
use std::path::Path;

// Use the netcdf crate's error type directly
use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Extents covering a whole variable of the given shape
pub fn extents(shape: &[usize]) -> Vec<Extent> {
    shape.iter().map(|&n| (0..n).into()).collect()
}

fn put_time(file: &mut netcdf::FileMut, n_time: usize) -> Result<()> {
    let mut time = file.add_variable::<f64>("time", &["time"])?;
    time.put_attribute("units", "hours since 1991-01-01 00:00:00")?;
    time.put_attribute("calendar", "gregorian")?;
    let values: Vec<f64> = (0..n_time).map(|t| t as f64 * 6.0).collect();
    time.put_values(&values, extents(&[n_time]).as_slice())?;
    Ok(())
}

fn put_axis(
    file: &mut netcdf::FileMut,
    name: &str,
    standard_name: &str,
    units: &str,
    values: &[f64],
) -> Result<()> {
    let mut var = file.add_variable::<f64>(name, &[name])?;
    var.put_attribute("standard_name", standard_name)?;
    var.put_attribute("units", units)?;
    var.put_values(values, ..)?;
    Ok(())
}

/// Creates an ERA5-style source file: `var_name(time, latitude, longitude)`
/// stored as f32 with values `f(t, lat, lon)`.
pub fn create_source_nc<F>(
    path: &Path,
    var_name: &str,
    lat: &[f64],
    lon: &[f64],
    n_time: usize,
    f: F,
) -> Result<()>
where
    F: Fn(usize, f64, f64) -> f64,
{
    let mut file = netcdf::create(path)?;

    file.add_unlimited_dimension("time")?;
    file.add_dimension("latitude", lat.len())?;
    file.add_dimension("longitude", lon.len())?;

    file.add_attribute("Conventions", "CF-1.6")?;
    file.add_attribute("history", "regridder test suite")?;

    put_time(&mut file, n_time)?;
    put_axis(&mut file, "latitude", "latitude", "degrees_north", lat)?;
    put_axis(&mut file, "longitude", "longitude", "degrees_east", lon)?;

    let mut values = Vec::with_capacity(n_time * lat.len() * lon.len());
    for t in 0..n_time {
        for &y in lat {
            for &x in lon {
                values.push(f(t, y, x) as f32);
            }
        }
    }

    let mut var = file.add_variable::<f32>(var_name, &["time", "latitude", "longitude"])?;
    var.put_attribute("units", "m s**-1")?;
    var.put_attribute("long_name", "Wind speed")?;
    var.put_values(&values, extents(&[n_time, lat.len(), lon.len()]).as_slice())?;

    Ok(())
}

/// Creates a source with `t2m` packed as i16 (`scale_factor`, `add_offset`)
/// and an optional fill value at `(t, lat_idx, lon_idx)`.
pub fn create_packed_source_nc<F>(
    path: &Path,
    lat: &[f64],
    lon: &[f64],
    n_time: usize,
    f: F,
    fill_at: Option<(usize, usize, usize)>,
) -> Result<()>
where
    F: Fn(usize, f64, f64) -> f64,
{
    const SCALE: f64 = 0.01;
    const OFFSET: f64 = 250.0;
    const FILL: i16 = -32767;

    let mut file = netcdf::create(path)?;

    file.add_unlimited_dimension("time")?;
    file.add_dimension("latitude", lat.len())?;
    file.add_dimension("longitude", lon.len())?;
    file.add_attribute("Conventions", "CF-1.6")?;

    put_time(&mut file, n_time)?;
    put_axis(&mut file, "latitude", "latitude", "degrees_north", lat)?;
    put_axis(&mut file, "longitude", "longitude", "degrees_east", lon)?;

    let mut values = Vec::with_capacity(n_time * lat.len() * lon.len());
    for t in 0..n_time {
        for (j, &y) in lat.iter().enumerate() {
            for (i, &x) in lon.iter().enumerate() {
                if fill_at == Some((t, j, i)) {
                    values.push(FILL);
                } else {
                    values.push(((f(t, y, x) - OFFSET) / SCALE).round() as i16);
                }
            }
        }
    }

    let mut var = file.add_variable::<i16>("t2m", &["time", "latitude", "longitude"])?;
    var.put_attribute("scale_factor", SCALE)?;
    var.put_attribute("add_offset", OFFSET)?;
    var.put_attribute("_FillValue", FILL)?;
    var.put_attribute("missing_value", FILL)?;
    var.put_attribute("units", "K")?;
    var.put_attribute("long_name", "2 metre temperature")?;
    var.put_values(&values, extents(&[n_time, lat.len(), lon.len()]).as_slice())?;

    Ok(())
}

/// Creates a small source with bounds variables alongside `u10`:
/// `time_bnds(time, bnds)` and `latitude_bnds(latitude, bnds)`.
pub fn create_source_with_bounds_nc(path: &Path) -> Result<()> {
    let lat = linspace(60.0, 70.0, 6);
    let lon = linspace(0.0, 10.0, 6);
    let n_time = 3;

    let mut file = netcdf::create(path)?;
    file.add_unlimited_dimension("time")?;
    file.add_dimension("latitude", lat.len())?;
    file.add_dimension("longitude", lon.len())?;
    file.add_dimension("bnds", 2)?;

    put_time(&mut file, n_time)?;
    put_axis(&mut file, "latitude", "latitude", "degrees_north", &lat)?;
    put_axis(&mut file, "longitude", "longitude", "degrees_east", &lon)?;
    {
        let mut latitude = file
            .variable_mut("latitude")
            .ok_or_else(|| Error::Str("latitude missing".to_string()))?;
        latitude.put_attribute("bounds", "latitude_bnds")?;
    }

    {
        let mut time_bnds = file.add_variable::<f64>("time_bnds", &["time", "bnds"])?;
        let values: Vec<f64> = (0..n_time)
            .flat_map(|t| [t as f64 * 6.0 - 3.0, t as f64 * 6.0 + 3.0])
            .collect();
        time_bnds.put_values(&values, extents(&[n_time, 2]).as_slice())?;
    }
    {
        let mut lat_bnds = file.add_variable::<f64>("latitude_bnds", &["latitude", "bnds"])?;
        lat_bnds.put_attribute("units", "degrees_north")?;
        let values: Vec<f64> = lat.iter().flat_map(|y| [y - 1.0, y + 1.0]).collect();
        lat_bnds.put_values(&values, ..)?;
    }
    {
        let mut u10 = file.add_variable::<f64>("u10", &["time", "latitude", "longitude"])?;
        u10.put_attribute("units", "m s**-1")?;
        let values: Vec<f64> = (0..n_time * lat.len() * lon.len()).map(|i| i as f64).collect();
        u10.put_values(&values, extents(&[n_time, lat.len(), lon.len()]).as_slice())?;
    }

    Ok(())
}

/// Creates a rectilinear target grid file with `lat` and `lon` coordinates only
pub fn create_target_grid_nc(path: &Path, lat: &[f64], lon: &[f64]) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;
    file.add_attribute("title", "Target grid")?;

    {
        let mut var = file.add_variable::<f64>("lat", &["lat"])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_attribute("long_name", "latitude")?;
        var.put_values(lat, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_attribute("long_name", "longitude")?;
        var.put_values(lon, ..)?;
    }

    Ok(())
}

/// Creates a curvilinear target grid: `latitude(y, x)` and `longitude(y, x)`
/// from `point(j, i)`, with projection coordinates `y(y)` and `x(x)`.
pub fn create_curvilinear_target_nc<F>(path: &Path, ny: usize, nx: usize, point: F) -> Result<()>
where
    F: Fn(usize, usize) -> (f64, f64),
{
    let mut file = netcdf::create(path)?;

    file.add_dimension("y", ny)?;
    file.add_dimension("x", nx)?;
    file.add_attribute("title", "Curvilinear target grid")?;

    let mut lat = Vec::with_capacity(ny * nx);
    let mut lon = Vec::with_capacity(ny * nx);
    for j in 0..ny {
        for i in 0..nx {
            let (y, x) = point(j, i);
            lat.push(y);
            lon.push(x);
        }
    }

    {
        let mut var = file.add_variable::<f64>("y", &["y"])?;
        var.put_attribute("standard_name", "projection_y_coordinate")?;
        var.put_attribute("units", "m")?;
        let values: Vec<f64> = (0..ny).map(|j| j as f64 * 2500.0).collect();
        var.put_values(&values, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("x", &["x"])?;
        var.put_attribute("standard_name", "projection_x_coordinate")?;
        var.put_attribute("units", "m")?;
        let values: Vec<f64> = (0..nx).map(|i| i as f64 * 2500.0).collect();
        var.put_values(&values, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("latitude", &["y", "x"])?;
        var.put_attribute("standard_name", "latitude")?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(&lat, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("longitude", &["y", "x"])?;
        var.put_attribute("standard_name", "longitude")?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(&lon, ..)?;
    }

    Ok(())
}

/// Creates a file with no recognisable latitude/longitude coordinates
pub fn create_grid_without_coordinates_nc(path: &Path) -> Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("a", 3)?;
    file.add_dimension("b", 4)?;

    let mut var = file.add_variable::<f32>("mask", &["a", "b"])?;
    var.put_values(&[1.0f32; 12], ..)?;

    Ok(())
}
