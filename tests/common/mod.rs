//! NetCDF fixtures shared by the integration tests

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use netcdf::create;
use prms_workspace::errors::Result;
use std::path::Path;

/// Coverage codes of the 3x4 test grid, row-major.
pub const COV_TYPE: [i32; 12] = [0, 1, 2, 3, 4, 4, 3, 2, 1, 0, 1, 1];

/// netCDF default fill for floats, as written by a model that never declared `_FillValue`.
pub const DEFAULT_FLOAT_FILL: f32 = 9.969_209_968_386_869e36;

/// Variations of the parameter file fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLayout {
    Complete,
    WithoutGridAttributes,
    /// `hru_elev` stored per row instead of per HRU.
    RowElevation,
    /// `lat` exists but holds no values.
    EmptyLatitude,
}

/// Variations of the data file fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLayout {
    Complete,
    WithoutTime,
    TimeWithoutUnits,
    TimeUnits(&'static str),
}

/// Writes a small PRMS parameter file: 3 rows (north to south) by 4 columns (west to east).
pub fn write_param_file(path: &Path, layout: ParamLayout) -> Result<()> {
    let mut file = create(path)?;

    if layout != ParamLayout::WithoutGridAttributes {
        file.add_attribute("number_of_columns", 4i32)?;
        file.add_attribute("number_of_rows", 3i32)?;
    }

    if layout == ParamLayout::EmptyLatitude {
        file.add_unlimited_dimension("lat")?;
    } else {
        file.add_dimension("lat", 3)?;
    }
    file.add_dimension("lon", 4)?;

    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("units", "degrees_north")?;
        if layout != ParamLayout::EmptyLatitude {
            let data = Array1::from(vec![39.0, 38.5, 38.0]);
            lat.put(data.view(), ..)?;
        }
    }

    {
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        let data = Array1::from(vec![-114.5, -114.25, -114.0, -113.75]);
        lon.put(data.view(), ..)?;
    }

    if layout == ParamLayout::EmptyLatitude {
        file.add_variable::<i32>("cov_type", &["lat", "lon"])?;
        file.add_variable::<f32>("hru_elev", &["lat", "lon"])?;
        return Ok(());
    }

    {
        let mut cov_type = file.add_variable::<i32>("cov_type", &["lat", "lon"])?;
        let data = Array2::from_shape_vec((3, 4), COV_TYPE.to_vec())?;
        cov_type.put(data.view(), ..)?;
    }

    if layout == ParamLayout::RowElevation {
        let mut elev = file.add_variable::<f32>("hru_elev", &["lat"])?;
        let data = Array1::from(vec![2000.0f32, 2100.0, 2200.0]);
        elev.put(data.view(), ..)?;
    } else {
        let mut elev = file.add_variable::<f32>("hru_elev", &["lat", "lon"])?;
        elev.put_attribute("units", "meters")?;
        let values: Vec<f32> = (0..12).map(|i| 2000.0 + i as f32 * 10.0).collect();
        let data = Array2::from_shape_vec((3, 4), values)?;
        elev.put(data.view(), ..)?;
    }

    Ok(())
}

/// Writes a small PRMS data file: 4 daily steps from 2010-10-01 for 2 HRUs.
///
/// `tmax` carries its declared fill value at index 3. `tmin` declares no
/// `_FillValue` and holds the netCDF default float fill at index 5.
pub fn write_data_file(path: &Path, layout: DataLayout) -> Result<()> {
    let mut file = create(path)?;

    file.add_dimension("time", 4)?;
    file.add_dimension("hru", 2)?;

    let units = match layout {
        DataLayout::Complete => Some("days since 2010-10-01"),
        DataLayout::TimeUnits(units) => Some(units),
        DataLayout::TimeWithoutUnits => None,
        DataLayout::WithoutTime => None,
    };

    if layout != DataLayout::WithoutTime {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        if let Some(units) = units {
            time.put_attribute("units", units)?;
        }
        let data = Array1::from(vec![0.0, 1.0, 2.0, 3.0]);
        time.put(data.view(), ..)?;
    }

    {
        let mut tmax = file.add_variable::<f32>("tmax", &["time", "hru"])?;
        tmax.put_attribute("_FillValue", -999.0f32)?;
        let data = Array2::from_shape_vec(
            (4, 2),
            vec![10.5, 11.0, 12.25, -999.0, 9.0, 8.5, 7.75, 7.0],
        )?;
        tmax.put(data.view(), ..)?;
    }

    {
        let mut tmin = file.add_variable::<f32>("tmin", &["time", "hru"])?;
        let data = Array2::from_shape_vec(
            (4, 2),
            vec![-1.0, -2.0, 0.5, 0.0, -3.5, DEFAULT_FLOAT_FILL, 1.0, 2.0],
        )?;
        tmin.put(data.view(), ..)?;
    }

    {
        let mut precip = file.add_variable::<f32>("precip", &["time", "hru"])?;
        let data = Array2::from_shape_vec((4, 2), vec![0.0f32; 8])?;
        precip.put(data.view(), ..)?;
    }

    Ok(())
}
