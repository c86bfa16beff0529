//! Temperature time series extraction and merge
//!
//! Converts the temperature variables of a PRMS data file into a JSON payload
//! of flattened values plus one ISO-8601 timestamp per day, and writes values
//! posted back by the client into the file.

use crate::errors::{PrmsError, Result};
use crate::netcdf_io::{
    effective_fill_value, element_count, overwrite_variable, read_flat_f64, require_variable,
    string_attribute, variable_shape, NC_FILL_DOUBLE,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Timestamp layout of `timestep_values`.
const TIMESTEP_FORMAT: &str = "%Y-%m-%dT00:00:00";

/// Flattened temperature values keyed by variable name. Missing values are `None`.
pub type TemperatureValues = BTreeMap<String, Vec<Option<f64>>>;

/// Temperature series of a data file with its daily timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSeries {
    pub temperature_values: TemperatureValues,
    pub timestep_values: Vec<String>,
}

/// Replacement values posted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureUpdate {
    pub temperature_values: TemperatureValues,
}

/// Picks the temperature variables out of a file's variable names.
///
/// Exact `tmin` and `tmax` come first, followed by every name whose part
/// before the first `_` contains `tmin` or `tmax` (e.g. `tmax_1`).
pub fn temperature_variable_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut selected = Vec::new();

    for exact in ["tmin", "tmax"] {
        if names.iter().any(|n| n.as_ref() == exact) {
            selected.push(exact.to_string());
        }
    }

    for name in names.iter().map(AsRef::as_ref) {
        if let Some((stem, _)) = name.split_once('_') {
            if stem.contains("tmax") || stem.contains("tmin") {
                selected.push(name.to_string());
            }
        }
    }

    selected
}

/// Parses the start date out of a `days since YYYY-MM-DD` units string.
///
/// A trailing time of day (`days since 1980-01-01 00:00:00`) is accepted and ignored.
pub fn parse_days_since(units: &str) -> Result<NaiveDate> {
    let invalid = || PrmsError::InvalidTimeUnits {
        units: units.to_string(),
    };

    let tokens: Vec<&str> = units.split_whitespace().collect();
    match tokens.as_slice() {
        [days, since, date, ..]
            if days.eq_ignore_ascii_case("days") && since.eq_ignore_ascii_case("since") =>
        {
            let date = date.split('T').next().unwrap_or_default();
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Formats `count` consecutive days starting at `start`.
pub fn daily_timesteps(start: NaiveDate, count: usize) -> Vec<String> {
    start
        .iter_days()
        .take(count)
        .map(|day| day.format(TIMESTEP_FORMAT).to_string())
        .collect()
}

/// Reads the temperature variables and daily timestamps of a data file.
pub fn read_temperature_series(path: &Path) -> Result<TemperatureSeries> {
    let file = netcdf::open(path)?;

    let names: Vec<String> = file.variables().map(|v| v.name()).collect();

    let mut temperature_values = TemperatureValues::new();
    for name in temperature_variable_names(&names) {
        let var = require_variable(&file, &name)?;
        let fill = effective_fill_value(&var);
        let values = read_flat_f64(&var)?
            .into_iter()
            .map(|v| mask_missing(v, fill))
            .collect();
        temperature_values.insert(name, values);
    }

    let time = file.variable("time").ok_or(PrmsError::MissingTimeVariable)?;
    let start = parse_days_since(&string_attribute(&time, "units")?)?;
    let steps = variable_shape(&time).first().copied().unwrap_or(1);
    let timestep_values = daily_timesteps(start, steps);

    tracing::debug!(
        path = %path.display(),
        variables = temperature_values.len(),
        steps,
        "Read temperature series"
    );

    Ok(TemperatureSeries {
        temperature_values,
        timestep_values,
    })
}

/// Reads the temperature series of a data file as a JSON string.
pub fn add_values_into_json(path: &Path) -> Result<String> {
    Ok(serde_json::to_string(&read_temperature_series(path)?)?)
}

/// Overwrites temperature variables with posted values, then moves the file to `update_file`.
///
/// All names and lengths are checked before anything is written, so a bad
/// request leaves the file untouched. `None` entries are written as the
/// variable's fill value, or the netCDF default fill of its type.
pub fn add_values_into_netcdf(
    original_nc: &Path,
    update: &TemperatureUpdate,
    update_file: &Path,
) -> Result<()> {
    {
        let mut file = netcdf::append(original_nc)?;

        let mut prepared = Vec::with_capacity(update.temperature_values.len());
        for (name, values) in &update.temperature_values {
            let var = require_variable(&file, name)?;
            let expected = element_count(&var);
            if values.len() != expected {
                return Err(PrmsError::ShapeMismatch {
                    var: name.clone(),
                    expected,
                    actual: values.len(),
                });
            }

            let fill = effective_fill_value(&var).unwrap_or(NC_FILL_DOUBLE);
            let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill)).collect();
            prepared.push((name.as_str(), filled));
        }

        for (name, values) in &prepared {
            overwrite_variable(&mut file, name, values)?;
        }
    }

    move_file(original_nc, update_file)?;

    tracing::info!(
        from = %original_nc.display(),
        to = %update_file.display(),
        variables = update.temperature_values.len(),
        "Merged temperature values"
    );

    Ok(())
}

fn mask_missing(value: f64, fill: Option<f64>) -> Option<f64> {
    if !value.is_finite() || fill.is_some_and(|f| value == f) {
        None
    } else {
        Some(value)
    }
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    tracing::warn!(
        from = %from.display(),
        to = %to.display(),
        "Rename failed, falling back to copy and remove"
    );
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}
