//! Shared NetCDF read and write helpers
//!
//! Small lookups used by the vegetation and time series modules: variable
//! and attribute access with typed errors, flattened reads, fill value
//! extraction and whole-variable writes.

use crate::errors::{PrmsError, Result};
use ndarray::ArrayD;
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{AttributeValue, File, FileMut, Variable};

/// Default fill netCDF uses for doubles when a variable declares none.
pub const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;

/// Default fill netCDF uses for floats when a variable declares none.
pub const NC_FILL_FLOAT: f32 = 9.969_209_968_386_869e36;

/// Look up a variable or fail with [`PrmsError::VariableNotFound`].
pub fn require_variable<'f>(file: &'f File, var_name: &str) -> Result<Variable<'f>> {
    file.variable(var_name)
        .ok_or_else(|| PrmsError::VariableNotFound {
            var: var_name.to_string(),
        })
}

/// Shape of a variable as dimension lengths (empty for scalars).
pub fn variable_shape(var: &Variable) -> Vec<usize> {
    var.dimensions().iter().map(netcdf::Dimension::len).collect()
}

/// Number of elements stored in a variable.
pub fn element_count(var: &Variable) -> usize {
    variable_shape(var).iter().product()
}

/// Reads a whole variable as an `f64` array with its on-disk shape.
pub fn read_array_f64(var: &Variable) -> Result<ArrayD<f64>> {
    let shape = variable_shape(var);
    let data = var.get_values::<f64, _>(..)?;
    Ok(ArrayD::from_shape_vec(shape, data)?)
}

/// Reads a whole variable flattened in row-major order.
pub fn read_flat_f64(var: &Variable) -> Result<Vec<f64>> {
    Ok(read_array_f64(var)?.iter().copied().collect())
}

/// Reads a whole integer-coded variable flattened in row-major order.
pub fn read_flat_i32(var: &Variable) -> Result<Vec<i32>> {
    Ok(var.get_values::<i32, _>(..)?)
}

/// Extracts the `_FillValue` attribute of a variable as `f64`, if present.
pub fn fill_value(var: &Variable) -> Option<f64> {
    var.attribute("_FillValue")
        .and_then(|attr| attribute_as_f64(attr.value().ok()?))
}

/// Fill value of a variable: its `_FillValue`, else the netCDF default for its type.
pub fn effective_fill_value(var: &Variable) -> Option<f64> {
    fill_value(var).or_else(|| default_fill_value(&var.vartype()))
}

/// netCDF default fill of a numeric type, widened to `f64`.
pub fn default_fill_value(vartype: &NcVariableType) -> Option<f64> {
    match vartype {
        NcVariableType::Float(FloatType::F64) => Some(NC_FILL_DOUBLE),
        NcVariableType::Float(FloatType::F32) => Some(f64::from(NC_FILL_FLOAT)),
        NcVariableType::Int(IntType::I8) => Some(-127.0),
        NcVariableType::Int(IntType::U8) => Some(255.0),
        NcVariableType::Int(IntType::I16) => Some(-32767.0),
        NcVariableType::Int(IntType::U16) => Some(65535.0),
        NcVariableType::Int(IntType::I32) => Some(-2_147_483_647.0),
        NcVariableType::Int(IntType::U32) => Some(4_294_967_295.0),
        _ => None,
    }
}

fn attribute_as_f64(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        _ => None,
    }
}

/// Reads a string attribute from a variable.
pub fn string_attribute(var: &Variable, attr_name: &str) -> Result<String> {
    let not_found = || PrmsError::AttributeNotFound {
        owner: var.name(),
        attr: attr_name.to_string(),
    };

    match var.attribute(attr_name).ok_or_else(not_found)?.value()? {
        AttributeValue::Str(s) => Ok(s),
        AttributeValue::Strs(mut ss) if !ss.is_empty() => Ok(ss.remove(0)),
        _ => Err(not_found()),
    }
}

/// Reads a numeric global attribute as a count, if present and non-negative.
pub fn global_count_attribute(file: &File, attr_name: &str) -> Result<Option<usize>> {
    let Some(attr) = file.attribute(attr_name) else {
        return Ok(None);
    };

    let count = attribute_as_f64(attr.value()?)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as usize);

    if count.is_none() {
        tracing::warn!(attribute = attr_name, "Global attribute is not a usable count");
    }

    Ok(count)
}

/// Overwrites every value of a variable, keeping its on-disk shape.
///
/// The supplied slice must hold exactly as many values as the variable.
pub fn overwrite_variable(file: &mut FileMut, var_name: &str, values: &[f64]) -> Result<()> {
    let shape = {
        let var = file
            .variable(var_name)
            .ok_or_else(|| PrmsError::VariableNotFound {
                var: var_name.to_string(),
            })?;
        variable_shape(&var)
    };

    let expected: usize = shape.iter().product();
    if values.len() != expected {
        return Err(PrmsError::ShapeMismatch {
            var: var_name.to_string(),
            expected,
            actual: values.len(),
        });
    }

    let data = ArrayD::from_shape_vec(shape, values.to_vec())?;

    let mut var = file
        .variable_mut(var_name)
        .ok_or_else(|| PrmsError::VariableNotFound {
            var: var_name.to_string(),
        })?;
    var.put(data.view(), ..)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use netcdf::{create, open};
    use tempfile::tempdir;

    #[test]
    fn test_helpers_on_small_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("helpers.nc");

        {
            let mut file = create(&path)?;
            file.add_dimension("y", 2)?;
            file.add_dimension("x", 3)?;
            file.add_attribute("number_of_rows", 2i32)?;

            let mut var = file.add_variable::<f32>("tmax", &["y", "x"])?;
            var.put_attribute("units", "degC")?;
            var.put_attribute("_FillValue", -999.0f32)?;
            let data = Array2::from_shape_vec((2, 3), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
            var.put(data.view(), ..)?;
        }

        let file = open(&path)?;
        let var = require_variable(&file, "tmax")?;
        assert_eq!(variable_shape(&var), vec![2, 3]);
        assert_eq!(element_count(&var), 6);
        assert_eq!(read_flat_f64(&var)?, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(fill_value(&var), Some(-999.0));
        assert_eq!(string_attribute(&var, "units")?, "degC");
        assert!(matches!(
            string_attribute(&var, "long_name"),
            Err(PrmsError::AttributeNotFound { .. })
        ));
        assert_eq!(global_count_attribute(&file, "number_of_rows")?, Some(2));
        assert_eq!(global_count_attribute(&file, "number_of_columns")?, None);
        assert!(matches!(
            require_variable(&file, "tmin"),
            Err(PrmsError::VariableNotFound { var }) if var == "tmin"
        ));

        Ok(())
    }

    #[test]
    fn test_default_fill_without_attribute() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("default_fill.nc");

        {
            let mut file = create(&path)?;
            file.add_dimension("time", 2)?;
            let mut tmin = file.add_variable::<f32>("tmin", &["time"])?;
            tmin.put_values(&[1.0f32, NC_FILL_FLOAT], ..)?;
            let mut tmax = file.add_variable::<f64>("tmax", &["time"])?;
            tmax.put_attribute("_FillValue", -999.0f64)?;
            tmax.put_values(&[1.0f64, -999.0], ..)?;
        }

        let file = open(&path)?;
        let tmin = require_variable(&file, "tmin")?;
        assert_eq!(fill_value(&tmin), None);
        let fill = effective_fill_value(&tmin);
        assert_eq!(fill, Some(f64::from(NC_FILL_FLOAT)));
        assert_eq!(read_flat_f64(&tmin)?[1], f64::from(NC_FILL_FLOAT));

        // A declared fill value wins over the type default
        let tmax = require_variable(&file, "tmax")?;
        assert_eq!(effective_fill_value(&tmax), Some(-999.0));

        assert_eq!(
            default_fill_value(&NcVariableType::Float(FloatType::F64)),
            Some(NC_FILL_DOUBLE)
        );
        assert_eq!(default_fill_value(&NcVariableType::String), None);

        Ok(())
    }

    #[test]
    fn test_overwrite_variable_checks_length() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("overwrite.nc");

        {
            let mut file = create(&path)?;
            file.add_dimension("time", 3)?;
            let mut var = file.add_variable::<f64>("tmin", &["time"])?;
            var.put_values(&[0.0f64, 0.0, 0.0], ..)?;
        }

        {
            let mut file = netcdf::append(&path)?;
            let err = overwrite_variable(&mut file, "tmin", &[1.0, 2.0]).unwrap_err();
            assert!(matches!(
                err,
                PrmsError::ShapeMismatch {
                    expected: 3,
                    actual: 2,
                    ..
                }
            ));
            overwrite_variable(&mut file, "tmin", &[1.0, 2.0, 3.0])?;
        }

        let file = open(&path)?;
        let var = require_variable(&file, "tmin")?;
        assert_eq!(read_flat_f64(&var)?, vec![1.0, 2.0, 3.0]);

        Ok(())
    }
}
