//! Centralized error handling for the PRMS workspace service
//!
//! Every library operation returns [`Result`], so a missing variable, a
//! malformed `units` string or a failed download reaches the caller as a typed
//! value instead of an unhandled fault.

use thiserror::Error;

/// Main error type for PRMS workspace operations
#[derive(Error, Debug)]
pub enum PrmsError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Outbound HTTP errors (model API, input downloads)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Request body is not the JSON the route expects
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Array shape errors while reshaping netCDF data
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// Attribute not found on a variable or on the file
    #[error("Attribute '{attr}' not found on '{owner}'")]
    AttributeNotFound { owner: String, attr: String },

    /// Data file has no `time` variable to build timestamps from
    #[error("No 'time' variable found in file")]
    MissingTimeVariable,

    /// `units` attribute is not of the form "days since YYYY-MM-DD"
    #[error("Invalid time units '{units}': expected 'days since YYYY-MM-DD'")]
    InvalidTimeUnits { units: String },

    /// Coverage code outside the five known vegetation classes
    #[error("Invalid coverage type {value} at HRU {hru}")]
    InvalidCoverType { hru: usize, value: i32 },

    /// Latitude/longitude axes cannot describe a grid
    #[error("Invalid grid: {message}")]
    InvalidGrid { message: String },

    /// Supplied or stored array length does not match what was expected
    #[error("Shape mismatch for '{var}': expected {expected} values, got {actual}")]
    ShapeMismatch {
        var: String,
        expected: usize,
        actual: usize,
    },

    /// User identity cannot be mapped to a workspace folder
    #[error("Invalid user '{email}': {reason}")]
    InvalidUser { email: String, reason: String },

    /// Request carried no usable identity or token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Remote service answered with a non-success status
    #[error("Upstream {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },
}

/// Result type alias for PRMS workspace operations
pub type Result<T> = std::result::Result<T, PrmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PrmsError::VariableNotFound {
            var: "cov_type".to_string(),
        };
        assert_eq!(err.to_string(), "Variable 'cov_type' not found in file");

        let err = PrmsError::InvalidTimeUnits {
            units: "hours since 2010-01-01".to_string(),
        };
        assert!(err.to_string().contains("days since YYYY-MM-DD"));

        let err = PrmsError::ShapeMismatch {
            var: "tmax".to_string(),
            expected: 4,
            actual: 3,
        };
        assert!(err.to_string().contains("expected 4 values, got 3"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PrmsError = io.into();
        assert!(matches!(err, PrmsError::IoError(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
