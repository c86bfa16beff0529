//! prms_workspace: server-side utilities for a PRMS modeling web application
//!
//! Reads and writes the NetCDF climate and parameter files of a PRMS
//! (Precipitation-Runoff Modeling System) model run, lists finished runs from
//! the external model API, and stages inputs in per-user workspaces.
//!
//! ## Module Organization
//!
//! - [`vegetation`]: vegetation classes and elevation by HRU, grid bounding box
//! - [`timeseries`]: temperature series to JSON and merging edits back
//! - [`model_runs`]: model API client and the finished-run filter
//! - [`workspace`]: user folders, default and downloaded input staging
//! - [`server`]: axum routes exposing the operations above
//! - [`netcdf_io`]: shared NetCDF lookups and writes
//! - [`config`]: file names, roots and hosts
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use prms_workspace::vegetation::get_veg_map_by_hru;
//! use std::path::Path;
//!
//! let veg_map = get_veg_map_by_hru(Path::new("parameter.nc")).unwrap();
//! println!("{} HRUs with conifers", veg_map.cover_types.conifers.len());
//! ```

pub mod config;
pub mod errors;
pub mod model_runs;
pub mod netcdf_io;
pub mod server;
pub mod timeseries;
pub mod vegetation;
pub mod workspace;

pub use errors::{PrmsError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::AppConfig;
    pub use crate::errors::{PrmsError, Result};
    pub use crate::model_runs::{ModelApiClient, ModelRun, ModelRunSearch, ModelRunSummary};
    pub use crate::timeseries::{TemperatureSeries, TemperatureUpdate};
    pub use crate::vegetation::{ProjectionInformation, VegetationMapByHru};
    pub use crate::workspace::{InputUrls, StagedInputs};
}
