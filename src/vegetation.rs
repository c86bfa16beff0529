//! Vegetation and elevation map by HRU
//!
//! Builds the per-HRU vegetation map from a PRMS parameter file: the
//! flattened `cov_type` grid is partitioned into one index list per
//! vegetation class, `hru_elev` is flattened alongside it, and the grid's
//! bounding box is read off the `lat`/`lon` axes.

use crate::errors::{PrmsError, Result};
use crate::netcdf_io::{global_count_attribute, read_flat_f64, read_flat_i32, require_variable};
use netcdf::File;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cell size of the Lehman Creek grid in meters. The parameter files do not carry it.
pub const LEHMAN_CREEK_CELLSIZE: u32 = 100;

/// Coverage type codes as stored in `cov_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverType {
    BareGround = 0,
    Grasses = 1,
    Shrubs = 2,
    Trees = 3,
    Conifers = 4,
}

impl CoverType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::BareGround),
            1 => Some(Self::Grasses),
            2 => Some(Self::Shrubs),
            3 => Some(Self::Trees),
            4 => Some(Self::Conifers),
            _ => None,
        }
    }
}

/// Grid dimensions and bounding box of a parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInformation {
    pub ncol: usize,
    pub nrow: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub xurcorner: f64,
    pub yurcorner: f64,
    pub cellsize: u32,
}

/// HRU indices grouped by coverage type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverTypeIndices {
    pub bare_ground: Vec<usize>,
    pub grasses: Vec<usize>,
    pub shrubs: Vec<usize>,
    pub trees: Vec<usize>,
    pub conifers: Vec<usize>,
}

impl CoverTypeIndices {
    fn list_mut(&mut self, cover: CoverType) -> &mut Vec<usize> {
        match cover {
            CoverType::BareGround => &mut self.bare_ground,
            CoverType::Grasses => &mut self.grasses,
            CoverType::Shrubs => &mut self.shrubs,
            CoverType::Trees => &mut self.trees,
            CoverType::Conifers => &mut self.conifers,
        }
    }

    /// Total number of indices across all five lists.
    pub fn len(&self) -> usize {
        self.bare_ground.len()
            + self.grasses.len()
            + self.shrubs.len()
            + self.trees.len()
            + self.conifers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Vegetation classes and elevation for every HRU, plus grid metadata.
///
/// Serializes flat: the five class lists sit next to `projection_information`
/// and `elevation` in the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationMapByHru {
    #[serde(flatten)]
    pub cover_types: CoverTypeIndices,
    pub projection_information: ProjectionInformation,
    /// Elevation per HRU, indexed like the flattened coverage grid
    pub elevation: Vec<f64>,
}

/// Partitions a flattened coverage grid into one index list per class.
///
/// Indices are pushed in ascending order, so each list is sorted. A code
/// outside `0..=4` fails the whole partition rather than dropping the HRU.
pub fn partition_cover_types(cov_type: &[i32]) -> Result<CoverTypeIndices> {
    let mut indices = CoverTypeIndices::default();

    for (hru, &code) in cov_type.iter().enumerate() {
        let cover =
            CoverType::from_code(code).ok_or(PrmsError::InvalidCoverType { hru, value: code })?;
        indices.list_mut(cover).push(hru);
    }

    Ok(indices)
}

/// Builds the vegetation map for the PRMS parameter file at `path`.
pub fn get_veg_map_by_hru(path: &Path) -> Result<VegetationMapByHru> {
    let file = netcdf::open(path)?;
    let veg_map = veg_map_from_file(&file)?;

    tracing::debug!(
        path = %path.display(),
        hrus = veg_map.elevation.len(),
        "Built vegetation map"
    );

    Ok(veg_map)
}

/// Builds the vegetation map from an already opened parameter file.
pub fn veg_map_from_file(file: &File) -> Result<VegetationMapByHru> {
    let projection_information = projection_information(file)?;

    let cov_type = read_flat_i32(&require_variable(file, "cov_type")?)?;
    let cover_types = partition_cover_types(&cov_type)?;

    let elevation = read_flat_f64(&require_variable(file, "hru_elev")?)?;
    if elevation.len() != cov_type.len() {
        return Err(PrmsError::ShapeMismatch {
            var: "hru_elev".to_string(),
            expected: cov_type.len(),
            actual: elevation.len(),
        });
    }

    Ok(VegetationMapByHru {
        cover_types,
        projection_information,
        elevation,
    })
}

/// Reads grid dimensions and the bounding box from the `lat`/`lon` axes.
///
/// Latitudes are stored top to bottom, so the first value is the upper edge.
/// Longitudes run west to east.
pub fn projection_information(file: &File) -> Result<ProjectionInformation> {
    let lat = read_flat_f64(&require_variable(file, "lat")?)?;
    let lon = read_flat_f64(&require_variable(file, "lon")?)?;

    let (Some(&yurcorner), Some(&yllcorner)) = (lat.first(), lat.last()) else {
        return Err(PrmsError::InvalidGrid {
            message: "'lat' has no values".to_string(),
        });
    };
    let (Some(&xllcorner), Some(&xurcorner)) = (lon.first(), lon.last()) else {
        return Err(PrmsError::InvalidGrid {
            message: "'lon' has no values".to_string(),
        });
    };

    let ncol = match global_count_attribute(file, "number_of_columns")? {
        Some(n) => n,
        None => {
            tracing::warn!("No 'number_of_columns' attribute, using length of 'lon'");
            lon.len()
        }
    };
    let nrow = match global_count_attribute(file, "number_of_rows")? {
        Some(n) => n,
        None => {
            tracing::warn!("No 'number_of_rows' attribute, using length of 'lat'");
            lat.len()
        }
    };

    Ok(ProjectionInformation {
        ncol,
        nrow,
        xllcorner,
        yllcorner,
        xurcorner,
        yurcorner,
        cellsize: LEHMAN_CREEK_CELLSIZE,
    })
}

/// Applies a vegetation map to a set of PRMS parameters.
///
/// Parameters are returned unchanged: how class changes translate into
/// parameter edits is not defined yet.
pub fn propagate_all_vegetation_changes<P>(original_prms_params: P, veg_map: &VegetationMapByHru) -> P {
    tracing::debug!(
        hrus = veg_map.cover_types.len(),
        "Vegetation changes not propagated; returning parameters unchanged"
    );
    original_prms_params
}
