//! Grid parameter requests and the standard provider

use fcst_grid::{esg_grid_params, gfdl_grid_params, EsgInputs, GfdlInputs, GridParams, Param};
use std::path::PathBuf;

use super::GridParamProvider;
use crate::config::load_config_file;
use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::value::{Mapping, Value};

/// Supported horizontal grid generation methods.
pub const GRID_GEN_METHODS: &[&str] = &["GFDLgrid", "ESGgrid"];

/// Nested mapping in a predefined grid entry holding the write-component
/// settings used with quilting.
const QUILTING_SECTION: &str = "QUILTING";

/// Lookup of a predefined grid
#[derive(Debug, Clone, PartialEq)]
pub struct PredefRequest {
    pub grid_name: String,
    /// Whether the write component is used; without it the `WRTCMP_*`
    /// entries are dropped.
    pub quilting: bool,
}

/// Inputs for generating a grid
#[derive(Debug, Clone, PartialEq)]
pub enum GridRequest {
    Esg(EsgInputs),
    Gfdl(GfdlInputs),
}

impl GridRequest {
    /// Build the request for the document's `GRID_GEN_METHOD`.
    pub fn from_document(doc: &Document) -> SetupResult<Self> {
        let method = doc.text("workflow.GRID_GEN_METHOD");
        match method.as_str() {
            "ESGgrid" => Ok(GridRequest::Esg(EsgInputs {
                lon_ctr: doc.require_f64("task_make_grid.ESGgrid_LON_CTR")?,
                lat_ctr: doc.require_f64("task_make_grid.ESGgrid_LAT_CTR")?,
                nx: doc.require_i64("task_make_grid.ESGgrid_NX")?,
                ny: doc.require_i64("task_make_grid.ESGgrid_NY")?,
                pazi: doc.require_f64("task_make_grid.ESGgrid_PAZI")?,
                halo_width: doc.require_i64("task_make_grid.ESGgrid_WIDE_HALO_WIDTH")?,
                delx: doc.require_f64("task_make_grid.ESGgrid_DELX")?,
                dely: doc.require_f64("task_make_grid.ESGgrid_DELY")?,
                radius_earth: doc.require_f64("constants.RADIUS_EARTH")?,
                degs_per_radian: doc.require_f64("constants.DEGS_PER_RADIAN")?,
            })),
            "GFDLgrid" => Ok(GridRequest::Gfdl(GfdlInputs {
                lon_t6_ctr: doc.require_f64("task_make_grid.GFDLgrid_LON_T6_CTR")?,
                lat_t6_ctr: doc.require_f64("task_make_grid.GFDLgrid_LAT_T6_CTR")?,
                num_cells: doc.require_i64("task_make_grid.GFDLgrid_NUM_CELLS")?,
                stretch_fac: doc.require_f64("task_make_grid.GFDLgrid_STRETCH_FAC")?,
                refine_ratio: doc.require_i64("task_make_grid.GFDLgrid_REFINE_RATIO")?,
                istart_on_t6g: doc.require_i64("task_make_grid.GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G")?,
                iend_on_t6g: doc.require_i64("task_make_grid.GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G")?,
                jstart_on_t6g: doc.require_i64("task_make_grid.GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G")?,
                jend_on_t6g: doc.require_i64("task_make_grid.GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G")?,
                nh4: doc.require_i64("constants.NH4")?,
            })),
            _ => Err(SetupError::Unsupported {
                key: "GRID_GEN_METHOD".to_string(),
                value: method,
                supported: GRID_GEN_METHODS.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }
}

/// Grid geometry from the `fcst-grid` crate and predefined grids from
/// `predef_grid_params.yaml`
#[derive(Debug, Clone)]
pub struct StandardGrids {
    table: PathBuf,
}

impl StandardGrids {
    pub fn new(table: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl GridParamProvider for StandardGrids {
    fn predefined(&self, request: &PredefRequest) -> SetupResult<Mapping> {
        let table = load_config_file(&self.table)?;
        let entry = match table.get(&request.grid_name) {
            Some(Value::Map(entry)) => entry,
            _ => {
                return Err(SetupError::Unsupported {
                    key: "PREDEF_GRID_NAME".to_string(),
                    value: request.grid_name.clone(),
                    supported: table.keys().cloned().collect(),
                })
            }
        };

        let mut params = Mapping::new();
        for (key, value) in entry {
            if key == QUILTING_SECTION {
                if let (true, Value::Map(wrtcmp)) = (request.quilting, value) {
                    params.extend(wrtcmp.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            } else if request.quilting || !key.starts_with("WRTCMP") {
                params.insert(key.clone(), value.clone());
            }
        }
        tracing::debug!(grid = %request.grid_name, params = params.len(), "loaded predefined grid");
        Ok(params)
    }

    fn grid_params(&self, request: &GridRequest) -> SetupResult<Mapping> {
        let params = match request {
            GridRequest::Esg(inputs) => esg_grid_params(inputs)?,
            GridRequest::Gfdl(inputs) => gfdl_grid_params(inputs)?,
        };
        Ok(to_mapping(params))
    }
}

fn to_mapping(params: GridParams) -> Mapping {
    params
        .into_iter()
        .map(|(key, param)| {
            let value = match param {
                Param::Int(i) => Value::Int(i),
                Param::Float(f) => Value::Float(f),
            };
            (key, value)
        })
        .collect()
}
