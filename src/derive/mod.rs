//! Derived parameters
//!
//! Grid geometry and physics-suite file mappings are computed by
//! collaborator crates. The rule catalog reaches them only through the two
//! capability traits below, so tests can substitute stubs.

pub mod cycles;
pub mod fixfiles;
pub mod grid;

pub use cycles::{cycle_strings, set_cycle_dates};
pub use fixfiles::{
    LinkRequest, OzoneMapping, OzoneRequest, SuiteFileMapper, ThompsonMapping, ThompsonRequest,
};
pub use grid::{GridRequest, PredefRequest, StandardGrids};

use std::path::Path;

use crate::error::SetupResult;
use crate::value::Mapping;

/// Source of grid parameters
pub trait GridParamProvider {
    /// Parameters of a named predefined grid.
    fn predefined(&self, request: &PredefRequest) -> SetupResult<Mapping>;

    /// Derived parameters of a generated grid.
    fn grid_params(&self, request: &GridRequest) -> SetupResult<Mapping>;
}

/// Physics-suite inspection and fixed-file linking
pub trait FixedFileMapper {
    /// Ozone parameterization and the updated cycle-directory mappings.
    fn ozone(&self, request: &OzoneRequest<'_>) -> SetupResult<OzoneMapping>;

    /// Whether the suite uses the RUC land-surface model.
    fn uses_ruc_lsm(&self, suite_file: &Path) -> SetupResult<bool>;

    /// Fixed files needed by Thompson microphysics, if the suite uses it.
    fn thompson(&self, request: &ThompsonRequest<'_>) -> SetupResult<ThompsonMapping>;

    /// Link a group of pregenerated files; returns their resolution.
    fn link_pregen(&self, request: &LinkRequest<'_>) -> SetupResult<u32>;
}
