//! GFDL-style regional grid parameters
//!
//! The regional domain ("tile 7") is a refined subregion of tile 6 of the
//! parent cubed-sphere grid. Its extent is given in tile-6 cell indices
//! (1-based, inclusive). The grid generator works on the supergrid, which
//! has twice the resolution of the grid, so the returned start/end indices
//! are supergrid indices including the wide halo.

use crate::{GridError, GridParams, Param};

/// Inputs for a GFDL regional grid
#[derive(Debug, Clone, PartialEq)]
pub struct GfdlInputs {
    pub lon_t6_ctr: f64,
    pub lat_t6_ctr: f64,
    /// Number of cells along each edge of tile 6
    pub num_cells: i64,
    pub stretch_fac: f64,
    /// Refinement ratio of tile 7 relative to tile 6
    pub refine_ratio: i64,
    pub istart_on_t6g: i64,
    pub iend_on_t6g: i64,
    pub jstart_on_t6g: i64,
    pub jend_on_t6g: i64,
    /// Width of the 4-cell halo used by the model (normally 4)
    pub nh4: i64,
}

/// Compute the derived parameters of a GFDL regional grid.
pub fn gfdl_grid_params(inputs: &GfdlInputs) -> Result<GridParams, GridError> {
    if inputs.num_cells <= 0 {
        return Err(invalid("GFDLgrid_NUM_CELLS", inputs.num_cells, "must be positive"));
    }
    if inputs.refine_ratio < 1 {
        return Err(invalid("GFDLgrid_REFINE_RATIO", inputs.refine_ratio, "must be at least 1"));
    }
    if !(inputs.stretch_fac.is_finite() && inputs.stretch_fac > 0.0) {
        return Err(GridError::InvalidInput {
            name: "GFDLgrid_STRETCH_FAC",
            value: inputs.stretch_fac.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    check_extent(
        "GFDLgrid_ISTART_OF_RGNL_DOM_ON_T6G",
        "GFDLgrid_IEND_OF_RGNL_DOM_ON_T6G",
        inputs.istart_on_t6g,
        inputs.iend_on_t6g,
        inputs.num_cells,
    )?;
    check_extent(
        "GFDLgrid_JSTART_OF_RGNL_DOM_ON_T6G",
        "GFDLgrid_JEND_OF_RGNL_DOM_ON_T6G",
        inputs.jstart_on_t6g,
        inputs.jend_on_t6g,
        inputs.num_cells,
    )?;

    let nx_of_t7_on_t6g = inputs.iend_on_t6g - inputs.istart_on_t6g + 1;
    let ny_of_t7_on_t6g = inputs.jend_on_t6g - inputs.jstart_on_t6g + 1;
    let nx_of_t7_on_t7g = nx_of_t7_on_t6g * inputs.refine_ratio;
    let ny_of_t7_on_t7g = ny_of_t7_on_t6g * inputs.refine_ratio;

    // Wide halo on tile 7, and the number of tile-6 cells it covers.
    let halo_width_on_t7g = inputs.nh4 + 1;
    let halo_width_on_t6g = (halo_width_on_t7g - 1) / inputs.refine_ratio + 1;

    let istart_with_halo = inputs.istart_on_t6g - halo_width_on_t6g;
    let iend_with_halo = inputs.iend_on_t6g + halo_width_on_t6g;
    let jstart_with_halo = inputs.jstart_on_t6g - halo_width_on_t6g;
    let jend_with_halo = inputs.jend_on_t6g + halo_width_on_t6g;

    for (name, index) in [
        ("i start", istart_with_halo),
        ("i end", iend_with_halo),
        ("j start", jstart_with_halo),
        ("j end", jend_with_halo),
    ] {
        if index < 1 || index > inputs.num_cells {
            return Err(GridError::HaloOutOfBounds(format!(
                "{} index with halo = {} (halo width on tile 6 = {}, tile 6 has {} cells)",
                name, index, halo_width_on_t6g, inputs.num_cells
            )));
        }
    }

    // Supergrid indices: cell n on the grid spans supergrid cells 2n-1 and 2n.
    let istart_on_t6sg = 2 * istart_with_halo - 1;
    let iend_on_t6sg = 2 * iend_with_halo;
    let jstart_on_t6sg = 2 * jstart_with_halo - 1;
    let jend_on_t6sg = 2 * jend_with_halo;

    let mut params = GridParams::new();
    params.insert("LON_CTR".into(), Param::Float(inputs.lon_t6_ctr));
    params.insert("LAT_CTR".into(), Param::Float(inputs.lat_t6_ctr));
    params.insert("NX".into(), Param::Int(nx_of_t7_on_t7g));
    params.insert("NY".into(), Param::Int(ny_of_t7_on_t7g));
    params.insert("NHW".into(), Param::Int(halo_width_on_t7g));
    params.insert("STRETCH_FAC".into(), Param::Float(inputs.stretch_fac));
    params.insert(
        "ISTART_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG".into(),
        Param::Int(istart_on_t6sg),
    );
    params.insert(
        "IEND_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG".into(),
        Param::Int(iend_on_t6sg),
    );
    params.insert(
        "JSTART_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG".into(),
        Param::Int(jstart_on_t6sg),
    );
    params.insert(
        "JEND_OF_RGNL_DOM_WITH_WIDE_HALO_ON_T6SG".into(),
        Param::Int(jend_on_t6sg),
    );
    Ok(params)
}

fn check_extent(
    start_name: &'static str,
    end_name: &'static str,
    start: i64,
    end: i64,
    num_cells: i64,
) -> Result<(), GridError> {
    if start < 1 || start > num_cells {
        return Err(invalid(start_name, start, &format!("must be in [1, {}]", num_cells)));
    }
    if end < start || end > num_cells {
        return Err(invalid(
            end_name,
            end,
            &format!("must be in [{}, {}]", start, num_cells),
        ));
    }
    Ok(())
}

fn invalid(name: &'static str, value: i64, reason: &str) -> GridError {
    GridError::InvalidInput {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
