//! Extended Schmidt Gnomonic (ESG) grid parameters

use crate::{round_to, GridError, GridParams, Param};

/// Stretch factor reported for ESG grids. The ESG generator ignores it, but
/// downstream namelists require a value other than 1.
pub const ESG_STRETCH_FAC: f64 = 0.999;

/// Inputs for an ESG regional grid
#[derive(Debug, Clone, PartialEq)]
pub struct EsgInputs {
    pub lon_ctr: f64,
    pub lat_ctr: f64,
    pub nx: i64,
    pub ny: i64,
    pub pazi: f64,
    pub halo_width: i64,
    /// Cell size in the x direction, meters
    pub delx: f64,
    /// Cell size in the y direction, meters
    pub dely: f64,
    pub radius_earth: f64,
    pub degs_per_radian: f64,
}

/// Compute the derived parameters of an ESG grid.
pub fn esg_grid_params(inputs: &EsgInputs) -> Result<GridParams, GridError> {
    positive_count("ESGgrid_NX", inputs.nx)?;
    positive_count("ESGgrid_NY", inputs.ny)?;
    if inputs.halo_width < 0 {
        return Err(GridError::InvalidInput {
            name: "ESGgrid_WIDE_HALO_WIDTH",
            value: inputs.halo_width.to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    positive_length("ESGgrid_DELX", inputs.delx)?;
    positive_length("ESGgrid_DELY", inputs.dely)?;
    positive_length("RADIUS_EARTH", inputs.radius_earth)?;

    // Angular size of a supergrid cell (half a grid cell), in degrees.
    let del_angle_x_sg =
        round_to(inputs.delx / (2.0 * inputs.radius_earth) * inputs.degs_per_radian, 10);
    let del_angle_y_sg =
        round_to(inputs.dely / (2.0 * inputs.radius_earth) * inputs.degs_per_radian, 10);

    let neg_nx_of_dom_with_wide_halo = -(inputs.nx + 2 * inputs.halo_width);
    let neg_ny_of_dom_with_wide_halo = -(inputs.ny + 2 * inputs.halo_width);

    let mut params = GridParams::new();
    params.insert("LON_CTR".into(), Param::Float(inputs.lon_ctr));
    params.insert("LAT_CTR".into(), Param::Float(inputs.lat_ctr));
    params.insert("NX".into(), Param::Int(inputs.nx));
    params.insert("NY".into(), Param::Int(inputs.ny));
    params.insert("PAZI".into(), Param::Float(inputs.pazi));
    params.insert("NHW".into(), Param::Int(inputs.halo_width));
    params.insert("STRETCH_FAC".into(), Param::Float(ESG_STRETCH_FAC));
    params.insert("DEL_ANGLE_X_SG".into(), Param::Float(del_angle_x_sg));
    params.insert("DEL_ANGLE_Y_SG".into(), Param::Float(del_angle_y_sg));
    params.insert(
        "NEG_NX_OF_DOM_WITH_WIDE_HALO".into(),
        Param::Int(neg_nx_of_dom_with_wide_halo),
    );
    params.insert(
        "NEG_NY_OF_DOM_WITH_WIDE_HALO".into(),
        Param::Int(neg_ny_of_dom_with_wide_halo),
    );
    Ok(params)
}

fn positive_count(name: &'static str, value: i64) -> Result<(), GridError> {
    if value <= 0 {
        return Err(GridError::InvalidInput {
            name,
            value: value.to_string(),
            reason: "must be a positive cell count".to_string(),
        });
    }
    Ok(())
}

fn positive_length(name: &'static str, value: f64) -> Result<(), GridError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(GridError::InvalidInput {
            name,
            value: value.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}
