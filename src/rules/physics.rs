//! Stochastic physics and lateral boundary update checks

use super::RuleContext;
use crate::error::SetupResult;
use crate::value::Value;

/// Magnitude that turns an ad-hoc stochastic scheme off in the model namelist.
pub const DISABLED_MAG: f64 = -999.0;

/// `(switch, magnitude)` of each ad-hoc stochastic scheme
const ADHOC_SCHEMES: [(&str, &str); 3] = [
    ("global.DO_SHUM", "global.SHUM_MAG"),
    ("global.DO_SKEB", "global.SKEB_MAG"),
    ("global.DO_SPPT", "global.SPPT_MAG"),
];

/// Per-variable SPP settings that must match `SPP_VAR_LIST` in length.
const SPP_VARS: &[&str] = &[
    "SPP_MAG_LIST",
    "SPP_LSCALE",
    "SPP_TSCALE",
    "SPP_SIGTOP1",
    "SPP_SIGTOP2",
    "SPP_STDDEV_CUTOFF",
    "ISEED_SPP",
];

/// Per-variable land-surface SPP settings that must match `LSM_SPP_VAR_LIST`.
const LSM_SPP_VARS: &[&str] = &["LSM_SPP_MAG_LIST", "LSM_SPP_LSCALE", "LSM_SPP_TSCALE"];

/// Land perturbation type and cycling interval used with land-surface SPP
const LNDP_TYPE: i64 = 2;
const FHCYC_LSM_SPP: i64 = 999;

pub(super) fn stochastic_sentinels(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for (switch, mag) in ADHOC_SCHEMES {
        if !ctx.doc.flag(switch) {
            ctx.doc.set(mag, DISABLED_MAG);
        }
    }
    Ok(())
}

fn list_len(ctx: &RuleContext<'_>, key: &str) -> usize {
    ctx.doc
        .get(&format!("global.{}", key))
        .map(Value::list_len)
        .unwrap_or(0)
}

/// Every setting in `vars` must have `expected` entries.
fn check_lengths(
    ctx: &RuleContext<'_>,
    list_key: &str,
    expected: usize,
    vars: &[&str],
) -> SetupResult<()> {
    for var in vars {
        let len = list_len(ctx, var);
        if len != expected {
            return Err(ctx.fail(format!(
                "all SPP-related namelist variables must be of equal length to {}: \
                 {} (length {}), {} (length {})",
                list_key, list_key, expected, var, len
            )));
        }
    }
    Ok(())
}

pub(super) fn spp_lengths(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !ctx.doc.flag("global.DO_SPP") {
        ctx.doc.set("global.N_VAR_SPP", 0i64);
        return Ok(());
    }
    let n_var_spp = list_len(ctx, "SPP_VAR_LIST");
    ctx.doc.set("global.N_VAR_SPP", n_var_spp as i64);
    check_lengths(ctx, "SPP_VAR_LIST", n_var_spp, SPP_VARS)
}

pub(super) fn lsm_spp_lengths(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !ctx.doc.flag("global.DO_LSM_SPP") {
        for key in ["N_VAR_LNDP", "LNDP_TYPE", "LNDP_MODEL_TYPE", "FHCYC_LSM_SPP_OR_NOT"] {
            ctx.doc.set(&format!("global.{}", key), 0i64);
        }
        return Ok(());
    }
    let n_var_lndp = list_len(ctx, "LSM_SPP_VAR_LIST");
    ctx.doc.set("global.N_VAR_LNDP", n_var_lndp as i64);
    ctx.doc.set("global.LNDP_TYPE", LNDP_TYPE);
    ctx.doc.set("global.LNDP_MODEL_TYPE", LNDP_TYPE);
    ctx.doc.set("global.FHCYC_LSM_SPP_OR_NOT", FHCYC_LSM_SPP);
    check_lengths(ctx, "LSM_SPP_VAR_LIST", n_var_lndp, LSM_SPP_VARS)
}

pub(super) fn lbc_divisibility(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let fcst_len_hrs = ctx.doc.require_i64("workflow.FCST_LEN_HRS")?;
    let intvl = ctx.doc.require_i64("task_get_extrn_lbcs.LBC_SPEC_INTVL_HRS")?;
    if intvl <= 0 {
        return Err(ctx.fail(format!(
            "the lateral boundary conditions update interval must be positive: \
             LBC_SPEC_INTVL_HRS = {}",
            intvl
        )));
    }
    let rem = fcst_len_hrs % intvl;
    if fcst_len_hrs > 0 && rem != 0 {
        return Err(ctx.fail(format!(
            "the forecast length (FCST_LEN_HRS) is not evenly divisible by the lateral boundary \
             conditions update interval (LBC_SPEC_INTVL_HRS): FCST_LEN_HRS = {}, \
             LBC_SPEC_INTVL_HRS = {}, rem = {}",
            fcst_len_hrs, intvl, rem
        )));
    }
    Ok(())
}
