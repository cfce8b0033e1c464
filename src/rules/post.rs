//! Post-processing checks

use std::path::Path;

use super::RuleContext;
use crate::error::{SetupError, SetupResult};
use crate::value::Value;

/// A configured path that must exist when `flag` is on. A null path and a
/// missing path are reported differently.
fn require_configured_path(
    ctx: &RuleContext<'_>,
    flag: &str,
    key: &str,
    what: &str,
) -> SetupResult<()> {
    if !ctx.doc.flag(flag) {
        return Ok(());
    }
    let short = |path: &str| path.rsplit('.').next().unwrap_or(path).to_string();
    match ctx.doc.get(key) {
        None | Some(Value::Null) => Err(SetupError::NullPath {
            flag: short(flag),
            key: short(key),
        }),
        Some(value) => {
            let path = value.to_string();
            if Path::new(&path).exists() {
                Ok(())
            } else {
                Err(SetupError::NotFound {
                    what: what.to_string(),
                    key: short(key),
                    path: path.into(),
                })
            }
        }
    }
}

pub(super) fn custom_post_config(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    require_configured_path(
        ctx,
        "task_run_post.USE_CUSTOM_POST_CONFIG_FILE",
        "task_run_post.CUSTOM_POST_CONFIG_FP",
        "custom post configuration file",
    )
}

pub(super) fn crtm_dir(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    require_configured_path(
        ctx,
        "global.USE_CRTM",
        "global.CRTM_DIR",
        "external CRTM fix file directory",
    )
}

pub(super) fn subhourly_post(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !ctx.doc.flag("task_run_post.SUB_HOURLY_POST") {
        return Ok(());
    }
    let mnts = ctx.doc.require_i64("task_run_post.DT_SUBHOURLY_POST_MNTS")?;
    if mnts == 0 {
        ctx.warn(
            "DT_SUBHOURLY_POST_MNTS = 0 while SUB_HOURLY_POST is on, so no sub-hourly output \
             would be produced; resetting SUB_HOURLY_POST to FALSE",
        );
        ctx.doc.set("task_run_post.SUB_HOURLY_POST", false);
        return Ok(());
    }
    if !(1..=59).contains(&mnts) {
        return Err(ctx.fail(format!(
            "when SUB_HOURLY_POST is on, DT_SUBHOURLY_POST_MNTS must be an integer between 1 \
             and 59 inclusive, but DT_SUBHOURLY_POST_MNTS = {}",
            mnts
        )));
    }
    let dt_atmos = ctx.doc.require_i64("task_run_fcst.DT_ATMOS")?;
    if dt_atmos <= 0 {
        return Err(ctx.fail(format!("DT_ATMOS must be positive, got {}", dt_atmos)));
    }
    let rem = (mnts * 60) % dt_atmos;
    if rem != 0 {
        return Err(ctx.fail(format!(
            "the sub-hourly post interval in seconds must be evenly divisible by the forecast \
             time step: DT_SUBHOURLY_POST_MNTS = {}, DT_ATMOS = {}, \
             remainder = (DT_SUBHOURLY_POST_MNTS*60) % DT_ATMOS = {}",
            mnts, dt_atmos, rem
        )));
    }
    Ok(())
}

pub(super) fn post_domain_name(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let name = match ctx.doc.get("task_run_post.POST_OUTPUT_DOMAIN_NAME") {
        Some(v) if v.truthy() => v.clone(),
        _ => match ctx.doc.get("workflow.PREDEF_GRID_NAME") {
            Some(v) if v.truthy() => v.clone(),
            _ => {
                return Err(ctx.fail(
                    "the domain name used in naming the run_post output files \
                     (POST_OUTPUT_DOMAIN_NAME) has not been set; when not using a predefined \
                     grid it must be set in the user config file",
                ))
            }
        },
    };
    let name = match name {
        Value::Int(_) => name,
        other => Value::Str(other.to_string().to_lowercase()),
    };
    ctx.doc.set("task_run_post.POST_OUTPUT_DOMAIN_NAME", name);
    Ok(())
}
