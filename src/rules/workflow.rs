//! Workflow-level rules

use std::path::PathBuf;

use super::RuleContext;
use crate::config::LayerOrigin;
use crate::error::{SetupError, SetupResult};
use crate::paths::handle_preexisting_dir;

/// Leaf settings the user or machine file must provide.
pub(super) const MANDATORY_LEAVES: &[&str] = &[
    "EXPT_SUBDIR",
    "NCORES_PER_NODE",
    "FIXgsm",
    "FIXaer",
    "FIXlut",
    "FIXorg",
    "FIXsfc",
];

/// Forecast length limit; the hour field of output names has three digits.
pub const FCST_LEN_HRS_MAX: i64 = 999;

pub(super) fn mandatory_leaves(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for key in MANDATORY_LEAVES {
        let set = ctx.doc.find_leaf(key).map(|v| v.truthy()).unwrap_or(false);
        if !set {
            return Err(SetupError::MissingMandatory {
                key: key.to_string(),
                file: format!(
                    "user config file {} or machine file {}",
                    ctx.source_path(LayerOrigin::User).display(),
                    ctx.source_path(LayerOrigin::Machine).display()
                ),
            });
        }
    }
    Ok(())
}

pub(super) fn workflow_id(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let id = format!("id_{}", ctx.with.started_at);
    tracing::info!(workflow_id = %id, "assigned workflow id");
    ctx.doc.set("workflow.WORKFLOW_ID", id);

    if ctx.doc.flag("workflow.DEBUG") {
        tracing::info!("setting VERBOSE because DEBUG is set");
        ctx.doc.set("workflow.VERBOSE", true);
    }
    Ok(())
}

pub(super) fn fcst_len_max(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let fcst_len_hrs = ctx.doc.require_i64("workflow.FCST_LEN_HRS")?;
    if fcst_len_hrs > FCST_LEN_HRS_MAX {
        return Err(ctx.fail(format!(
            "forecast length is greater than the maximum allowed: FCST_LEN_HRS = {}, maximum = {}",
            fcst_len_hrs, FCST_LEN_HRS_MAX
        )));
    }
    Ok(())
}

pub(super) fn preexisting_exptdir(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let Some(exptdir) = ctx.doc.opt_text("workflow.EXPTDIR") else {
        return Ok(());
    };
    let method = ctx.doc.text("workflow.PREEXISTING_DIR_METHOD");
    if let Some(done) = handle_preexisting_dir(&PathBuf::from(&exptdir), &method)? {
        ctx.warn(done);
    }
    Ok(())
}

pub(super) fn crontab_line(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !ctx.doc.flag("workflow.USE_CRON_TO_RELAUNCH") {
        return Ok(());
    }
    let line = format!(
        "*/{} * * * * cd {} && ./{} called_from_cron=\"TRUE\" >> ./{} 2>&1",
        ctx.doc.text("workflow.CRON_RELAUNCH_INTVL_MNTS"),
        ctx.doc.text("workflow.EXPTDIR"),
        ctx.doc.text("workflow.WFLOW_LAUNCH_SCRIPT_FN"),
        ctx.doc.text("workflow.WFLOW_LAUNCH_LOG_FN"),
    );
    ctx.doc.set("workflow.CRONTAB_LINE", line);
    Ok(())
}

pub(super) fn pregen_basedir(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let make_grid = ctx.doc.flag("workflow_switches.RUN_TASK_MAKE_GRID");
    let make_orog = ctx.doc.flag("workflow_switches.RUN_TASK_MAKE_OROG");
    let make_sfc_climo = ctx.doc.flag("workflow_switches.RUN_TASK_MAKE_SFC_CLIMO");
    let basedir_set = ctx
        .doc
        .get("platform.DOMAIN_PREGEN_BASEDIR")
        .map(|v| !v.is_null())
        .unwrap_or(false);
    if !basedir_set && !(make_grid && make_orog && make_sfc_climo) {
        return Err(ctx.fail(format!(
            "DOMAIN_PREGEN_BASEDIR must be set when any of the following tasks are turned off: \
             RUN_TASK_MAKE_GRID = {}, RUN_TASK_MAKE_OROG = {}, RUN_TASK_MAKE_SFC_CLIMO = {}",
            make_grid, make_orog, make_sfc_climo
        )));
    }
    Ok(())
}

pub(super) fn account(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let manager = match ctx.doc.get("platform.WORKFLOW_MANAGER") {
        Some(v) if !v.is_null() => v.to_string(),
        _ => return Ok(()),
    };
    if !ctx.doc.flag("user.ACCOUNT") {
        return Err(ctx.fail(format!(
            "ACCOUNT must be specified in the config or machine file when using a workflow manager \
             (WORKFLOW_MANAGER = {})",
            manager
        )));
    }
    Ok(())
}
