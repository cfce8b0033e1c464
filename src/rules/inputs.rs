//! Forecast model inputs: suite files, fixed-file mappings and pregenerated files
//!
//! Most of these rules consult the physics suite definition file through
//! the [`FixedFileMapper`](crate::derive::FixedFileMapper) collaborator and
//! fold the result back into the `fixed_files` section.

use std::path::{Path, PathBuf};

use fcst_fixfiles::FileGroup;

use super::RuleContext;
use crate::derive::{LinkRequest, OzoneRequest, ThompsonRequest};
use crate::error::{SetupError, SetupResult};
use crate::paths::create_dir;
use crate::value::Value;

const SUITE_FP: &str = "workflow.CCPP_PHYS_SUITE_IN_CCPP_FP";
const FIXAM_FILES: &str = "fixed_files.FIXgsm_FILES_TO_COPY_TO_FIXam";
const CYCLEDIR_MAPPING: &str = "fixed_files.CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING";

/// External models whose initial and boundary data already carry the
/// aerosol climatology used by Thompson microphysics.
const THOMPSON_CLIMO_SOURCES: &[&str] = &["HRRR", "RAP"];

fn suite_file(ctx: &RuleContext<'_>) -> PathBuf {
    PathBuf::from(ctx.doc.text(SUITE_FP))
}

pub(super) fn model_input_files(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for (key, what) in [
        ("CCPP_PHYS_SUITE_IN_CCPP_FP", "CCPP suite definition file"),
        ("FIELD_DICT_IN_UWM_FP", "field dictionary file"),
    ] {
        let path = PathBuf::from(ctx.doc.text(&format!("workflow.{}", key)));
        if !path.exists() {
            return Err(SetupError::NotFound {
                what: format!("{} in the local clone of the forecast model", what),
                key: key.to_string(),
                path,
            });
        }
    }
    Ok(())
}

pub(super) fn ozone_mapping(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let suite = suite_file(ctx);
    let mappings = ctx.doc.string_list(CYCLEDIR_MAPPING);
    let ozone = ctx.with.fixed_files.ozone(&OzoneRequest {
        suite_file: &suite,
        link_mappings: &mappings,
    })?;

    let mut fix_files = ctx.doc.string_list(FIXAM_FILES);
    match fix_files.last_mut() {
        Some(last) => *last = ozone.fixgsm_ozone_fn.clone(),
        None => fix_files.push(ozone.fixgsm_ozone_fn.clone()),
    }
    ctx.doc.set(FIXAM_FILES, fix_files);
    ctx.doc.set(CYCLEDIR_MAPPING, ozone.link_mappings.clone());

    tracing::info!(ozone_param = %ozone.ozone_param, "ozone parameterization for this experiment");
    tracing::debug!(mappings = ?ozone.link_mappings, "updated cycle directory links");
    Ok(())
}

pub(super) fn ensemble_vx(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let do_ensemble = ctx.doc.flag("global.DO_ENSEMBLE");
    let ensgrid = ctx.doc.flag("workflow_switches.RUN_TASK_VX_ENSGRID");
    let enspoint = ctx.doc.flag("workflow_switches.RUN_TASK_VX_ENSPOINT");
    if !do_ensemble && (ensgrid || enspoint) {
        return Err(ctx.fail(format!(
            "ensemble verification can not be run unless running in ensemble mode: \
             DO_ENSEMBLE = {}, RUN_TASK_VX_ENSGRID = {}, RUN_TASK_VX_ENSPOINT = {}",
            do_ensemble, ensgrid, enspoint
        )));
    }
    Ok(())
}

/// Whether pregenerated files of each group are linked instead of made.
///
/// A group is linked when its own task is off but a task that reads its
/// files is on.
fn groups_to_link(ctx: &RuleContext<'_>) -> Vec<FileGroup> {
    let on = |task: &str| ctx.doc.flag(&format!("workflow_switches.RUN_TASK_{}", task));
    let ics_lbcs = on("MAKE_ICS") || on("MAKE_LBCS");
    let needs_orog = on("MAKE_SFC_CLIMO") || ics_lbcs || on("RUN_FCST");
    let needs_grid = on("MAKE_OROG") || needs_orog;

    let mut groups = Vec::new();
    if !on("MAKE_GRID") && needs_grid {
        groups.push(FileGroup::Grid);
    }
    if !on("MAKE_OROG") && needs_orog {
        groups.push(FileGroup::Orog);
    }
    if !on("MAKE_SFC_CLIMO") && ics_lbcs {
        groups.push(FileGroup::SfcClimo);
    }
    groups
}

pub(super) fn pregen_links(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let fixlam = PathBuf::from(ctx.doc.text("workflow.FIXlam"));
    create_dir(&fixlam)?;

    let mut resolution: Option<u32> = None;
    for group in groups_to_link(ctx) {
        let upper = group.as_str().to_uppercase();
        let dir_path = format!("task_make_{}.{}_DIR", group.as_str(), upper);
        let source_dir = match ctx.doc.opt_text(&dir_path) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let dir = Path::new(&ctx.doc.text("platform.DOMAIN_PREGEN_BASEDIR"))
                    .join(ctx.doc.text("workflow.PREDEF_GRID_NAME"));
                ctx.warn(format!(
                    "{}_DIR will point to a location containing pregenerated files: {}",
                    upper,
                    dir.display()
                ));
                ctx.doc.set(&dir_path, dir.display().to_string());
                dir
            }
        };
        if !source_dir.exists() {
            return Err(SetupError::NotFound {
                what: format!("directory of pregenerated {} files", group.as_str()),
                key: format!("{}_DIR", upper),
                path: source_dir,
            });
        }

        let sfc_climo_fields = ctx.doc.string_list("fixed_files.SFC_CLIMO_FIELDS");
        let dot_or_uscore = ctx.doc.text("workflow.DOT_OR_USCORE");
        let request = LinkRequest {
            group,
            source_dir: &source_dir,
            target_dir: &fixlam,
            dot_or_uscore: &dot_or_uscore,
            nhw: ctx.doc.require_i64("grid_params.NHW")?,
            nh0: ctx.doc.require_i64("constants.NH0")?,
            nh3: ctx.doc.require_i64("constants.NH3")?,
            nh4: ctx.doc.require_i64("constants.NH4")?,
            tile_rgnl: ctx.doc.require_i64("constants.TILE_RGNL")?,
            sfc_climo_fields: &sfc_climo_fields,
        };
        let res = ctx.with.fixed_files.link_pregen(&request)?;
        tracing::debug!(group = group.as_str(), res, dir = %source_dir.display(), "linked pregenerated files");

        match resolution {
            None => resolution = Some(res),
            Some(expected) if expected != res => {
                return Err(ctx.fail(format!(
                    "the resolution of the pregenerated {} files does not match the files \
                     already linked: resolution in {} = {}, resolution expected = {}",
                    group.as_str(),
                    upper,
                    res,
                    expected
                )));
            }
            Some(_) => {}
        }
    }

    match resolution {
        Some(res) => {
            ctx.doc.set("workflow.RES_IN_FIXLAM_FILENAMES", res as i64);
            ctx.doc.set("workflow.CRES", format!("C{}", res));
        }
        None => {
            ctx.doc.set("workflow.RES_IN_FIXLAM_FILENAMES", Value::Null);
            ctx.doc.set("workflow.CRES", "");
        }
    }
    Ok(())
}

pub(super) fn inline_post(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !ctx.doc.flag("task_run_fcst.WRITE_DOPOST") {
        return Ok(());
    }
    if ctx.doc.flag("workflow_switches.RUN_TASK_RUN_POST") {
        ctx.warn("inline post is turned on, deactivating post-processing tasks: RUN_TASK_RUN_POST = FALSE");
        ctx.doc.set("workflow_switches.RUN_TASK_RUN_POST", false);
    }
    if ctx.doc.flag("task_run_post.SUB_HOURLY_POST") {
        return Err(ctx.fail("SUB_HOURLY_POST is not available with inline post (WRITE_DOPOST)"));
    }
    Ok(())
}

pub(super) fn ruc_lsm(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let suite = suite_file(ctx);
    let uses_ruc = ctx.with.fixed_files.uses_ruc_lsm(&suite)?;
    ctx.doc.set("workflow.SDF_USES_RUC_LSM", uses_ruc);
    Ok(())
}

pub(super) fn thompson_mp(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let from_climo_source = |path: &str| THOMPSON_CLIMO_SOURCES.contains(&ctx.doc.text(path).as_str());
    let link_climo = !from_climo_source("task_get_extrn_ics.EXTRN_MDL_NAME_ICS")
        || !from_climo_source("task_get_extrn_lbcs.EXTRN_MDL_NAME_LBCS");

    let suite = suite_file(ctx);
    let climo_fn = ctx.doc.text("workflow.THOMPSON_MP_CLIMO_FN");
    let thompson = ctx.with.fixed_files.thompson(&ThompsonRequest {
        suite_file: &suite,
        climo_fn: &climo_fn,
        link_climo,
    })?;
    ctx.doc.set("workflow.SDF_USES_THOMPSON_MP", thompson.uses_thompson);
    if !thompson.uses_thompson {
        return Ok(());
    }

    let mut mappings = ctx.doc.string_list(CYCLEDIR_MAPPING);
    mappings.extend(thompson.mappings);
    let mut fix_files = ctx.doc.string_list(FIXAM_FILES);
    fix_files.extend(thompson.fix_files);
    tracing::info!(
        suite = %ctx.doc.text("workflow.CCPP_PHYS_SUITE"),
        "suite uses Thompson microphysics; appended its fixed files and links"
    );
    tracing::debug!(fix_files = ?fix_files, mappings = ?mappings, "Thompson fixed files");
    ctx.doc.set(CYCLEDIR_MAPPING, mappings);
    ctx.doc.set(FIXAM_FILES, fix_files);
    Ok(())
}
