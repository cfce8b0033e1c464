//! Forecast settings: time step, predefined grids, cycles and grid generation

use super::RuleContext;
use crate::derive::{cycle_strings, set_cycle_dates, GridRequest, PredefRequest};
use crate::error::{SetupError, SetupResult};
use crate::value::Value;

/// Physics suites that need a short time step whatever the grid resolution.
pub const HIRES_SUITES: &[&str] = &["FV3_RRFS_v1beta", "FV3_WoFS_v0", "FV3_HRRR"];

/// Largest time step, in seconds, allowed for [`HIRES_SUITES`].
pub const HIRES_DT_ATMOS_MAX: i64 = 40;

/// Forecast settings users commonly tune; a value of their own wins over
/// the predefined grid's.
const USER_TUNED: &[&str] = &["DT_ATMOS", "LAYOUT_X", "LAYOUT_Y", "BLOCKSIZE"];

pub(super) const FCST_MANDATORY: &[&str] = &[
    "task_run_fcst.DT_ATMOS",
    "task_run_fcst.LAYOUT_X",
    "task_run_fcst.LAYOUT_Y",
    "task_run_fcst.BLOCKSIZE",
];

fn is_hires_suite(ctx: &RuleContext<'_>) -> bool {
    let suite = ctx.doc.text("workflow.CCPP_PHYS_SUITE");
    HIRES_SUITES.contains(&suite.as_str())
}

pub(super) fn hires_dt_atmos(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if !is_hires_suite(ctx) {
        return Ok(());
    }
    let dt_atmos = ctx.doc.get("task_run_fcst.DT_ATMOS").and_then(Value::as_f64);
    if let Some(dt) = dt_atmos.filter(|dt| *dt > HIRES_DT_ATMOS_MAX as f64) {
        let suite = ctx.doc.text("workflow.CCPP_PHYS_SUITE");
        ctx.warn(format!(
            "CCPP suite {} requires a short time step regardless of grid resolution; \
             DT_ATMOS = {} may result in CFL violations or other errors",
            suite, dt
        ));
    }
    Ok(())
}

/// Whether the user already gave a usable value for a tuned setting.
fn user_supplied(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Int(_)) | Some(Value::Float(_)) => true,
        Some(Value::Str(s)) => !s.is_empty() && !s.contains("{{"),
        _ => false,
    }
}

pub(super) fn predef_grid(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let Some(grid_name) = ctx.doc.opt_text("workflow.PREDEF_GRID_NAME") else {
        return Ok(());
    };
    let request = PredefRequest {
        grid_name,
        quilting: ctx.doc.flag("task_run_fcst.QUILTING"),
    };
    let params = ctx.with.grids.predefined(&request)?;
    let hires = is_hires_suite(ctx);
    let suite = ctx.doc.text("workflow.CCPP_PHYS_SUITE");

    for (param, value) in params {
        if USER_TUNED.contains(&param.as_str()) {
            let path = format!("task_run_fcst.{}", param);
            if user_supplied(ctx.doc.get(&path)) {
                continue;
            }
            let too_long = value
                .as_f64()
                .map(|dt| dt > HIRES_DT_ATMOS_MAX as f64)
                .unwrap_or(false);
            if param == "DT_ATMOS" && hires && too_long {
                ctx.warn(format!(
                    "CCPP suite {} requires a short time step regardless of grid resolution; \
                     setting DT_ATMOS to {}. This value can be overwritten in the user config file",
                    suite, HIRES_DT_ATMOS_MAX
                ));
                ctx.doc.set(&path, HIRES_DT_ATMOS_MAX);
            } else {
                ctx.doc.set(&path, value);
            }
        } else if param.starts_with("WRTCMP") {
            ctx.doc.set(&format!("task_run_fcst.{}", param), value);
        } else if param == "GRID_GEN_METHOD" {
            ctx.doc.set("workflow.GRID_GEN_METHOD", value);
        } else {
            ctx.doc.set(&format!("task_make_grid.{}", param), value);
        }
    }
    Ok(())
}

pub(super) fn cycle_fcst_lengths(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    if ctx.doc.get("workflow.FCST_LEN_HRS").and_then(Value::as_i64) != Some(-1) {
        return Ok(());
    }
    let lengths = match ctx.doc.get("workflow.FCST_LEN_CYCL") {
        Some(Value::List(items)) => items.clone(),
        Some(v) if !v.is_null() => vec![v.clone()],
        _ => Vec::new(),
    };
    if lengths.is_empty() {
        return Err(ctx.fail("FCST_LEN_HRS = -1 requires a non-empty FCST_LEN_CYCL list"));
    }

    let first = ctx.doc.require_date("workflow.DATE_FIRST_CYCL")?;
    let last = ctx.doc.require_date("workflow.DATE_LAST_CYCL")?;
    let incr = ctx.doc.require_i64("workflow.INCR_CYCL_FREQ")?;
    let dates = set_cycle_dates(first, last, incr)?;

    let rem = dates.len() % lengths.len();
    if rem != 0 {
        return Err(ctx.fail(format!(
            "the number of cycle dates is not evenly divisible by the number of forecast lengths: \
             num_all_cdates = {}, num_fcst_len_cycl = {}, rem = {}",
            dates.len(),
            lengths.len(),
            rem
        )));
    }
    let repeated: Vec<Value> = lengths
        .iter()
        .cycle()
        .take(dates.len())
        .cloned()
        .collect();
    tracing::debug!(cycles = dates.len(), "expanded per-cycle forecast lengths");
    ctx.doc.set("workflow.FCST_LEN_CYCL", Value::List(repeated));
    ctx.doc.set("workflow.ALL_CDATES", cycle_strings(&dates));
    Ok(())
}

pub(super) fn grid_gen_method(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let request = GridRequest::from_document(&*ctx.doc)?;
    let params = ctx.with.grids.grid_params(&request)?;
    ctx.doc.root_mut().insert("grid_params".to_string(), Value::Map(params));
    Ok(())
}

pub(super) fn fcst_mandatory(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for path in FCST_MANDATORY {
        if !ctx.doc.flag(path) {
            let key = path.rsplit('.').next().unwrap_or(path);
            return Err(SetupError::MissingMandatory {
                key: key.to_string(),
                file: "the task_run_fcst section".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::run_rule;
    use crate::document::Document;
    use crate::error::{ErrorKind, SetupError};
    use crate::value::Value;
    use chrono::NaiveDate;

    #[test]
    fn test_hires_dt_atmos_only_for_hires_suites() {
        let mut doc = Document::default();
        doc.set("workflow.CCPP_PHYS_SUITE", "FV3_GFS_v16");
        doc.set("task_run_fcst.DT_ATMOS", 180i64);
        assert!(run_rule("hires_dt_atmos", &mut doc).unwrap().is_empty());

        doc.set("workflow.CCPP_PHYS_SUITE", "FV3_WoFS_v0");
        doc.set("task_run_fcst.DT_ATMOS", 40i64);
        assert!(run_rule("hires_dt_atmos", &mut doc).unwrap().is_empty());
    }

    #[test]
    fn test_predef_grid_requires_known_grid() {
        let mut doc = Document::default();
        doc.set("workflow.PREDEF_GRID_NAME", "NOT_A_GRID");
        let err = run_rule("predef_grid", &mut doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_predef_grid_skipped_without_name() {
        let mut doc = Document::default();
        doc.set("workflow.PREDEF_GRID_NAME", "");
        run_rule("predef_grid", &mut doc).unwrap();
        assert!(!doc.contains("task_make_grid"));
    }

    #[test]
    fn test_user_supplied_values() {
        assert!(super::user_supplied(Some(&Value::Int(30))));
        assert!(super::user_supplied(Some(&Value::Float(7.5))));
        assert!(super::user_supplied(Some(&Value::from("36"))));
        assert!(!super::user_supplied(Some(&Value::from(""))));
        assert!(!super::user_supplied(Some(&Value::from("{{ grid.dt }}"))));
        assert!(!super::user_supplied(Some(&Value::Null)));
        assert!(!super::user_supplied(None));
    }

    fn cycle_doc(lengths: Vec<Value>) -> Document {
        let day = |d| {
            NaiveDate::from_ymd_opt(2023, 6, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let mut doc = Document::default();
        doc.set("workflow.FCST_LEN_HRS", -1i64);
        doc.set("workflow.FCST_LEN_CYCL", Value::List(lengths));
        doc.set("workflow.DATE_FIRST_CYCL", day(1));
        doc.set("workflow.DATE_LAST_CYCL", day(2));
        doc.set("workflow.INCR_CYCL_FREQ", 6i64);
        doc
    }

    #[test]
    fn test_cycle_lengths_repeated() {
        // five cycles cannot take a two-entry pattern
        let mut doc = cycle_doc(vec![Value::Int(6), Value::Int(12)]);
        assert!(run_rule("cycle_fcst_lengths", &mut doc).is_err());

        let first = doc.get("workflow.DATE_FIRST_CYCL").cloned().unwrap();
        doc.set("workflow.DATE_LAST_CYCL", first);
        doc.set("workflow.INCR_CYCL_FREQ", 24i64);
        doc.set("workflow.FCST_LEN_CYCL", Value::List(vec![Value::Int(6)]));
        run_rule("cycle_fcst_lengths", &mut doc).unwrap();
        assert_eq!(doc.string_list("workflow.ALL_CDATES"), vec!["2023060100"]);
    }

    #[test]
    fn test_cycle_lengths_single_pattern_fills_every_cycle() {
        let mut doc = cycle_doc(vec![Value::Int(3)]);
        run_rule("cycle_fcst_lengths", &mut doc).unwrap();
        assert_eq!(doc.string_list("workflow.FCST_LEN_CYCL"), vec!["3"; 5]);
        assert_eq!(doc.string_list("workflow.ALL_CDATES").len(), 5);
    }

    #[test]
    fn test_cycle_lengths_pattern_repeats_in_order() {
        // 00, 08, 16 and 24 hours
        let mut doc = cycle_doc(vec![Value::Int(6), Value::Int(12)]);
        doc.set("workflow.INCR_CYCL_FREQ", 8i64);
        run_rule("cycle_fcst_lengths", &mut doc).unwrap();
        assert_eq!(
            doc.string_list("workflow.FCST_LEN_CYCL"),
            vec!["6", "12", "6", "12"]
        );
        assert_eq!(doc.string_list("workflow.ALL_CDATES").len(), 4);
    }

    #[test]
    fn test_cycle_lengths_huge_increment_is_an_error() {
        let mut doc = cycle_doc(vec![Value::Int(6)]);
        doc.set("workflow.INCR_CYCL_FREQ", i64::MAX / 2);
        let err = run_rule("cycle_fcst_lengths", &mut doc).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_cycle_lengths_ignored_for_fixed_length() {
        let mut doc = cycle_doc(vec![Value::Int(6), Value::Int(12)]);
        doc.set("workflow.FCST_LEN_HRS", 24i64);
        run_rule("cycle_fcst_lengths", &mut doc).unwrap();
        assert!(!doc.contains("workflow.ALL_CDATES"));
    }

    #[test]
    fn test_grid_gen_method_stores_params() {
        let mut doc = Document::default();
        doc.set("workflow.GRID_GEN_METHOD", "ESGgrid");
        for key in ["LON_CTR", "LAT_CTR", "PAZI", "DELX", "DELY"] {
            doc.set(&format!("task_make_grid.ESGgrid_{}", key), 1.0);
        }
        for key in ["NX", "NY", "WIDE_HALO_WIDTH"] {
            doc.set(&format!("task_make_grid.ESGgrid_{}", key), 10i64);
        }
        doc.set("constants.RADIUS_EARTH", 6371200.0);
        doc.set("constants.DEGS_PER_RADIAN", 57.29577951308232);
        run_rule("grid_gen_method", &mut doc).unwrap();
        assert_eq!(doc.get("grid_params.NHW"), Some(&Value::Int(6)));
    }

    #[test]
    fn test_grid_gen_method_unsupported() {
        let mut doc = Document::default();
        doc.set("workflow.GRID_GEN_METHOD", "Foo");
        let err = run_rule("grid_gen_method", &mut doc).unwrap_err();
        assert!(err.to_string().contains("GFDLgrid and ESGgrid"));
    }

    #[test]
    fn test_fcst_mandatory() {
        let mut doc = Document::default();
        doc.set("task_run_fcst.DT_ATMOS", 36i64);
        doc.set("task_run_fcst.LAYOUT_X", 5i64);
        doc.set("task_run_fcst.LAYOUT_Y", 2i64);
        doc.set("task_run_fcst.BLOCKSIZE", Value::Null);
        let err = run_rule("fcst_mandatory", &mut doc).unwrap_err();
        assert!(matches!(err, SetupError::MissingMandatory { ref key, .. } if key == "BLOCKSIZE"));

        doc.set("task_run_fcst.BLOCKSIZE", 40i64);
        run_rule("fcst_mandatory", &mut doc).unwrap();
    }
}
