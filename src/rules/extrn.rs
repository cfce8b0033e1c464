//! External model data locations

use std::path::Path;

use super::RuleContext;
use crate::error::{SetupError, SetupResult};
use crate::paths::truncate_at_template;
use crate::value::Value;

/// `(section, suffix)` of the initial and lateral boundary condition tasks
const EXTRN_TASKS: [(&str, &str); 2] = [
    ("task_get_extrn_ics", "ICS"),
    ("task_get_extrn_lbcs", "LBCS"),
];

/// Platform location of a model's data from the `data.ics_lbcs` table.
///
/// Entries are either a path or a mapping from file format to path.
fn sysbasedir(table: Option<&Value>, model: &str, file_fmt: &str) -> Value {
    let Some(entry) = table.and_then(Value::as_map).and_then(|t| t.get(model)) else {
        return Value::Str(String::new());
    };
    match entry {
        Value::Map(by_fmt) => by_fmt
            .get(file_fmt)
            .cloned()
            .unwrap_or_else(|| Value::Str(String::new())),
        other => other.clone(),
    }
}

pub(super) fn extrn_sysbasedir(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for (section, suffix) in EXTRN_TASKS {
        let model = ctx.doc.text(&format!("{}.EXTRN_MDL_NAME_{}", section, suffix));
        let file_fmt = ctx.doc.text(&format!("{}.FV3GFS_FILE_FMT_{}", section, suffix));
        let location = sysbasedir(ctx.doc.get("data.ics_lbcs"), &model, &file_fmt);
        tracing::debug!(model = %model, location = %location, "external model data location");
        ctx.doc
            .set(&format!("{}.EXTRN_MDL_SYSBASEDIR_{}", section, suffix), location);
    }
    ctx.doc.root_mut().remove("data");
    Ok(())
}

pub(super) fn staged_extrn_dirs(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    for (section, suffix) in EXTRN_TASKS {
        if !ctx.doc.flag(&format!("{}.USE_USER_STAGED_EXTRN_FILES", section)) {
            continue;
        }
        let key = format!("EXTRN_MDL_SOURCE_BASEDIR_{}", suffix);
        let basedir = ctx.doc.text(&format!("{}.{}", section, key));
        let fixed_part = truncate_at_template(&basedir);
        if !Path::new(fixed_part).exists() {
            return Err(SetupError::NotFound {
                what: "user-staged external model data directory".to_string(),
                key,
                path: basedir.into(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::run_rule;
    use crate::document::Document;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn data_doc() -> Document {
        let mut doc = Document::default();
        doc.set("task_get_extrn_ics.EXTRN_MDL_NAME_ICS", "FV3GFS");
        doc.set("task_get_extrn_ics.FV3GFS_FILE_FMT_ICS", "grib2");
        doc.set("task_get_extrn_lbcs.EXTRN_MDL_NAME_LBCS", "RAP");
        doc.set("task_get_extrn_lbcs.FV3GFS_FILE_FMT_LBCS", "grib2");
        doc.set("data.ics_lbcs.FV3GFS.nemsio", "/data/gfs/nemsio");
        doc.set("data.ics_lbcs.FV3GFS.grib2", "/data/gfs/grib2");
        doc.set("data.ics_lbcs.HRRR", "/data/hrrr");
        doc
    }

    #[test]
    fn test_sysbasedir_by_format_and_missing_model() {
        let mut doc = data_doc();
        run_rule("extrn_sysbasedir", &mut doc).unwrap();
        assert_eq!(
            doc.text("task_get_extrn_ics.EXTRN_MDL_SYSBASEDIR_ICS"),
            "/data/gfs/grib2"
        );
        assert_eq!(doc.text("task_get_extrn_lbcs.EXTRN_MDL_SYSBASEDIR_LBCS"), "");
        assert!(!doc.contains("data"));
    }

    #[test]
    fn test_sysbasedir_plain_path() {
        let mut doc = data_doc();
        doc.set("task_get_extrn_lbcs.EXTRN_MDL_NAME_LBCS", "HRRR");
        run_rule("extrn_sysbasedir", &mut doc).unwrap();
        assert_eq!(
            doc.text("task_get_extrn_lbcs.EXTRN_MDL_SYSBASEDIR_LBCS"),
            "/data/hrrr"
        );
    }

    #[test]
    fn test_sysbasedir_without_data_section() {
        let mut doc = data_doc();
        doc.remove("data");
        run_rule("extrn_sysbasedir", &mut doc).unwrap();
        assert_eq!(doc.text("task_get_extrn_ics.EXTRN_MDL_SYSBASEDIR_ICS"), "");
    }

    #[test]
    fn test_staged_dirs_checked_up_to_template() {
        let tmp = TempDir::new().unwrap();
        let mut doc = Document::default();
        doc.set("task_get_extrn_ics.USE_USER_STAGED_EXTRN_FILES", true);
        doc.set(
            "task_get_extrn_ics.EXTRN_MDL_SOURCE_BASEDIR_ICS",
            format!("{}/FV3GFS/${{yyyymmddhh}}", tmp.path().display()),
        );
        doc.set("task_get_extrn_lbcs.USE_USER_STAGED_EXTRN_FILES", false);
        doc.set("task_get_extrn_lbcs.EXTRN_MDL_SOURCE_BASEDIR_LBCS", "/missing");
        // `<tmp>/FV3GFS/` does not exist yet
        let err = run_rule("staged_extrn_dirs", &mut doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("EXTRN_MDL_SOURCE_BASEDIR_ICS"));

        std::fs::create_dir(tmp.path().join("FV3GFS")).unwrap();
        run_rule("staged_extrn_dirs", &mut doc).unwrap();
    }
}
