//! Output directory layout

use std::path::{Path, PathBuf};

use super::RuleContext;
use crate::error::SetupResult;
use crate::paths::create_dir;

/// Operational-center roots; in nco mode each may come from the environment
/// variable of the same name in lowercase.
const NCO_VARS: &[&str] = &[
    "OPSROOT",
    "COMROOT",
    "PACKAGEROOT",
    "DATAROOT",
    "DCOMROOT",
    "COMIN_BASEDIR",
    "COMOUT_BASEDIR",
    "EXTROOT",
];

/// Directories created up front in nco mode
const NCO_CREATED: &[&str] = &[
    "OPSROOT",
    "COMROOT",
    "PACKAGEROOT",
    "DATAROOT",
    "DCOMROOT",
    "LOGBASEDIR",
    "EXTROOT",
];

pub(super) fn nco_dirs(ctx: &mut RuleContext<'_>) -> SetupResult<()> {
    let exptdir = ctx.doc.text("workflow.EXPTDIR");
    let nco_mode = ctx.doc.text("user.RUN_ENVIR") == "nco";

    if nco_mode {
        for var in NCO_VARS {
            if let Some(value) = ctx.with.env.get(&var.to_lowercase()) {
                ctx.doc.set(&format!("nco.{}", var), value.clone());
            }
        }
        for var in NCO_CREATED {
            if let Some(dir) = ctx.doc.opt_text(&format!("nco.{}", var)) {
                create_dir(Path::new(&dir))?;
            }
        }
    } else {
        for var in NCO_VARS {
            ctx.doc.set(&format!("nco.{}", var), exptdir.clone());
        }
        let logdir = PathBuf::from(&exptdir).join("log");
        ctx.doc.set("nco.LOGBASEDIR", logdir.display().to_string());
    }

    if ctx.doc.flag("nco.DBNROOT") {
        create_dir(Path::new(&ctx.doc.text("nco.DBNROOT")))?;
    }
    if !exptdir.is_empty() {
        create_dir(Path::new(&exptdir))?;
    }
    tracing::debug!(nco_mode, exptdir = %exptdir, "output directories ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{run_rule, run_rule_with_env};
    use crate::document::Document;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_community_mode_points_at_exptdir() {
        let tmp = TempDir::new().unwrap();
        let exptdir = tmp.path().join("expt");
        let mut doc = Document::default();
        doc.set("user.RUN_ENVIR", "community");
        doc.set("workflow.EXPTDIR", exptdir.display().to_string());
        doc.set("nco.DBNROOT", "");
        run_rule("nco_dirs", &mut doc).unwrap();

        assert_eq!(doc.text("nco.COMROOT"), exptdir.display().to_string());
        assert_eq!(doc.text("nco.EXTROOT"), exptdir.display().to_string());
        assert_eq!(
            doc.text("nco.LOGBASEDIR"),
            exptdir.join("log").display().to_string()
        );
        assert!(exptdir.is_dir());
        assert!(!exptdir.join("log").exists());
    }

    #[test]
    fn test_nco_mode_reads_environment_and_creates_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = |name: &str| tmp.path().join(name).display().to_string();
        let mut doc = Document::default();
        doc.set("user.RUN_ENVIR", "nco");
        doc.set("workflow.EXPTDIR", root("expt"));
        for var in ["OPSROOT", "COMROOT", "PACKAGEROOT", "DATAROOT", "DCOMROOT", "EXTROOT"] {
            doc.set(&format!("nco.{}", var), root(&format!("default_{}", var.to_lowercase())));
        }
        doc.set("nco.LOGBASEDIR", root("logs"));
        doc.set("nco.DBNROOT", root("dbnroot"));

        let mut env = BTreeMap::new();
        env.insert("comroot".to_string(), root("env_com"));
        run_rule_with_env("nco_dirs", &mut doc, &env).unwrap();

        assert_eq!(doc.text("nco.COMROOT"), root("env_com"));
        assert!(tmp.path().join("env_com").is_dir());
        assert!(tmp.path().join("default_opsroot").is_dir());
        assert!(tmp.path().join("logs").is_dir());
        assert!(tmp.path().join("dbnroot").is_dir());
        assert!(tmp.path().join("expt").is_dir());
    }
}
