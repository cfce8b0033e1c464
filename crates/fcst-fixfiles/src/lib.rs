//! Physics-suite inspection and fixed-file mappings.
//!
//! A CCPP suite definition file (SDF) is an XML document listing the
//! physics schemes a forecast runs. Which schemes it names decides which
//! fixed files an experiment needs:
//! - the ozone production/loss file depends on the ozone scheme
//! - Thompson microphysics needs its lookup tables (and maybe a climatology)
//! - RUC land-surface model usage is reported to the workflow
//!
//! Mappings are `"symlink | target"` strings, the form the workflow's
//! `CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING` list uses.

mod link;
mod ozone;
mod suite;
mod thompson;

pub use link::{link_pregen_files, FileGroup, LinkSpec};
pub use ozone::{set_ozone_param, OzoneParam, OZONE_SYMLINK};
pub use suite::SuiteDefinition;
pub use thompson::{thompson_mp_fix_files, ThompsonFiles, THOMPSON_MP_FIX_FILES};

use std::path::PathBuf;

/// Scheme name for the RUC land-surface model
pub const RUC_LSM_SCHEME: &str = "lsm_ruc";

/// Check whether a suite definition uses the RUC land-surface model.
pub fn uses_ruc_lsm(suite: &SuiteDefinition) -> bool {
    suite.has_scheme(RUC_LSM_SCHEME)
}

/// Fixed-file errors
#[derive(Debug, thiserror::Error)]
pub enum FixFileError {
    #[error("failed to read suite definition file {path}: {source}")]
    SuiteRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown or no ozone parameterization specified in the physics suite file {0}")]
    UnknownOzone(PathBuf),

    #[error("no mapping for the ozone symlink '{symlink}' in CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING")]
    OzoneLinkMissing { symlink: String },

    #[error("no pregenerated {group} file matching '{pattern}' in {dir}")]
    NoFiles {
        group: String,
        pattern: String,
        dir: PathBuf,
    },

    #[error("pregenerated {group} files have inconsistent resolutions: {found:?}")]
    ResolutionMismatch { group: String, found: Vec<u32> },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Format a `"symlink | target"` mapping entry.
pub fn mapping_entry(symlink: &str, target: &str) -> String {
    format!("{} | {}", symlink, target)
}

/// Split a mapping entry into its symlink and target parts.
pub fn split_mapping(entry: &str) -> (&str, &str) {
    match entry.split_once('|') {
        Some((link, target)) => (link.trim(), target.trim()),
        None => (entry.trim(), ""),
    }
}
