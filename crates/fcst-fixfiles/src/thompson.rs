//! Thompson microphysics fixed files

use crate::{mapping_entry, SuiteDefinition};

/// Scheme name for Thompson microphysics
const THOMPSON_MP_SCHEME: &str = "mp_thompson";

/// Lookup tables the Thompson scheme reads at startup
pub const THOMPSON_MP_FIX_FILES: &[&str] = &[
    "CCN_ACTIVATE.BIN",
    "freezeH2O.dat",
    "qr_acr_qg.dat",
    "qr_acr_qs.dat",
    "qr_acr_qgV2.dat",
    "qr_acr_qsV2.dat",
];

/// Fixed files and link mappings required by Thompson microphysics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThompsonFiles {
    pub uses_thompson: bool,
    pub mappings: Vec<String>,
    pub fix_files: Vec<String>,
}

/// Determine the Thompson MP fixed files for a suite.
///
/// When `link_climo` is set the aerosol climatology file is added too; it
/// is not needed when the initial/boundary data already carries it.
pub fn thompson_mp_fix_files(
    suite: &SuiteDefinition,
    climo_fn: &str,
    link_climo: bool,
) -> ThompsonFiles {
    if !suite.has_scheme(THOMPSON_MP_SCHEME) {
        return ThompsonFiles::default();
    }

    let mut fix_files: Vec<String> = THOMPSON_MP_FIX_FILES.iter().map(|s| s.to_string()).collect();
    if link_climo {
        fix_files.push(climo_fn.to_string());
    }
    let mappings = fix_files.iter().map(|f| mapping_entry(f, f)).collect();

    ThompsonFiles {
        uses_thompson: true,
        mappings,
        fix_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIMO: &str = "Thompson_MP_MONTHLY_CLIMO.nc";

    #[test]
    fn test_not_thompson() {
        let sdf = SuiteDefinition::from_xml("s.xml", "<scheme>mp_gfdl</scheme>");
        let files = thompson_mp_fix_files(&sdf, CLIMO, true);
        assert!(!files.uses_thompson);
        assert!(files.mappings.is_empty());
    }

    #[test]
    fn test_with_climatology() {
        let sdf = SuiteDefinition::from_xml("s.xml", "<scheme>mp_thompson</scheme>");
        let files = thompson_mp_fix_files(&sdf, CLIMO, true);
        assert!(files.uses_thompson);
        assert_eq!(files.fix_files.len(), THOMPSON_MP_FIX_FILES.len() + 1);
        assert_eq!(files.fix_files.last().unwrap(), CLIMO);
        assert!(files.mappings.contains(&format!("{} | {}", CLIMO, CLIMO)));
    }

    #[test]
    fn test_without_climatology() {
        let sdf = SuiteDefinition::from_xml("s.xml", "<scheme>mp_thompson</scheme>");
        let files = thompson_mp_fix_files(&sdf, CLIMO, false);
        assert_eq!(files.fix_files.len(), THOMPSON_MP_FIX_FILES.len());
        assert_eq!(files.mappings[1], "freezeH2O.dat | freezeH2O.dat");
    }
}
