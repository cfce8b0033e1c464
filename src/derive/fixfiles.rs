//! Fixed-file requests and the suite-file mapper

use fcst_fixfiles::{
    link_pregen_files, set_ozone_param, thompson_mp_fix_files, uses_ruc_lsm, LinkSpec, OzoneParam,
    SuiteDefinition, ThompsonFiles,
};
use std::path::Path;

use super::FixedFileMapper;
use crate::error::SetupResult;

/// Ozone lookup for a suite
#[derive(Debug, Clone, Copy)]
pub struct OzoneRequest<'a> {
    pub suite_file: &'a Path,
    /// Current `CYCLEDIR_LINKS_TO_FIXam_FILES_MAPPING`
    pub link_mappings: &'a [String],
}

pub type OzoneMapping = OzoneParam;

/// Thompson microphysics lookup for a suite
#[derive(Debug, Clone, Copy)]
pub struct ThompsonRequest<'a> {
    pub suite_file: &'a Path,
    pub climo_fn: &'a str,
    pub link_climo: bool,
}

pub type ThompsonMapping = ThompsonFiles;

pub type LinkRequest<'a> = LinkSpec<'a>;

/// Fixed-file mappings from the suite definition file on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteFileMapper;

impl FixedFileMapper for SuiteFileMapper {
    fn ozone(&self, request: &OzoneRequest<'_>) -> SetupResult<OzoneMapping> {
        let suite = SuiteDefinition::from_file(request.suite_file)?;
        Ok(set_ozone_param(&suite, request.link_mappings)?)
    }

    fn uses_ruc_lsm(&self, suite_file: &Path) -> SetupResult<bool> {
        let suite = SuiteDefinition::from_file(suite_file)?;
        Ok(uses_ruc_lsm(&suite))
    }

    fn thompson(&self, request: &ThompsonRequest<'_>) -> SetupResult<ThompsonMapping> {
        let suite = SuiteDefinition::from_file(request.suite_file)?;
        Ok(thompson_mp_fix_files(
            &suite,
            request.climo_fn,
            request.link_climo,
        ))
    }

    fn link_pregen(&self, request: &LinkRequest<'_>) -> SetupResult<u32> {
        Ok(link_pregen_files(request)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, SetupError};
    use std::fs;
    use tempfile::TempDir;

    const SUITE: &str = "<suite><scheme>ozphys_2015</scheme><scheme>mp_thompson</scheme>\
                         <scheme>lsm_ruc</scheme></suite>";

    #[test]
    fn test_mapper_reads_suite_file() {
        let tmp = TempDir::new().unwrap();
        let suite = tmp.path().join("suite_FV3_HRRR.xml");
        fs::write(&suite, SUITE).unwrap();
        let mapper = SuiteFileMapper;

        let mappings = vec!["global_o3prdlos.f77 | ".to_string()];
        let ozone = mapper
            .ozone(&OzoneRequest {
                suite_file: &suite,
                link_mappings: &mappings,
            })
            .unwrap();
        assert_eq!(ozone.ozone_param, "ozphys_2015");

        assert!(mapper.uses_ruc_lsm(&suite).unwrap());

        let thompson = mapper
            .thompson(&ThompsonRequest {
                suite_file: &suite,
                climo_fn: "Thompson_MP_MONTHLY_CLIMO.nc",
                link_climo: false,
            })
            .unwrap();
        assert!(thompson.uses_thompson);
    }

    #[test]
    fn test_missing_suite_file_is_not_found() {
        let err = SuiteFileMapper
            .uses_ruc_lsm(Path::new("/nonexistent/suite.xml"))
            .unwrap_err();
        assert!(matches!(err, SetupError::FixFiles(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
