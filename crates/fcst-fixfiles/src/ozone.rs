//! Ozone production/loss file selection

use crate::{mapping_entry, split_mapping, FixFileError, SuiteDefinition};

/// Symlink name the model reads the ozone file from
pub const OZONE_SYMLINK: &str = "global_o3prdlos.f77";

/// (scheme, fixed file) pairs, checked in order.
const OZONE_SCHEMES: &[(&str, &str)] = &[
    ("ozphys_2015", "ozprdlos_2015_new_sbuvO3_tclm15nuc.f77"),
    ("ozphys", "global_o3prdlos.f77"),
];

/// The ozone parameterization of a suite and the resulting link mappings
#[derive(Debug, Clone, PartialEq)]
pub struct OzoneParam {
    /// Scheme name, e.g. `ozphys_2015`
    pub ozone_param: String,
    /// File under FIXgsm that holds the production/loss data
    pub fixgsm_ozone_fn: String,
    /// The link mappings with the ozone symlink pointed at `fixgsm_ozone_fn`
    pub link_mappings: Vec<String>,
}

/// Select the ozone file for a suite and update the cycle-directory mappings.
pub fn set_ozone_param(
    suite: &SuiteDefinition,
    link_mappings: &[String],
) -> Result<OzoneParam, FixFileError> {
    let (ozone_param, fixgsm_ozone_fn) = OZONE_SCHEMES
        .iter()
        .find(|(scheme, _)| suite.has_scheme(scheme))
        .ok_or_else(|| FixFileError::UnknownOzone(suite.path.clone()))?;

    let mut mappings = link_mappings.to_vec();
    let entry = mappings
        .iter_mut()
        .find(|m| split_mapping(m).0 == OZONE_SYMLINK)
        .ok_or_else(|| FixFileError::OzoneLinkMissing {
            symlink: OZONE_SYMLINK.to_string(),
        })?;
    *entry = mapping_entry(OZONE_SYMLINK, fixgsm_ozone_fn);

    Ok(OzoneParam {
        ozone_param: ozone_param.to_string(),
        fixgsm_ozone_fn: fixgsm_ozone_fn.to_string(),
        link_mappings: mappings,
    })
}
