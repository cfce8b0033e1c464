//! CCPP suite definition file scanning

use regex_lite::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::FixFileError;

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<scheme>\s*([^<\s]+)\s*</scheme>").expect("valid regex"))
}

/// The scheme names listed by a suite definition file.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteDefinition {
    pub path: PathBuf,
    pub schemes: Vec<String>,
}

impl SuiteDefinition {
    /// Read and scan a suite definition file.
    pub fn from_file(path: &Path) -> Result<Self, FixFileError> {
        let contents = fs::read_to_string(path).map_err(|source| FixFileError::SuiteRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_xml(path, &contents))
    }

    /// Scan suite XML that has already been read.
    pub fn from_xml(path: impl Into<PathBuf>, contents: &str) -> Self {
        let schemes = scheme_re()
            .captures_iter(contents)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        Self {
            path: path.into(),
            schemes,
        }
    }

    /// Whether the suite calls the named scheme.
    pub fn has_scheme(&self, name: &str) -> bool {
        self.schemes.iter().any(|s| s == name)
    }
}
