//! INI reader for the externals manifest
//!
//! The manifest lists the external components checked out next to the
//! application:
//!
//! ```text
//! [ufs-weather-model]
//! protocol = git
//! local_path = sorc/ufs-weather-model
//! ```
//!
//! Option names are case-insensitive; `#` and `;` start comment lines and
//! indented lines continue the previous value.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{SetupError, SetupResult};

/// A parsed INI document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDoc {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniDoc {
    /// Parse INI text. `origin` names the source in error messages.
    pub fn parse(text: &str, origin: &Path) -> SetupResult<Self> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let continuation = raw.starts_with([' ', '\t']);
            if continuation {
                if let (Some(section), Some(key)) = (&current, &last_key) {
                    if let Some(value) = sections.get_mut(section).and_then(|s| s.get_mut(key)) {
                        if !value.is_empty() {
                            value.push('\n');
                        }
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                let name = name.trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                last_key = None;
                continue;
            }

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(parse_error(origin, line_no, "expected `key = value`"));
            };
            let Some(section) = &current else {
                return Err(parse_error(origin, line_no, "option outside of a section"));
            };
            let key = trimmed[..split].trim().to_lowercase();
            let value = trimmed[split + 1..].trim().to_string();
            if let Some(options) = sections.get_mut(section) {
                options.insert(key.clone(), value);
            }
            last_key = Some(key);
        }

        Ok(Self { sections })
    }

    /// Value of an option in a section.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|options| options.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

fn parse_error(origin: &Path, line: usize, message: &str) -> SetupError {
    SetupError::ConfigParse {
        path: origin.to_path_buf(),
        message: format!("line {}: {}", line, message),
    }
}

/// Read and parse an INI file.
pub fn load_ini_config(path: &Path) -> SetupResult<IniDoc> {
    if !path.exists() {
        return Err(SetupError::ConfigNotFound {
            path: path.to_path_buf(),
            hint: None,
        });
    }
    let text = fs::read_to_string(path).map_err(|e| SetupError::io(path, e))?;
    IniDoc::parse(&text, path)
}
