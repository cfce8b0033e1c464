//! User-layer key checks
//!
//! Every key a user sets must already exist in the default layer at the
//! same path. This catches misspelled settings, which would otherwise be
//! silently ignored.

use std::path::Path;

use crate::error::{SetupError, SetupResult, Violation};
use crate::value::{Mapping, Value};

/// Keys the user layer must set to a non-null value.
pub const MANDATORY_USER_KEYS: &[&str] = &["user.MACHINE"];

/// Collect user keys that have no counterpart in the default layer.
///
/// Recursion continues while both sides are mappings. A user mapping in a
/// slot where the default holds a scalar is accepted as a whole.
pub fn check_keys(user: &Mapping, default: &Mapping) -> Vec<Violation> {
    let mut violations = Vec::new();
    collect(user, default, "", &mut violations);
    violations
}

fn collect(user: &Mapping, default: &Mapping, prefix: &str, out: &mut Vec<Violation>) {
    for (key, value) in user {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match default.get(key) {
            None => out.push(Violation {
                path,
                value: value.to_string(),
            }),
            Some(Value::Map(default_inner)) => {
                if let Value::Map(user_inner) = value {
                    collect(user_inner, default_inner, &path, out);
                }
            }
            Some(_) => {}
        }
    }
}

/// Reject unknown user keys, naming the default file as the reference.
pub fn ensure_known_keys(
    user: &Mapping,
    user_path: &Path,
    default: &Mapping,
    default_path: &Path,
) -> SetupResult<()> {
    let violations = check_keys(user, default);
    if violations.is_empty() {
        return Ok(());
    }
    Err(SetupError::UnknownSetting {
        source_path: user_path.to_path_buf(),
        violations,
        reference: default_path.to_path_buf(),
    })
}

/// Check that every mandatory key is set in the user layer.
pub fn check_mandatory(user: &Mapping, user_path: &Path) -> SetupResult<()> {
    for key in MANDATORY_USER_KEYS {
        let (section, leaf) = key.split_once('.').unwrap_or(("", key));
        let set = user
            .get(section)
            .and_then(Value::as_map)
            .and_then(|s| s.get(leaf))
            .map(|v| !v.is_null())
            .unwrap_or(false);
        if !set {
            return Err(SetupError::MissingMandatory {
                key: key.to_string(),
                file: user_path.display().to_string(),
            });
        }
    }
    Ok(())
}
