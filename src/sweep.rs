//! Final check of settings against the allowed-values catalog
//!
//! The catalog (`valid_param_vals.yaml`) maps `valid_vals_<KEY>` to the
//! list of values `<KEY>` may take. `<KEY>` is either a leaf name such as
//! `RUN_ENVIR` or a fully-qualified dotted path such as `user.RUN_ENVIR`.

use crate::config::str_to_type;
use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::value::{Mapping, Value};

/// Prefix of catalog entries
pub const VALID_VALS_PREFIX: &str = "valid_vals_";

/// Check every set value of `doc` against `catalog`.
pub fn sweep(doc: &Document, catalog: &Mapping) -> SetupResult<()> {
    for (path, value) in doc.flatten() {
        if value.is_unset() {
            continue;
        }
        let leaf = path.rsplit('.').next().unwrap_or(&path);
        let allowed = [path.as_str(), leaf]
            .iter()
            .find_map(|key| catalog.get(&format!("{}{}", VALID_VALS_PREFIX, key)));
        let Some(allowed) = allowed else {
            continue;
        };
        let allowed: &[Value] = match allowed {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        };

        let candidates: &[Value] = match &value {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        };
        for candidate in candidates {
            if !allowed.iter().any(|a| same_value(a, candidate)) {
                return Err(SetupError::InvalidValue {
                    key: path.clone(),
                    value: value.to_string(),
                    allowed: allowed.iter().map(|a| a.to_string()).collect(),
                });
            }
        }
    }
    tracing::debug!(entries = catalog.len(), "validity sweep passed");
    Ok(())
}

/// Equality after reading strings as the scalars they spell.
fn same_value(a: &Value, b: &Value) -> bool {
    let a = coerce(a);
    let b = coerce(b);
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn coerce(value: &Value) -> Value {
    match value {
        Value::Str(s) => str_to_type(s),
        other => other.clone(),
    }
}
