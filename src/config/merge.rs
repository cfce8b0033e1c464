//! Layer merge logic
//!
//! Layers merge in precedence order (default, constants, machine, fixed
//! files, user) with:
//! - Mappings: deep-merge by key
//! - Lists: REPLACE (last wins)
//! - Scalars: override (last wins)

use std::path::Path;

use crate::document::Document;
use crate::paths::resolve_expt_basedir;
use crate::value::{Mapping, Value};

/// Deep merge two values.
///
/// Merge semantics:
/// - Mappings: deep-merge by key (recursive)
/// - Lists: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Map(base_map), Value::Map(overlay_map)) => {
            Value::Map(merge_mappings(base_map, overlay_map))
        }

        // Lists: REPLACE (no concatenation)
        (Value::List(_), overlay @ Value::List(_)) => overlay,

        (_, overlay) => overlay,
    }
}

fn merge_mappings(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

/// Merge override layers onto the default layer, lowest precedence first.
pub fn merge_layers(default: Mapping, overrides: Vec<Mapping>) -> Mapping {
    overrides.into_iter().fold(default, merge_mappings)
}

/// Settings fixed after the merge: the installation root, and the
/// experiment base directory made absolute.
///
/// An empty or relative `workflow.EXPT_BASEDIR` is taken relative to
/// `<home>/../expt_dirs`.
pub fn apply_installation_root(doc: &mut Document, home: &Path) {
    doc.set("user.HOMEdir", home.display().to_string());
    let basedir = doc.text("workflow.EXPT_BASEDIR");
    let resolved = resolve_expt_basedir(home, &basedir);
    tracing::debug!(expt_basedir = %resolved.display(), "resolved experiment base directory");
    doc.set("workflow.EXPT_BASEDIR", resolved.display().to_string());
}
