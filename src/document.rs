//! The experiment configuration document
//!
//! A document is a mapping of section names (`user`, `workflow`,
//! `task_run_fcst`, ...) to mappings of settings. Every pipeline stage
//! reads and mutates the same document through dotted paths such as
//! `workflow.FCST_LEN_HRS`.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{SetupError, SetupResult};
use crate::value::{Mapping, Value};

/// The merged experiment configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Document {
    root: Mapping,
}

impl Document {
    pub fn new(root: Mapping) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    pub fn into_root(self) -> Mapping {
        self.root
    }

    /// Look up a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut parts = path.split('.');
        let mut current = self.root.get_mut(parts.next()?)?;
        for part in parts {
            current = current.as_map_mut()?.get_mut(part)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Set a dotted path, creating (or replacing non-mapping) intermediate
    /// levels as needed.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut map = &mut self.root;
        if let Some(parents) = parents {
            for part in parents.split('.') {
                let slot = map
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Map(Mapping::new()));
                if !matches!(slot, Value::Map(_)) {
                    *slot = Value::Map(Mapping::new());
                }
                map = match slot {
                    Value::Map(m) => m,
                    _ => unreachable!("slot was just made a mapping"),
                };
            }
        }
        map.insert(leaf.to_string(), value.into());
    }

    /// Remove a dotted path, returning the old value.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            Some((parent, leaf)) => self.get_mut(parent)?.as_map_mut()?.remove(leaf),
            None => self.root.remove(path),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Mapping> {
        self.root.get(name).and_then(Value::as_map)
    }

    /// Mutable access to a section, creating it if absent.
    pub fn section_mut(&mut self, name: &str) -> &mut Mapping {
        let slot = self
            .root
            .entry(name.to_string())
            .or_insert_with(|| Value::Map(Mapping::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(Mapping::new());
        }
        match slot {
            Value::Map(m) => m,
            _ => unreachable!("slot was just made a mapping"),
        }
    }

    /// Every leaf keyed by its fully-qualified dotted path. Lists are leaves.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        flatten_into(&self.root, "", &mut out);
        out
    }

    /// First leaf (in dotted-path order) whose last path component is `key`.
    pub fn find_leaf(&self, key: &str) -> Option<&Value> {
        find_leaf_in(&self.root, key)
    }

    /// Truthiness of a path; absent paths are false.
    pub fn flag(&self, path: &str) -> bool {
        self.get(path).map(Value::truthy).unwrap_or(false)
    }

    /// Textual form of a path; absent and null paths render empty.
    pub fn text(&self, path: &str) -> String {
        self.get(path).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Textual form, or `None` when absent, null or empty.
    pub fn opt_text(&self, path: &str) -> Option<String> {
        match self.get(path) {
            Some(v) if !v.is_unset() => Some(v.to_string()),
            _ => None,
        }
    }

    pub fn require_i64(&self, path: &str) -> SetupResult<i64> {
        let value = self.get(path).unwrap_or(&Value::Null);
        value.as_i64().ok_or_else(|| invalid_type(path, value, "integer"))
    }

    pub fn require_f64(&self, path: &str) -> SetupResult<f64> {
        let value = self.get(path).unwrap_or(&Value::Null);
        value.as_f64().ok_or_else(|| invalid_type(path, value, "number"))
    }

    pub fn require_str(&self, path: &str) -> SetupResult<&str> {
        let value = self.get(path).unwrap_or(&Value::Null);
        value.as_str().ok_or_else(|| invalid_type(path, value, "string"))
    }

    pub fn require_date(&self, path: &str) -> SetupResult<NaiveDateTime> {
        let value = self.get(path).unwrap_or(&Value::Null);
        value.as_date().ok_or_else(|| invalid_type(path, value, "date"))
    }

    /// A list of strings; a lone scalar is a one-element list, null is empty.
    pub fn string_list(&self, path: &str) -> Vec<String> {
        match self.get(path) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::List(items)) => items.iter().map(|v| v.to_string()).collect(),
            Some(other) => vec![other.to_string()],
        }
    }
}

fn invalid_type(path: &str, value: &Value, expected: &'static str) -> SetupError {
    SetupError::InvalidType {
        key: path.to_string(),
        value: if value.is_null() {
            "null".to_string()
        } else {
            format!("{} ({})", value, value.type_name())
        },
        expected,
    }
}

fn flatten_into(map: &Mapping, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Map(inner) => flatten_into(inner, &path, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

fn find_leaf_in<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    for (k, v) in map {
        match v {
            Value::Map(inner) => {
                if let Some(found) = find_leaf_in(inner, key) {
                    return Some(found);
                }
            }
            other if k == key => return Some(other),
            _ => {}
        }
    }
    None
}
