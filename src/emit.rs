//! Renderings of the resolved document
//!
//! The shell form is what workflow scripts source: one `# [section]`
//! comment per section followed by `KEY='value'` and `KEY=( "a" "b" )`
//! assignments.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::value::{Mapping, Value};

/// Path of the variable-definitions file in the document
pub const VAR_DEFNS_KEY: &str = "workflow.GLOBAL_VAR_DEFNS_FP";

/// Render the document as sourceable shell assignments.
pub fn to_shell_string(doc: &Document) -> String {
    let mut out = String::new();
    let (scalars, sections): (Vec<_>, Vec<_>) =
        doc.root().iter().partition(|(_, v)| !matches!(v, Value::Map(_)));
    for (key, value) in scalars {
        push_assignment(&mut out, key, value);
    }
    for (name, section) in sections {
        if let Value::Map(map) = section {
            push_section(&mut out, name, map);
        }
    }
    out
}

fn push_section(out: &mut String, header: &str, map: &Mapping) {
    out.push_str(&format!("# [{}]\n", header));
    let mut nested = Vec::new();
    for (key, value) in map {
        match value {
            Value::Map(inner) => nested.push((format!("{}.{}", header, key), inner)),
            other => push_assignment(out, key, other),
        }
    }
    for (header, inner) in nested {
        push_section(out, &header, inner);
    }
}

fn push_assignment(out: &mut String, key: &str, value: &Value) {
    match value {
        Value::List(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| format!("\"{}\"", item.to_string().replace('"', "\\\"")))
                .collect();
            if items.is_empty() {
                out.push_str(&format!("{}=( )\n", key));
            } else {
                out.push_str(&format!("{}=( {} )\n", key, items.join(" ")));
            }
        }
        other => {
            let text = other.to_string().replace('\'', "'\\''");
            out.push_str(&format!("{}='{}'\n", key, text));
        }
    }
}

/// Render the document as YAML.
pub fn to_yaml_string(doc: &Document) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(doc)
}

/// Render the document as pretty-printed JSON.
pub fn to_json_string(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Append the shell rendering to the file named by `GLOBAL_VAR_DEFNS_FP`.
pub fn append_var_defns(doc: &Document) -> SetupResult<PathBuf> {
    let path = doc
        .opt_text(VAR_DEFNS_KEY)
        .map(PathBuf::from)
        .ok_or_else(|| SetupError::MissingMandatory {
            key: "GLOBAL_VAR_DEFNS_FP".to_string(),
            file: "the workflow section".to_string(),
        })?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| SetupError::io(&path, e))?;
    file.write_all(to_shell_string(doc).as_bytes())
        .map_err(|e| SetupError::io(&path, e))?;
    tracing::info!(path = %path.display(), "wrote experiment variable definitions");
    Ok(path)
}
