//! `{{ ... }}` placeholder expansion
//!
//! Settings may refer to other settings, e.g.
//! `EXPTDIR: '{{ workflow.EXPT_BASEDIR }}/{{ workflow.EXPT_SUBDIR }}'`.
//! A placeholder names either a sibling key in the same mapping or a
//! dotted path from the document root; the sibling scope is tried first.
//!
//! Expansion runs in passes until nothing changes. A placeholder is only
//! replaced when its target exists and is itself free of placeholders, so
//! chains resolve one link per pass and cycles never resolve. Every pass
//! that changes something removes a placeholder, so the number of
//! placeholders in the document bounds the number of passes. Anything
//! that cannot be resolved (unknown paths, cycles, filter expressions,
//! `{% %}` blocks) is left as literal text.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::config::normalize::str_to_type;
use crate::document::Document;
use crate::value::{Mapping, Value};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("valid regex"))
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$").expect("valid regex"))
}

/// Whether a value holds a placeholder anywhere inside it.
pub fn contains_template(value: &Value) -> bool {
    match value {
        Value::Str(s) => s.contains("{{"),
        Value::List(items) => items.iter().any(contains_template),
        Value::Map(map) => map.values().any(contains_template),
        _ => false,
    }
}

/// Expand placeholders in place. Returns the number of passes that changed
/// something.
pub fn expand(doc: &mut Document) -> usize {
    let limit = count_placeholders_in_map(doc.root());
    let mut passes = 0;
    while passes < limit {
        let snapshot = doc.root().clone();
        if !expand_mapping(doc.root_mut(), &snapshot, &snapshot) {
            break;
        }
        passes += 1;
    }
    tracing::debug!(passes, "placeholder expansion finished");
    passes
}

fn count_placeholders(value: &Value) -> usize {
    match value {
        Value::Str(s) => placeholder_re().find_iter(s).count(),
        Value::List(items) => items.iter().map(count_placeholders).sum(),
        Value::Map(map) => count_placeholders_in_map(map),
        _ => 0,
    }
}

fn count_placeholders_in_map(map: &Mapping) -> usize {
    map.values().map(count_placeholders).sum()
}

fn expand_mapping(target: &mut Mapping, scope: &Mapping, root: &Mapping) -> bool {
    let mut changed = false;
    for (key, value) in target.iter_mut() {
        match value {
            Value::Map(inner) => {
                if let Some(Value::Map(inner_scope)) = scope.get(key) {
                    changed |= expand_mapping(inner, inner_scope, root);
                }
            }
            Value::List(items) => {
                let list_scope = scope.get(key).and_then(Value::as_list);
                changed |= expand_list(items, scope, list_scope, root);
            }
            Value::Str(s) if s.contains("{{") => {
                if let Some(rendered) = render(s, scope, root) {
                    *value = rendered;
                    changed = true;
                }
            }
            _ => {}
        }
    }
    changed
}

fn expand_list(
    items: &mut [Value],
    scope: &Mapping,
    list_scope: Option<&Vec<Value>>,
    root: &Mapping,
) -> bool {
    let mut changed = false;
    for (idx, item) in items.iter_mut().enumerate() {
        match item {
            Value::Str(s) if s.contains("{{") => {
                if let Some(rendered) = render(s, scope, root) {
                    *item = rendered;
                    changed = true;
                }
            }
            Value::Map(inner) => {
                if let Some(Value::Map(inner_scope)) = list_scope.and_then(|l| l.get(idx)) {
                    changed |= expand_mapping(inner, inner_scope, root);
                }
            }
            _ => {}
        }
    }
    changed
}

fn lookup<'a>(expr: &str, scope: &'a Mapping, root: &'a Mapping) -> Option<&'a Value> {
    if !path_re().is_match(expr) {
        return None;
    }
    let find = |map: &'a Mapping| {
        let mut parts = expr.split('.');
        let mut current = map.get(parts.next()?)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    };
    find(scope)
        .or_else(|| find(root))
        .filter(|target| !contains_template(target))
}

/// Render one string; `None` when no placeholder could be resolved.
fn render(s: &str, scope: &Mapping, root: &Mapping) -> Option<Value> {
    let re = placeholder_re();

    // A string that is exactly one placeholder takes the target's value.
    if let Some(caps) = re.captures(s) {
        let whole = caps.get(0)?;
        if whole.start() == 0 && whole.end() == s.len() {
            let target = lookup(caps.get(1)?.as_str(), scope, root)?;
            return Some(match target {
                Value::Str(text) => str_to_type(text),
                other => other.clone(),
            });
        }
    }

    let mut resolved_any = false;
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in re.captures_iter(s) {
        let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&s[last..whole.start()]);
        match lookup(expr.as_str(), scope, root) {
            Some(target) => {
                out.push_str(&target.to_string());
                resolved_any = true;
            }
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);

    if !resolved_any {
        return None;
    }
    if out.contains("{{") {
        Some(Value::Str(out))
    } else {
        Some(str_to_type(&out))
    }
}
