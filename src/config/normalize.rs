//! Coercion of string settings into typed values
//!
//! Layer files and placeholder substitution both produce strings that
//! stand for booleans, numbers, dates or shell-style arrays. The
//! normalizer turns them into typed values so later rules can compare and
//! compute with them.

use chrono::{NaiveDate, NaiveDateTime};

use crate::document::Document;
use crate::error::{SetupError, SetupResult};
use crate::value::{Mapping, Value};

/// Cycle-date settings that must hold dates after normalization.
pub const DATE_KEYS: &[&str] = &["workflow.DATE_FIRST_CYCL", "workflow.DATE_LAST_CYCL"];

/// Parse an 8, 10, 12 or 14 digit `YYYYMMDD[HH[MM[SS]]]` string.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let num = |range: std::ops::Range<usize>| s[range].parse::<u32>().ok();
    let (hour, minute, second) = match s.len() {
        8 => (0, 0, 0),
        10 => (num(8..10)?, 0, 0),
        12 => (num(8..10)?, num(10..12)?, 0),
        14 => (num(8..10)?, num(10..12)?, num(12..14)?),
        _ => return None,
    };
    let year = s[0..4].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, num(4..6)?, num(6..8)?)?.and_hms_opt(hour, minute, second)
}

/// Interpret a scalar string.
///
/// Surrounding quotes are stripped. Then, in order: boolean words,
/// `None`/`NULL`, dates, integers, floats. Anything else stays a string.
pub fn str_to_type(raw: &str) -> Value {
    let s = raw.trim_matches(|c| c == '"' || c == '\'');
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "yeah" => return Value::Bool(true),
        "false" | "no" | "nope" => return Value::Bool(false),
        _ => {}
    }
    if matches!(s, "None" | "NULL" | "null") {
        return Value::Null;
    }
    if let Some(date) = parse_date(s) {
        return Value::Date(date);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if s.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::Str(s.to_string())
}

/// Interpret a string that may hold a bracketed or parenthesized list.
///
/// `[a, b]` and `( "a" "b" )` both become lists; elements are separated by
/// commas or whitespace outside quotes, bash `[i]=` index prefixes are
/// dropped, and every element goes through [`str_to_type`]. Other strings
/// are scalars.
pub fn str_to_list(raw: &str) -> Value {
    let s = raw.trim();
    let bracketed = s.len() >= 2
        && ((s.starts_with('[') && s.ends_with(']')) || (s.starts_with('(') && s.ends_with(')')));
    if !bracketed {
        return str_to_type(s);
    }
    let items = split_tokens(&s[1..s.len() - 1])
        .into_iter()
        .map(|token| {
            let token = match (token.starts_with('['), token.find("]=")) {
                (true, Some(idx)) => token[idx + 2..].to_string(),
                _ => token,
            };
            str_to_type(&token)
        })
        .collect();
    Value::List(items)
}

/// Split on commas and whitespace outside quotes. Quotes are removed.
fn split_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    for c in s.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c == ',' || c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Normalize every string setting of the document and check the cycle dates.
pub fn normalize(doc: &mut Document) -> SetupResult<()> {
    for section in doc.root_mut().values_mut() {
        if let Value::Map(settings) = section {
            normalize_mapping(settings);
        }
    }
    for key in DATE_KEYS {
        coerce_date(doc, key)?;
    }
    Ok(())
}

fn normalize_mapping(map: &mut Mapping) {
    for value in map.values_mut() {
        match value {
            Value::Str(s) if !s.is_empty() => *value = str_to_list(s),
            Value::Map(inner) => normalize_mapping(inner),
            _ => {}
        }
    }
}

fn coerce_date(doc: &mut Document, key: &str) -> SetupResult<()> {
    let coerced = match doc.get(key) {
        Some(Value::Date(_)) => return Ok(()),
        Some(Value::Int(i)) => parse_date(&i.to_string()),
        _ => None,
    };
    match coerced {
        Some(date) => {
            doc.set(key, date);
            Ok(())
        }
        None => Err(SetupError::InvalidDateFormat {
            key: key.rsplit('.').next().unwrap_or(key).to_string(),
            value: doc.text(key),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32, h: u32, mi: u32) -> Value {
        Value::Date(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, mi, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_str_to_type_words() {
        assert_eq!(str_to_type("TRUE"), Value::Bool(true));
        assert_eq!(str_to_type("yeah"), Value::Bool(true));
        assert_eq!(str_to_type("Nope"), Value::Bool(false));
        assert_eq!(str_to_type("None"), Value::Null);
        assert_eq!(str_to_type("'quoted'"), Value::from("quoted"));
    }

    #[test]
    fn test_str_to_type_numbers() {
        assert_eq!(str_to_type("36"), Value::Int(36));
        assert_eq!(str_to_type("-5"), Value::Int(-5));
        assert_eq!(str_to_type("0.5"), Value::Float(0.5));
        assert_eq!(str_to_type("1e3"), Value::Float(1000.0));
        assert_eq!(str_to_type("inf"), Value::from("inf"));
        assert_eq!(str_to_type("FV3_GFS_v16"), Value::from("FV3_GFS_v16"));
    }

    #[test]
    fn test_str_to_type_dates() {
        assert_eq!(str_to_type("2019061518"), date(2019, 6, 15, 18, 0));
        assert_eq!(str_to_type("201906151830"), date(2019, 6, 15, 18, 30));
        assert_eq!(str_to_type("20190615"), date(2019, 6, 15, 0, 0));
        // not a valid calendar date, so it stays a number
        assert_eq!(str_to_type("12345678"), Value::Int(12345678));
    }

    #[test]
    fn test_str_to_list_forms() {
        assert_eq!(
            str_to_list("[ 'a', \"b c\", 3 ]"),
            Value::List(vec![Value::from("a"), Value::from("b c"), Value::Int(3)])
        );
        assert_eq!(
            str_to_list("( \"x\" \"y\" )"),
            Value::List(vec![Value::from("x"), Value::from("y")])
        );
        assert_eq!(
            str_to_list("( [0]=\"pbl\" [1]=\"sfc\" )"),
            Value::List(vec![Value::from("pbl"), Value::from("sfc")])
        );
        assert_eq!(str_to_list("[]"), Value::List(vec![]));
        assert_eq!(str_to_list("plain"), Value::from("plain"));
    }

    #[test]
    fn test_normalize_nested_but_not_lists() {
        let mut doc = Document::default();
        doc.set("workflow.DATE_FIRST_CYCL", "2019061518");
        doc.set("workflow.DATE_LAST_CYCL", 2019061600i64);
        doc.set("workflow.VERBOSE", "TRUE");
        doc.set("workflow.EMPTY", "");
        doc.set("data.ics_lbcs.FV3GFS.count", "3");
        doc.set("fixed_files.LIST", Value::List(vec![Value::from("1")]));

        normalize(&mut doc).unwrap();

        assert_eq!(doc.get("workflow.DATE_FIRST_CYCL"), Some(&date(2019, 6, 15, 18, 0)));
        assert_eq!(doc.get("workflow.DATE_LAST_CYCL"), Some(&date(2019, 6, 16, 0, 0)));
        assert_eq!(doc.get("workflow.VERBOSE"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("workflow.EMPTY"), Some(&Value::from("")));
        assert_eq!(doc.get("data.ics_lbcs.FV3GFS.count"), Some(&Value::Int(3)));
        assert_eq!(
            doc.get("fixed_files.LIST"),
            Some(&Value::List(vec![Value::from("1")]))
        );
    }

    #[test]
    fn test_invalid_date() {
        let mut doc = Document::default();
        doc.set("workflow.DATE_FIRST_CYCL", "yesterday");
        doc.set("workflow.DATE_LAST_CYCL", "2019061518");
        let err = normalize(&mut doc).unwrap_err();
        assert!(matches!(err, SetupError::InvalidDateFormat { ref key, ref value }
            if key == "DATE_FIRST_CYCL" && value == "yesterday"));
    }
}
