//! Leaf flattening shared by the change tracker and the sample selector
//!
//! A sample is flattened into `(concrete path, canonical value)` pairs:
//! objects recurse per property, arrays up to the index threshold recurse
//! per element with `[i]` notation, larger arrays contribute a single
//! `<path>.length` leaf. Scalars are leaves with their canonical text.

use crate::path::{push_field, push_index, LENGTH_FIELD};
use serde_json::Value;
use std::borrow::Cow;

/// Canonical form of a leaf value.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<'a> {
    /// Raw textual form: number text as written in the source, raw string,
    /// `true`/`false`, `null`, or the array length for over-threshold arrays
    pub text: Cow<'a, str>,
    /// Numeric value when the leaf is a JSON number (or an array length)
    pub numeric: Option<f64>,
}

impl Leaf<'_> {
    /// Canonical leaf for a scalar value; `None` for objects and arrays.
    pub fn scalar(value: &Value) -> Option<Leaf<'_>> {
        match value {
            Value::Number(n) => Some(Leaf {
                text: Cow::Owned(n.to_string()),
                numeric: n.as_f64(),
            }),
            Value::String(s) => Some(Leaf {
                text: Cow::Borrowed(s.as_str()),
                numeric: None,
            }),
            Value::Bool(b) => Some(Leaf {
                text: Cow::Borrowed(if *b { "true" } else { "false" }),
                numeric: None,
            }),
            Value::Null => Some(Leaf {
                text: Cow::Borrowed("null"),
                numeric: None,
            }),
            Value::Object(_) | Value::Array(_) => None,
        }
    }

    fn length(len: usize) -> Leaf<'static> {
        Leaf {
            text: Cow::Owned(len.to_string()),
            numeric: Some(len as f64),
        }
    }
}

/// Visit every leaf of `value` with its concrete path.
///
/// The path buffer is reused across leaves; copy it if it must outlive the
/// callback.
pub fn visit_leaves<'a, F>(value: &'a Value, index_threshold: usize, visit: &mut F)
where
    F: FnMut(&str, Leaf<'a>),
{
    let mut path = String::new();
    walk(value, index_threshold, &mut path, visit);
}

fn walk<'a, F>(value: &'a Value, index_threshold: usize, path: &mut String, visit: &mut F)
where
    F: FnMut(&str, Leaf<'a>),
{
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let mark = path.len();
                push_field(path, name);
                walk(child, index_threshold, path, visit);
                path.truncate(mark);
            }
        }
        Value::Array(items) if items.len() <= index_threshold => {
            for (index, item) in items.iter().enumerate() {
                let mark = path.len();
                push_index(path, index);
                walk(item, index_threshold, path, visit);
                path.truncate(mark);
            }
        }
        Value::Array(items) => {
            let mark = path.len();
            push_field(path, LENGTH_FIELD);
            visit(path, Leaf::length(items.len()));
            path.truncate(mark);
        }
        scalar => {
            if let Some(leaf) = Leaf::scalar(scalar) {
                visit(path, leaf);
            }
        }
    }
}

/// Collect all leaves into owned `(path, text)` pairs. Mostly for tests and
/// diagnostics; hot paths use [`visit_leaves`].
pub fn flatten_leaves(value: &Value, index_threshold: usize) -> Vec<(String, String)> {
    let mut leaves = Vec::new();
    visit_leaves(value, index_threshold, &mut |path, leaf| {
        leaves.push((path.to_string(), leaf.text.into_owned()));
    });
    leaves
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects_and_small_arrays() {
        let sample = json!({
            "Player": {"Speed": 101.5, "InPits": false},
            "Vehicles": [{"Id": 1}, {"Id": 2, "Name": null}],
            "Track": "Sebring"
        });
        let leaves = flatten_leaves(&sample, 256);
        assert_eq!(
            leaves,
            vec![
                ("Player.Speed".to_string(), "101.5".to_string()),
                ("Player.InPits".to_string(), "false".to_string()),
                ("Vehicles[0].Id".to_string(), "1".to_string()),
                ("Vehicles[1].Id".to_string(), "2".to_string()),
                ("Vehicles[1].Name".to_string(), "null".to_string()),
                ("Track".to_string(), "Sebring".to_string()),
            ]
        );
    }

    #[test]
    fn large_arrays_collapse_to_length() {
        let sample = json!({"Trace": [0, 1, 2, 3]});
        let mut seen = Vec::new();
        visit_leaves(&sample, 3, &mut |path, leaf| {
            seen.push((path.to_string(), leaf.text.into_owned(), leaf.numeric))
        });
        assert_eq!(seen, vec![("Trace.length".to_string(), "4".to_string(), Some(4.0))]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let sample = json!({"Slots": [7, 8, 9]});
        let leaves = flatten_leaves(&sample, 3);
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[2].0, "Slots[2]");
    }

    #[test]
    fn empty_containers_have_no_leaves() {
        assert!(flatten_leaves(&json!({"a": {}, "b": []}), 256).is_empty());
    }

    #[test]
    fn number_text_keeps_source_spelling() {
        let sample: Value = serde_json::from_str(r#"{"a":1.50,"b":1e2,"c":-0.0}"#).unwrap();
        let leaves = flatten_leaves(&sample, 256);
        let texts: Vec<&str> = leaves.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(texts, ["1.50", "1e2", "-0.0"]);
        assert_eq!(Leaf::scalar(&sample["b"]).unwrap().numeric, Some(100.0));
    }

    #[test]
    fn numbers_carry_numeric_value() {
        let value = json!(-3);
        let leaf = Leaf::scalar(&value).expect("scalar");
        assert_eq!(leaf.text, "-3");
        assert_eq!(leaf.numeric, Some(-3.0));
        assert_eq!(Leaf::scalar(&json!("12")).unwrap().numeric, None);
        assert!(Leaf::scalar(&json!([1])).is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }
}
