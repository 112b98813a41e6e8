//! Field path construction and wildcard normalization
//!
//! Paths are dotted property names with literal array indices, e.g.
//! `Vehicles[3].Position.X`. The schema tree uses `[*]` for the merged
//! element node, and the wildcard view maps every literal index to `[*]`.

use std::borrow::Cow;

/// Placeholder segment for "any array index".
pub const WILDCARD_INDEX: &str = "[*]";

/// Suffix for the tracked length of arrays above the index threshold.
pub const LENGTH_FIELD: &str = "length";

/// Append a property name to `path` in place.
pub fn push_field(path: &mut String, name: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(name);
}

/// Append a literal array index to `path` in place.
pub fn push_index(path: &mut String, index: usize) {
    use std::fmt::Write;
    // Writing into a String cannot fail.
    let _ = write!(path, "[{index}]");
}

/// Path of property `name` under `parent`.
pub fn child_path(parent: &str, name: &str) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 1);
    path.push_str(parent);
    push_field(&mut path, name);
    path
}

/// Path of the merged element node under array path `parent`.
pub fn element_path(parent: &str) -> String {
    format!("{parent}{WILDCARD_INDEX}")
}

/// Replace every `[<digits>]` segment with `[*]`.
///
/// Returns the input unchanged (borrowed) when it has no literal indices.
pub fn wildcard_path(path: &str) -> Cow<'_, str> {
    let bytes = path.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            let digits = bytes[i + 1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            let close = i + 1 + digits;
            if digits > 0 && bytes.get(close) == Some(&b']') {
                let buf = out.get_or_insert_with(|| String::with_capacity(path.len()));
                buf.push_str(&path[copied..i]);
                buf.push_str(WILDCARD_INDEX);
                i = close + 1;
                copied = i;
                continue;
            }
        }
        i += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&path[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(path),
    }
}

/// Whether the path contains a wildcard or literal index segment.
pub fn is_array_path(path: &str) -> bool {
    wildcard_path(path).contains(WILDCARD_INDEX)
}
