//! JSON value kinds and kind sets

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Kind of a JSON value as observed in a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    /// JSON object
    Object = 0,
    /// JSON array
    Array = 1,
    /// JSON string
    String = 2,
    /// JSON number
    Number = 3,
    /// `true` or `false`
    Boolean = 4,
    /// `null`
    Null = 5,
}

impl ValueKind {
    /// All kinds in display order.
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Object,
        ValueKind::Array,
        ValueKind::String,
        ValueKind::Number,
        ValueKind::Boolean,
        ValueKind::Null,
    ];

    /// Kind of the supplied value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
        }
    }

    /// Lowercase name used in type descriptions.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grow-only set of observed value kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSet(u8);

impl KindSet {
    /// Empty set
    pub fn new() -> Self {
        Self(0)
    }

    /// Add a kind. There is no removal.
    pub fn insert(&mut self, kind: ValueKind) {
        self.0 |= kind.bit();
    }

    /// Whether the kind has been observed
    pub fn contains(&self, kind: ValueKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Number of distinct kinds observed
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether nothing has been observed yet
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every kind in `other` is also in `self`
    pub fn is_superset(&self, other: &KindSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Observed kinds in display order
    pub fn iter(&self) -> impl Iterator<Item = ValueKind> + '_ {
        ValueKind::ALL.into_iter().filter(|kind| self.contains(*kind))
    }

    /// Human-readable type: `unknown`, `T`, `T?` (nullable) or `T|U`.
    pub fn describe(&self) -> String {
        match self.len() {
            0 => "unknown".to_string(),
            1 => self.iter().map(ValueKind::as_str).collect(),
            _ => {
                let non_null: Vec<ValueKind> =
                    self.iter().filter(|k| *k != ValueKind::Null).collect();
                if non_null.len() == 1 && self.contains(ValueKind::Null) {
                    format!("{}?", non_null[0])
                } else {
                    self.iter()
                        .map(ValueKind::as_str)
                        .collect::<Vec<_>>()
                        .join("|")
                }
            }
        }
    }
}

impl FromIterator<ValueKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = ValueKind>>(iter: I) -> Self {
        let mut set = KindSet::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl Serialize for KindSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(ValueKind::as_str))
    }
}
