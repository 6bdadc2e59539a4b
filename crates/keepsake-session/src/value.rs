//! Values stored in a session.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// A single session value.
///
/// Serialized as plain JSON (`"a"`, `1`, `1.5`, `true`, `["x"]`, `{..}`) so
/// stored payloads stay readable by other clients of the same store.
/// Non-finite floats have no JSON form and fail to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    #[serde(serialize_with = "serialize_finite")]
    Float(f64),
    String(String),
    StringList(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Convert to a bool, defaulting to `false`.
    ///
    /// Strings accept the usual spellings (`"true"`, `"1"`, `"t"`, ...);
    /// numbers are true when non-zero.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "t" | "true" | "yes" | "y" | "on"
            ),
            Value::StringList(_) | Value::Map(_) => false,
        }
    }

    /// Convert to an integer, defaulting to `0`. Floats are truncated.
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Bool(b) => i64::from(*b),
            Value::Int(i) => *i,
            Value::Float(f) => *f as i64,
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            Value::StringList(_) | Value::Map(_) => 0,
        }
    }

    /// Convert to a float, defaulting to `0.0`.
    pub fn to_float(&self) -> f64 {
        match self {
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            Value::StringList(_) | Value::Map(_) => 0.0,
        }
    }

    /// Convert to a list of strings.
    ///
    /// A scalar becomes a one-element list; a map yields nothing.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            Value::StringList(list) => list.clone(),
            Value::Map(_) => Vec::new(),
            other => vec![other.to_string()],
        }
    }

    /// Borrow the nested map, if this is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

fn serialize_finite<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !v.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "float {v} cannot be stored in a session"
        )));
    }
    serializer.serialize_f64(*v)
}

impl fmt::Display for Value {
    /// Scalars print bare; lists and maps print as JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::StringList(_) | Value::Map(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                // A map holding a non-finite float has no JSON form
                Err(_) => write!(f, "{self:?}"),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringList(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::StringList(v.into_iter().map(String::from).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}
