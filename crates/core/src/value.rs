use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamically-typed value produced by resolving a data-source path or by
/// parsing a rule's `criteria` literal.
///
/// Every source payload, resolved target, and criteria literal in the
/// engine is represented uniformly as a `Value` instead of threading
/// `serde_json::Value` through the evaluation path — this keeps the
/// operator library's pattern matches exhaustive and lets numeric
/// coercion (string-that-looks-like-a-number, int-vs-float) live in one
/// place (see [`Value::as_f64`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Convert a parsed `serde_json::Value` into a `Value`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => {
                Self::Array(arr.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                Self::Object(obj.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    /// `true` iff this value represents "no value": neither `Null` nor an
    /// empty string.
    pub fn exists(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Look up a field by name on an `Object`. Returns `None` for any other
    /// variant (callers distinguish "no such field" from "field is null"
    /// via the `Option`, matching the resolver's "missing field" error).
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(name),
            _ => None,
        }
    }

    /// Coerce to `f64` for numeric operators. Accepts `Int`, `Float`, and
    /// numeric-looking `String`s, since upstream payload fields are often
    /// stringly-typed numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Coerce to a display string, used by `regex` and string comparison
    /// operators which accept any scalar.
    pub fn as_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Object(_) => {
                serde_json::to_string(&Self::into_json(self.clone())).unwrap_or_default()
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns a human-readable name for the value's type, used in error
    /// messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    fn into_json(value: Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::into_json(v))).collect(),
            ),
        }
    }
}
