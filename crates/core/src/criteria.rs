use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// A rule's `criteria` literal, parsed once when the ruleset is loaded
/// instead of re-parsed on every evaluation.
///
/// On the wire, criteria is a single string that may itself contain a
/// JSON scalar, a JSON array, a JSON object, or a raw (non-JSON) string
/// such as a regular expression. `Criteria::parse` normalizes all four
/// shapes up front so the operator library only ever matches on `Value`
/// variants, never re-parses a string at evaluation time. `Serialize`/
/// `Deserialize` round-trip through that same string form so a `Rule`
/// embedding a `Criteria` can be read from and written back to plain
/// JSON without a separate unwrapped representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria(pub Value);

impl Criteria {
    /// Parse a rule's raw `criteria` string.
    ///
    /// Tries to decode as JSON first (covers scalars, arrays, and
    /// objects). Falls back to treating the whole input as a literal
    /// string when it isn't valid JSON — e.g. a bare regex like
    /// `^[0-9]+$` that would fail JSON parsing because of its unescaped
    /// characters. A leading/trailing pair of straight quotes around the
    /// fallback string is stripped, matching the quote-stripping the
    /// `regex` operator otherwise has to do itself.
    pub fn parse(raw: &str) -> Self {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) {
            return Self(Value::from_json(json));
        }

        let trimmed = raw.trim();
        let stripped = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        Self(Value::String(stripped.to_owned()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Serialize for Criteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for Criteria {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Criteria::parse(&raw))
    }
}
