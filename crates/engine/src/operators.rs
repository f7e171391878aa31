use guardrail_core::Value;
use regex::Regex;

use crate::error::EngineError;

/// One of the sixteen operators, addressable by its fixed id or by name.
/// Ids are part of the configuration contract and never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Exists,
    IsTrue,
    IsFalse,
    Regex,
    NumGt,
    NumGe,
    NumLt,
    NumLe,
    NumEq,
    NumNe,
    StrEq,
    StrNe,
    InSet,
    NotInSet,
    Between,
    DateTolerance,
}

impl OperatorKind {
    pub fn id(self) -> i64 {
        match self {
            Self::Exists => 1,
            Self::IsTrue => 2,
            Self::IsFalse => 3,
            Self::Regex => 4,
            Self::NumGt => 5,
            Self::NumGe => 6,
            Self::NumLt => 7,
            Self::NumLe => 8,
            Self::NumEq => 9,
            Self::NumNe => 10,
            Self::StrEq => 11,
            Self::StrNe => 12,
            Self::InSet => 13,
            Self::NotInSet => 14,
            Self::Between => 15,
            Self::DateTolerance => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
            Self::Regex => "regex",
            Self::NumGt => "num_>",
            Self::NumGe => "num_>=",
            Self::NumLt => "num_<",
            Self::NumLe => "num_<=",
            Self::NumEq => "num_=",
            Self::NumNe => "num_!=",
            Self::StrEq => "str_=",
            Self::StrNe => "str_!=",
            Self::InSet => "in_set",
            Self::NotInSet => "not_in_set",
            Self::Between => "between",
            Self::DateTolerance => "date_tolerance",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        ALL.iter().copied().find(|k| k.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|k| k.name() == name)
    }
}

const ALL: [OperatorKind; 16] = [
    OperatorKind::Exists,
    OperatorKind::IsTrue,
    OperatorKind::IsFalse,
    OperatorKind::Regex,
    OperatorKind::NumGt,
    OperatorKind::NumGe,
    OperatorKind::NumLt,
    OperatorKind::NumLe,
    OperatorKind::NumEq,
    OperatorKind::NumNe,
    OperatorKind::StrEq,
    OperatorKind::StrNe,
    OperatorKind::InSet,
    OperatorKind::NotInSet,
    OperatorKind::Between,
    OperatorKind::DateTolerance,
];

/// The fixed table of operators, addressable by id or name.
///
/// Operators are pure: given the same values and criteria they always
/// return the same boolean, and they never touch the cache or a record
/// store.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperatorLibrary;

impl OperatorLibrary {
    pub fn new() -> Self {
        Self
    }

    pub fn contains_id(&self, id: i64) -> bool {
        OperatorKind::from_id(id).is_some()
    }

    /// Evaluate a single-value operator. `criteria` is the parsed
    /// criteria value already resolved if it referenced a property path.
    pub fn evaluate(&self, kind: OperatorKind, value: &Value, criteria: Option<&Value>) -> Result<bool, EngineError> {
        match kind {
            OperatorKind::Exists => Ok(value.exists()),
            OperatorKind::IsTrue => Ok(matches!(value, Value::Bool(true))),
            OperatorKind::IsFalse => Ok(matches!(value, Value::Bool(false))),
            OperatorKind::Regex => eval_regex(value, criteria, kind),
            OperatorKind::NumGt => eval_numeric(value, criteria, kind, |a, b| a > b),
            OperatorKind::NumGe => eval_numeric(value, criteria, kind, |a, b| a >= b),
            OperatorKind::NumLt => eval_numeric(value, criteria, kind, |a, b| a < b),
            OperatorKind::NumLe => eval_numeric(value, criteria, kind, |a, b| a <= b),
            OperatorKind::NumEq => eval_numeric(value, criteria, kind, |a, b| (a - b).abs() < f64::EPSILON),
            OperatorKind::NumNe => eval_numeric(value, criteria, kind, |a, b| (a - b).abs() >= f64::EPSILON),
            OperatorKind::StrEq => eval_string(value, criteria, kind, |a, b| a == b),
            OperatorKind::StrNe => eval_string(value, criteria, kind, |a, b| a != b),
            OperatorKind::InSet => eval_set(value, criteria, kind, true),
            OperatorKind::NotInSet => eval_set(value, criteria, kind, false),
            OperatorKind::Between => eval_between(value, criteria, kind),
            OperatorKind::DateTolerance => Err(EngineError::InvalidCriteria {
                operator: kind.name(),
                reason: "date_tolerance requires two values; use evaluate_date_tolerance".into(),
            }),
        }
    }

    /// `date_tolerance` takes two resolved values (the two dates) instead
    /// of one, so it does not fit `evaluate`'s single-value shape.
    pub fn evaluate_date_tolerance(&self, values: &[Value], criteria: &Value) -> Result<bool, EngineError> {
        let [a, b] = values else {
            return Err(EngineError::InvalidCriteria {
                operator: "date_tolerance",
                reason: format!("expected exactly two values, got {}", values.len()),
            });
        };

        let parse = |v: &Value| -> Result<i64, EngineError> {
            v.as_str()
                .and_then(parse_timestamp)
                .ok_or_else(|| EngineError::InvalidCriteria {
                    operator: "date_tolerance",
                    reason: format!("'{}' is not a parseable date", v.as_display_string()),
                })
        };
        let (ts_a, ts_b) = (parse(a)?, parse(b)?);
        let day_diff = ((ts_a - ts_b).abs() as f64) / 86_400.0;

        let bounds = criteria.as_array().ok_or_else(|| EngineError::InvalidCriteria {
            operator: "date_tolerance",
            reason: "criteria must be an array of one or two numbers".into(),
        })?;

        match bounds {
            [min] => {
                let min = min.as_f64().ok_or_else(|| EngineError::InvalidCriteria {
                    operator: "date_tolerance",
                    reason: "bound is not numeric".into(),
                })?;
                Ok(day_diff >= min)
            }
            [min, max] => {
                let min = min.as_f64().ok_or_else(|| EngineError::InvalidCriteria {
                    operator: "date_tolerance",
                    reason: "lower bound is not numeric".into(),
                })?;
                let max = max.as_f64().ok_or_else(|| EngineError::InvalidCriteria {
                    operator: "date_tolerance",
                    reason: "upper bound is not numeric".into(),
                })?;
                Ok(day_diff >= min && day_diff <= max)
            }
            _ => Err(EngineError::InvalidCriteria {
                operator: "date_tolerance",
                reason: format!("criteria array must have length 1 or 2, got {}", bounds.len()),
            }),
        }
    }
}

fn require_criteria<'a>(criteria: Option<&'a Value>, kind: OperatorKind) -> Result<&'a Value, EngineError> {
    criteria.ok_or_else(|| EngineError::InvalidCriteria { operator: kind.name(), reason: "criteria is required".into() })
}

fn eval_regex(value: &Value, criteria: Option<&Value>, kind: OperatorKind) -> Result<bool, EngineError> {
    let criteria = require_criteria(criteria, kind)?;
    let pattern = criteria.as_str().ok_or_else(|| EngineError::InvalidCriteria {
        operator: kind.name(),
        reason: "criteria must be a string".into(),
    })?;
    let re = Regex::new(pattern)
        .map_err(|e| EngineError::InvalidCriteria { operator: kind.name(), reason: format!("invalid regex: {e}") })?;
    Ok(re.is_match(&value.as_display_string()))
}

fn eval_numeric(
    value: &Value,
    criteria: Option<&Value>,
    kind: OperatorKind,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<bool, EngineError> {
    let criteria = require_criteria(criteria, kind)?;
    let a = value
        .as_f64()
        .ok_or_else(|| EngineError::InvalidCriteria { operator: kind.name(), reason: "value is not numeric".into() })?;
    let b = criteria
        .as_f64()
        .ok_or_else(|| EngineError::InvalidCriteria { operator: kind.name(), reason: "criteria is not numeric".into() })?;
    Ok(cmp(a, b))
}

fn eval_string(
    value: &Value,
    criteria: Option<&Value>,
    kind: OperatorKind,
    cmp: impl Fn(&str, &str) -> bool,
) -> Result<bool, EngineError> {
    let criteria = require_criteria(criteria, kind)?;
    let b = criteria.as_str().ok_or_else(|| EngineError::InvalidCriteria {
        operator: kind.name(),
        reason: "criteria must be a string".into(),
    })?;
    Ok(cmp(&value.as_display_string(), b))
}

fn eval_set(value: &Value, criteria: Option<&Value>, kind: OperatorKind, membership: bool) -> Result<bool, EngineError> {
    let criteria = require_criteria(criteria, kind)?;
    let set = criteria.as_array().ok_or_else(|| EngineError::InvalidCriteria {
        operator: kind.name(),
        reason: "criteria must be a JSON array".into(),
    })?;
    let found = set.iter().any(|item| values_loosely_equal(item, value));
    Ok(found == membership)
}

fn eval_between(value: &Value, criteria: Option<&Value>, kind: OperatorKind) -> Result<bool, EngineError> {
    let criteria = require_criteria(criteria, kind)?;
    let from = criteria.field("from").and_then(Value::as_f64).ok_or_else(|| EngineError::InvalidCriteria {
        operator: kind.name(),
        reason: "criteria.from is missing or not numeric".into(),
    })?;
    let to = criteria.field("to").and_then(Value::as_f64).ok_or_else(|| EngineError::InvalidCriteria {
        operator: kind.name(),
        reason: "criteria.to is missing or not numeric".into(),
    })?;
    let value = value
        .as_f64()
        .ok_or_else(|| EngineError::InvalidCriteria { operator: kind.name(), reason: "value is not numeric".into() })?;
    Ok(value >= from && value <= to)
}

fn values_loosely_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return (x - y).abs() < f64::EPSILON;
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Parse a date string into Unix seconds. Tries RFC 3339 first (covers
/// full timestamps), then a bare `YYYY-MM-DD` date at midnight UTC.
fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_ids_are_stable() {
        assert_eq!(OperatorKind::Exists.id(), 1);
        assert_eq!(OperatorKind::DateTolerance.id(), 16);
        assert_eq!(OperatorKind::from_id(4), Some(OperatorKind::Regex));
        assert_eq!(OperatorKind::from_name("between"), Some(OperatorKind::Between));
        assert_eq!(OperatorKind::from_id(999), None);
    }

    #[test]
    fn exists_is_false_for_null_and_empty_string() {
        let lib = OperatorLibrary::new();
        assert!(!lib.evaluate(OperatorKind::Exists, &Value::Null, None).unwrap());
        assert!(lib.evaluate(OperatorKind::Exists, &Value::String("abc".into()), None).unwrap());
    }

    #[test]
    fn regex_matches_after_coercion_to_string() {
        let lib = OperatorLibrary::new();
        let criteria = Value::String(r"^\d+$".into());
        assert!(lib.evaluate(OperatorKind::Regex, &Value::Int(42), Some(&criteria)).unwrap());
        assert!(!lib.evaluate(OperatorKind::Regex, &Value::String("abc".into()), Some(&criteria)).unwrap());
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let lib = OperatorLibrary::new();
        let criteria = Value::String("(unterminated".into());
        assert!(lib.evaluate(OperatorKind::Regex, &Value::String("x".into()), Some(&criteria)).is_err());
    }

    #[test]
    fn between_is_inclusive() {
        let lib = OperatorLibrary::new();
        let mut obj = std::collections::BTreeMap::new();
        obj.insert("from".to_owned(), Value::Int(50));
        obj.insert("to".to_owned(), Value::Int(200));
        let criteria = Value::Object(obj);
        assert!(lib.evaluate(OperatorKind::Between, &Value::Int(200), Some(&criteria)).unwrap());
        assert!(!lib.evaluate(OperatorKind::Between, &Value::Int(250), Some(&criteria)).unwrap());
    }

    #[test]
    fn in_set_and_not_in_set_are_complementary() {
        let lib = OperatorLibrary::new();
        let criteria = Value::Array(vec![Value::String("a".into()), Value::String("b".into())]);
        assert!(lib.evaluate(OperatorKind::InSet, &Value::String("a".into()), Some(&criteria)).unwrap());
        assert!(!lib.evaluate(OperatorKind::NotInSet, &Value::String("a".into()), Some(&criteria)).unwrap());
        assert!(!lib.evaluate(OperatorKind::InSet, &Value::String("z".into()), Some(&criteria)).unwrap());
    }

    #[test]
    fn date_tolerance_single_bound_is_inclusive_lower_bound() {
        let lib = OperatorLibrary::new();
        let values = [Value::String("2023-01-01".into()), Value::String("2023-01-05".into())];
        let criteria = Value::Array(vec![Value::Int(4)]);
        assert!(lib.evaluate_date_tolerance(&values, &criteria).unwrap());
        let criteria = Value::Array(vec![Value::Int(5)]);
        assert!(!lib.evaluate_date_tolerance(&values, &criteria).unwrap());
    }

    #[test]
    fn date_tolerance_two_bounds_is_an_inclusive_range() {
        let lib = OperatorLibrary::new();
        let values = [Value::String("2023-01-01".into()), Value::String("2023-01-05".into())];
        let criteria = Value::Array(vec![Value::Int(10), Value::Int(30)]);
        assert!(!lib.evaluate_date_tolerance(&values, &criteria).unwrap());
    }

    #[test]
    fn date_tolerance_rejects_unparseable_dates() {
        let lib = OperatorLibrary::new();
        let values = [Value::String("not-a-date".into()), Value::String("2023-01-05".into())];
        let criteria = Value::Array(vec![Value::Int(1)]);
        assert!(lib.evaluate_date_tolerance(&values, &criteria).is_err());
    }

    #[test]
    fn date_tolerance_rejects_criteria_with_wrong_arity() {
        let lib = OperatorLibrary::new();
        let values = [Value::String("2023-01-01".into()), Value::String("2023-01-05".into())];
        let criteria = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(lib.evaluate_date_tolerance(&values, &criteria).is_err());
    }
}
