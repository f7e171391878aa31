use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;
use crate::rule::RuleAction;
use crate::value::Value;

/// The result of evaluating a single rule or sub-rule.
///
/// `target`, `operator`, `evaluated_values`, and `criteria` record what
/// produced the verdict, not just the verdict itself — a caller reading
/// `message` alone can't tell which path or operator a `RESTRICT` came
/// from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(rename = "type")]
    pub type_: String,
    pub area: String,
    pub sequence: i64,
    pub target: Vec<String>,
    pub operator: String,
    pub evaluated_values: Vec<Value>,
    pub criteria: Option<Criteria>,
    pub action: RuleAction,
    pub message: String,
    pub passed: bool,
}

impl Outcome {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        type_: impl Into<String>,
        area: impl Into<String>,
        sequence: i64,
        target: Vec<String>,
        operator: impl Into<String>,
        evaluated_values: Vec<Value>,
        criteria: Option<Criteria>,
        action: RuleAction,
        message: impl Into<String>,
        passed: bool,
    ) -> Self {
        Self {
            type_: type_.into(),
            area: area.into(),
            sequence,
            target,
            operator: operator.into(),
            evaluated_values,
            criteria,
            action,
            message: message.into(),
            passed,
        }
    }
}

/// The full result of evaluating a ruleset against one request.
///
/// `warnings` and `restrictions` are derived from `outcomes` rather than
/// populated separately, so there is exactly one place that decides which
/// bucket an outcome belongs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub outcomes: Vec<Outcome>,
    /// `true` unless at least one outcome carried a `RESTRICT` action.
    pub passed: bool,
}

impl AggregateResult {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        let passed = !outcomes.iter().any(|o| o.action.is_restrict());
        Self { outcomes, passed }
    }

    /// Outcomes whose action is `WARN`.
    pub fn warnings(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, RuleAction::Warn))
    }

    /// Outcomes whose action is `RESTRICT`. Evaluation stops at the first
    /// one, so this is empty or a single element.
    pub fn restrictions(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, RuleAction::Restrict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(action: RuleAction) -> Outcome {
        Outcome::new(
            "app",
            "guardrail",
            1,
            vec!["test.field".into()],
            "exists",
            vec![Value::String("abc".into())],
            None,
            action,
            "msg",
            action != RuleAction::Restrict,
        )
    }

    #[test]
    fn passed_is_false_when_any_restriction_present() {
        let result = AggregateResult::new(vec![outcome(RuleAction::Continue), outcome(RuleAction::Restrict)]);
        assert!(!result.passed);
        assert_eq!(result.restrictions().count(), 1);
    }

    #[test]
    fn passed_is_true_with_only_warnings() {
        let result = AggregateResult::new(vec![outcome(RuleAction::Warn), outcome(RuleAction::Continue)]);
        assert!(result.passed);
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn empty_outcomes_pass() {
        let result = AggregateResult::new(vec![]);
        assert!(result.passed);
        assert_eq!(result.warnings().count(), 0);
        assert_eq!(result.restrictions().count(), 0);
    }
}
