use guardrail_core::{AggregateResult, GuardrailError, Outcome, Rule, RuleAction, RuleSet, SubRule, Value};
use guardrail_sources::{DataSourceBag, DataSourceResolver};
use tracing::{instrument, warn};

use crate::cancellation::CancellationFlag;
use crate::error::EngineError;
use crate::operators::{OperatorKind, OperatorLibrary};

/// Orchestrates one ruleset evaluation: sequencing, target/criteria
/// resolution, operator dispatch, sub-rules, and short-circuit on the
/// first `RESTRICT` outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardrailService {
    operators: OperatorLibrary,
}

impl GuardrailService {
    pub fn new() -> Self {
        Self { operators: OperatorLibrary::new() }
    }

    /// Evaluate every rule in `rule_set`, in `sequence` order, against
    /// `bag`. Stops at the first `RESTRICT` outcome. Only cancellation
    /// aborts the whole evaluation; every other fault becomes a
    /// `FAIL`/`RESTRICT` outcome and evaluation continues to short-circuit
    /// through the normal path.
    #[instrument(skip_all)]
    pub fn evaluate(
        &self,
        rule_set: &RuleSet,
        bag: &DataSourceBag,
        cancellation: &CancellationFlag,
    ) -> Result<AggregateResult, GuardrailError> {
        let resolver = DataSourceResolver::new(bag);
        let mut outcomes = Vec::new();

        for rule in rule_set.rules() {
            if cancellation.is_cancelled() {
                return Err(GuardrailError::Cancelled);
            }

            self.evaluate_rule(rule, &resolver, &mut outcomes);

            if outcomes.last().is_some_and(|o| o.action.is_restrict()) {
                break;
            }
        }

        Ok(AggregateResult::new(outcomes))
    }

    fn evaluate_rule(&self, rule: &Rule, resolver: &DataSourceResolver<'_>, outcomes: &mut Vec<Outcome>) {
        let Some(kind) = OperatorKind::from_id(rule.operator_id) else {
            outcomes.push(Outcome::new(
                &rule.type_,
                &rule.area,
                rule.sequence,
                rule.target.clone(),
                format!("operator_id:{}", rule.operator_id),
                Vec::new(),
                rule.criteria.clone(),
                RuleAction::Restrict,
                "Unknown operator",
                false,
            ));
            return;
        };

        // Resolution faults (missing data, unknown source) always restrict,
        // regardless of the rule's configured `on_fail` — only the
        // predicate's own false result honors `on_fail`.
        let values = match resolve_target(&rule.target, resolver) {
            Ok(v) => v,
            Err(message) => {
                outcomes.push(Outcome::new(
                    &rule.type_,
                    &rule.area,
                    rule.sequence,
                    rule.target.clone(),
                    kind.name(),
                    Vec::new(),
                    rule.criteria.clone(),
                    RuleAction::Restrict,
                    message_or(&rule.fail, &message),
                    false,
                ));
                return;
            }
        };

        let criteria = match resolve_criteria(kind, rule.criteria.as_ref().map(|c| c.as_value()), resolver) {
            Ok(v) => v,
            Err(message) => {
                outcomes.push(Outcome::new(
                    &rule.type_,
                    &rule.area,
                    rule.sequence,
                    rule.target.clone(),
                    kind.name(),
                    values.clone(),
                    rule.criteria.clone(),
                    RuleAction::Restrict,
                    message_or(&rule.fail, &message),
                    false,
                ));
                return;
            }
        };

        let passed = match invoke(&self.operators, kind, &values, criteria.as_ref()) {
            Ok(b) => b,
            Err(e) => {
                warn!(operator = kind.name(), error = %e, "operator evaluation failed");
                outcomes.push(Outcome::new(
                    &rule.type_,
                    &rule.area,
                    rule.sequence,
                    rule.target.clone(),
                    kind.name(),
                    values.clone(),
                    rule.criteria.clone(),
                    RuleAction::Restrict,
                    e.to_string(),
                    false,
                ));
                return;
            }
        };

        if passed {
            outcomes.push(Outcome::new(
                &rule.type_,
                &rule.area,
                rule.sequence,
                rule.target.clone(),
                kind.name(),
                values.clone(),
                rule.criteria.clone(),
                rule.on_pass,
                rule.pass.clone(),
                true,
            ));
            if let Some(sub_rule) = &rule.sub_rule {
                self.evaluate_sub_rule(rule, sub_rule, resolver, outcomes);
            }
        } else {
            outcomes.push(Outcome::new(
                &rule.type_,
                &rule.area,
                rule.sequence,
                rule.target.clone(),
                kind.name(),
                values,
                rule.criteria.clone(),
                rule.on_fail,
                rule.fail.clone(),
                false,
            ));
        }
    }

    /// A sub-rule's own pass is silent; only its failure produces an
    /// outcome, placed immediately after its parent's.
    fn evaluate_sub_rule(&self, parent: &Rule, sub_rule: &SubRule, resolver: &DataSourceResolver<'_>, outcomes: &mut Vec<Outcome>) {
        let Some(kind) = OperatorKind::from_name(&sub_rule.operator_name) else {
            outcomes.push(Outcome::new(
                &parent.type_,
                &parent.area,
                parent.sequence,
                sub_rule.depends.clone(),
                sub_rule.operator_name.clone(),
                Vec::new(),
                sub_rule.criteria.clone(),
                RuleAction::Restrict,
                "Unknown operator",
                false,
            ));
            return;
        };

        let values = match resolve_target(&sub_rule.depends, resolver) {
            Ok(v) => v,
            Err(message) => {
                let fail_message = sub_rule.fail.clone().unwrap_or(message);
                outcomes.push(Outcome::new(
                    &parent.type_,
                    &parent.area,
                    parent.sequence,
                    sub_rule.depends.clone(),
                    kind.name(),
                    Vec::new(),
                    sub_rule.criteria.clone(),
                    RuleAction::Restrict,
                    fail_message,
                    false,
                ));
                return;
            }
        };

        let criteria = match resolve_criteria(kind, sub_rule.criteria.as_ref().map(|c| c.as_value()), resolver) {
            Ok(v) => v,
            Err(message) => {
                let fail_message = sub_rule.fail.clone().unwrap_or(message);
                outcomes.push(Outcome::new(
                    &parent.type_,
                    &parent.area,
                    parent.sequence,
                    sub_rule.depends.clone(),
                    kind.name(),
                    values.clone(),
                    sub_rule.criteria.clone(),
                    RuleAction::Restrict,
                    fail_message,
                    false,
                ));
                return;
            }
        };

        let passed = match invoke(&self.operators, kind, &values, criteria.as_ref()) {
            Ok(b) => b,
            Err(e) => {
                let fail_message = sub_rule.fail.clone().unwrap_or_else(|| e.to_string());
                outcomes.push(Outcome::new(
                    &parent.type_,
                    &parent.area,
                    parent.sequence,
                    sub_rule.depends.clone(),
                    kind.name(),
                    values.clone(),
                    sub_rule.criteria.clone(),
                    RuleAction::Restrict,
                    fail_message,
                    false,
                ));
                return;
            }
        };

        if !passed {
            let fail_message = sub_rule.fail.clone().unwrap_or_default();
            outcomes.push(Outcome::new(
                &parent.type_,
                &parent.area,
                parent.sequence,
                sub_rule.depends.clone(),
                kind.name(),
                values,
                sub_rule.criteria.clone(),
                sub_rule.on_fail,
                fail_message,
                false,
            ));
        }
    }
}

fn message_or(configured: &str, fallback: &str) -> String {
    if configured.is_empty() {
        fallback.to_owned()
    } else {
        configured.to_owned()
    }
}

/// Resolve a rule's (or sub-rule's) target/depends descriptor: a single
/// path yields one value, multiple paths yield an ordered sequence.
fn resolve_target(paths: &[String], resolver: &DataSourceResolver<'_>) -> Result<Vec<Value>, String> {
    match paths {
        [] => Err("target has no paths".to_owned()),
        [single] => resolver.walk(single).map(|v| vec![v]).map_err(|e| e.to_string()),
        many => many.iter().map(|p| resolver.walk(p).map_err(|e| e.to_string())).collect(),
    }
}

/// `date_tolerance`'s criteria array may contain property-path references
/// (strings containing `.`) alongside integer literals; every other
/// operator's criteria is used exactly as parsed at load time.
fn resolve_criteria(kind: OperatorKind, criteria: Option<&Value>, resolver: &DataSourceResolver<'_>) -> Result<Option<Value>, String> {
    let Some(criteria) = criteria else { return Ok(None) };

    if kind != OperatorKind::DateTolerance {
        return Ok(Some(criteria.clone()));
    }

    let Value::Array(items) = criteria else {
        return Ok(Some(criteria.clone()));
    };

    let resolved = items
        .iter()
        .map(|item| match item {
            Value::String(path) if path.contains('.') => resolver.walk(path).map_err(|e| e.to_string()),
            other => Ok(other.clone()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Value::Array(resolved)))
}

fn invoke(operators: &OperatorLibrary, kind: OperatorKind, values: &[Value], criteria: Option<&Value>) -> Result<bool, EngineError> {
    if kind == OperatorKind::DateTolerance {
        let criteria = criteria.ok_or_else(|| EngineError::InvalidCriteria { operator: kind.name(), reason: "criteria is required".into() })?;
        return operators.evaluate_date_tolerance(values, criteria);
    }

    let [value] = values else {
        return Err(EngineError::InvalidCriteria {
            operator: kind.name(),
            reason: format!("expected exactly one value, got {}", values.len()),
        });
    };
    operators.evaluate(kind, value, criteria)
}
