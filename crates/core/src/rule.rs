use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;

/// The policy applied when a rule's primary predicate passes or fails.
///
/// `RESTRICT` is blocking and short-circuits further rule evaluation;
/// `WARN` is advisory; `CONTINUE` has no effect on control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    Continue,
    Warn,
    Restrict,
}

impl RuleAction {
    /// `true` for the one action that halts further rule iteration.
    pub fn is_restrict(self) -> bool {
        matches!(self, Self::Restrict)
    }
}

/// A nested rule fragment evaluated only after its parent rule's primary
/// predicate has passed.
///
/// The sub-rule's own pass is silent; its failure appends one additional
/// `Outcome` using `on_fail` as the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRule {
    /// One or more dotted property paths to resolve; multi-value
    /// operators such as `date_tolerance` require two.
    pub depends: Vec<String>,
    /// Operator looked up by name rather than id.
    pub operator_name: String,
    /// Parsed criteria, literal or containing a property-path reference.
    pub criteria: Option<Criteria>,
    pub on_fail: RuleAction,
    /// Overrides the default failure message when set.
    pub fail: Option<String>,
}

/// One evaluation step within a ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub type_: String,
    pub area: String,
    /// Execution order within the ruleset; ties break by insertion order
    /// (the order rows were returned by the configuration store).
    pub sequence: i64,
    /// One or more dotted paths. A single element yields a scalar value
    /// to the operator; multiple elements yield an ordered sequence.
    pub target: Vec<String>,
    pub operator_id: i64,
    pub criteria: Option<Criteria>,
    pub sub_rule: Option<SubRule>,
    pub on_pass: RuleAction,
    pub on_fail: RuleAction,
    pub pass: String,
    pub fail: String,
    pub warn: String,
}

/// The ordered collection of [`Rule`]s sharing one `(type, area)` pair.
///
/// `sequence` defines a total order used for execution; the constructor
/// performs a stable sort so rules sharing a `sequence` value retain the
/// order they arrived in from the configuration store, matching the
/// "ties are broken by insertion order" invariant.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a ruleset, sorting by `sequence` (stable, so insertion order
    /// is the tie-break).
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.sequence);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// A cheap fingerprint of the ruleset's shape, for cache-invalidation
    /// tests and diagnostics. Changes whenever a rule's identity-bearing
    /// fields change.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for rule in &self.rules {
            rule.type_.hash(&mut hasher);
            rule.area.hash(&mut hasher);
            rule.sequence.hash(&mut hasher);
            rule.operator_id.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(sequence: i64, operator_id: i64) -> Rule {
        Rule {
            type_: "app".into(),
            area: "guardrail".into(),
            sequence,
            target: vec!["test.field".into()],
            operator_id,
            criteria: None,
            sub_rule: None,
            on_pass: RuleAction::Continue,
            on_fail: RuleAction::Restrict,
            pass: "ok".into(),
            fail: "bad".into(),
            warn: String::new(),
        }
    }

    #[test]
    fn rule_set_sorts_by_sequence() {
        let set = RuleSet::new(vec![rule(3, 1), rule(1, 2), rule(2, 3)]);
        let sequences: Vec<i64> = set.rules().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn rule_set_stable_sort_preserves_insertion_order_for_ties() {
        let mut a = rule(15, 1);
        a.pass = "first".into();
        let mut b = rule(15, 2);
        b.pass = "second".into();
        let set = RuleSet::new(vec![a, b]);
        assert_eq!(set.rules()[0].pass, "first");
        assert_eq!(set.rules()[1].pass, "second");
    }

    #[test]
    fn restrict_halts_iteration() {
        assert!(RuleAction::Restrict.is_restrict());
        assert!(!RuleAction::Warn.is_restrict());
        assert!(!RuleAction::Continue.is_restrict());
    }

    #[test]
    fn fingerprint_changes_with_operator_id() {
        let a = RuleSet::new(vec![rule(1, 1)]);
        let b = RuleSet::new(vec![rule(1, 2)]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
