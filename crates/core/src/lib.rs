//! Data model shared by every guardrail crate: the dynamically-typed
//! [`Value`], parsed rule [`criteria`], the [`rule::Rule`]/[`rule::RuleSet`]
//! shapes loaded from configuration, and the [`outcome::Outcome`]/
//! [`outcome::AggregateResult`] produced by evaluation.

pub mod criteria;
pub mod error;
pub mod outcome;
pub mod rule;
pub mod value;

pub use criteria::Criteria;
pub use error::GuardrailError;
pub use outcome::{AggregateResult, Outcome};
pub use rule::{Rule, RuleAction, RuleSet, SubRule};
pub use value::Value;
