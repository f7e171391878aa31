use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use guardrail_core::{Rule, RuleSet};
use guardrail_engine::OperatorKind;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a JSON file containing an array of rule rows.
    #[arg(long)]
    ruleset: PathBuf,
}

pub fn run(args: &CheckArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.ruleset).with_context(|| format!("reading {}", args.ruleset.display()))?;
    let rules: Vec<Rule> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", args.ruleset.display()))?;

    for rule in &rules {
        if OperatorKind::from_id(rule.operator_id).is_none() {
            anyhow::bail!("rule at sequence {} references unknown operator id {}", rule.sequence, rule.operator_id);
        }
    }

    let set = RuleSet::new(rules);
    println!("ok: {} rules, fingerprint {:x}", set.len(), set.fingerprint());
    Ok(())
}
