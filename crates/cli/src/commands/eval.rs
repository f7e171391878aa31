use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use guardrail_core::{Rule, RuleSet, Value};
use guardrail_engine::{CancellationFlag, GuardrailService};
use guardrail_sources::DataSourceBag;

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Path to a JSON file containing an array of rule rows.
    #[arg(long)]
    ruleset: PathBuf,

    /// Path to a JSON file mapping source name to its payload object.
    #[arg(long)]
    datasets: PathBuf,
}

pub async fn run(args: &EvalArgs) -> Result<()> {
    let rules = load_rules(&args.ruleset)?;
    let bag = load_bag(&args.datasets)?;

    let rule_set = RuleSet::new(rules);
    let result = GuardrailService::new().evaluate(&rule_set, &bag, &CancellationFlag::new())?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn load_rules(path: &PathBuf) -> Result<Vec<Rule>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing ruleset from {}", path.display()))
}

fn load_bag(path: &PathBuf) -> Result<DataSourceBag> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).with_context(|| format!("parsing datasets from {}", path.display()))?;

    let mut bag = DataSourceBag::new();
    for (name, payload) in parsed {
        bag.insert(name, Value::from_json(payload));
    }
    Ok(bag)
}
