//! Guardrail CLI
//!
//! A local, in-process tool for evaluating a ruleset against a JSON
//! dataset file without standing up the HTTP server.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "guardrail", version, about = "Evaluate guardrail rulesets locally")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a ruleset file against a datasets file and print the result.
    Eval(commands::eval::EvalArgs),
    /// Parse and validate a ruleset file without evaluating it.
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Eval(args) => commands::eval::run(&args).await,
        Command::Check(args) => commands::check::run(&args),
    }
}
