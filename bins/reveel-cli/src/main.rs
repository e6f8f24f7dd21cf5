//! reveel-cli — Replay revenue path scenarios.
//!
//! Builds a registry from configuration, creates the path a scenario
//! describes, replays its deposits, settlements, releases and mutations
//! against an in-memory ledger, and prints a JSON report.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use reveel_registry::RegistryConfig;
use scenario::{Runner, Scenario};

/// Reveel revenue path simulator.
#[derive(Parser)]
#[command(name = "reveel-cli")]
#[command(version, about = "Replay revenue path scenarios against an in-memory ledger")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the resulting state as JSON.
    Simulate(SimulateArgs),
    /// Check a scenario's path parameters without running it.
    Validate(ValidateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Scenario file (JSON).
    #[arg(short, long)]
    scenario: PathBuf,

    /// Registry config file (default: <config dir>/reveel/registry.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop at the first failing step.
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Scenario file (JSON).
    #[arg(short, long)]
    scenario: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Validate(args) => validate(args),
    }
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    let config_path = args
        .config
        .unwrap_or_else(|| RegistryConfig::default_path(dirs::config_dir()));
    let config = scenario.registry_config(Some(&config_path))?;

    info!(scenario = %args.scenario.display(), steps = scenario.steps.len(), "simulating");
    let report = Runner::new(&scenario, &config)?.run(&scenario.steps, args.strict)?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let scenario = Scenario::from_file(&args.scenario)?;
    scenario
        .path
        .validate()
        .with_context(|| format!("Invalid path parameters in {}", args.scenario.display()))?;
    println!("ok: {} ({} tiers)", scenario.path.name, scenario.path.wallet_lists.len());
    Ok(())
}

/// Initialize tracing with the given level and output format.
///
/// Logs go to stderr so the JSON report on stdout stays clean. `RUST_LOG`
/// overrides `level_str` when set.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
