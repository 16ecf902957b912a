//! Triage CLI
//!
//! Diagnoses the configured workload, proposes a single fix and applies it
//! once the operator confirms. Exits non-zero when no fix could be found.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use triage::{Orchestrator, Ports, TriageConfig};

/// Workload triage agent - classifies a failing deployment and applies an approved fix
#[derive(Parser)]
#[command(name = "triage")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./triage.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("triage=debug,warn")
    } else {
        EnvFilter::new("triage=info,warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config =
        TriageConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env()
        .context("Invalid environment override")?;

    info!(
        namespace = %config.workload.namespace,
        deployment = %config.workload.deployment,
        container = %config.workload.container,
        "Starting triage run"
    );

    let ports = Ports::live(&config);
    let orchestrator =
        Orchestrator::new(&config, ports).context("Failed to assemble triage pipeline")?;

    match orchestrator.run().await {
        Ok(report) => Ok(ExitCode::from(report.outcome.exit_code())),
        Err(e) => {
            eprintln!("{} {e}", "Fix failed:".red().bold());
            Ok(ExitCode::FAILURE)
        }
    }
}
