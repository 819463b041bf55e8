//! allowance-manager binary: one decision pass per invocation.

use std::path::PathBuf;

use allowance_manager::config::{Config, DEFAULT_CONFIG_FILE};
use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Keeps a Sia renter allowance and host whitelist in line with fiat prices")]
struct Cli {
    /// Configuration file, created with defaults if missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Compute and log the decision without changing the node
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// `--quiet` wins, then `RUST_LOG`, then the verbosity flags.
fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else {
        let level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = Config::load_or_create(&cli.config).await?;
    let report = allowance_manager::run_once(config, cli.dry_run).await?;

    tracing::info!(
        rate = report.rate.fiat_per_coin(),
        admitted = report.filter.admitted.len(),
        hosts = report.filter.total(),
        decision = report.decision.label(),
        applied = report.applied,
        "run complete"
    );
    Ok(())
}
