use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleetvol::agents::SupervisorExit;

#[derive(Parser, Debug)]
#[command(
    name = "fleetvol",
    about = "Fleet volume simulator - provisions a fleet of ledger accounts and trades between them until stopped"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/fleetvol.toml")]
    config: PathBuf,

    /// Seed every random draw for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of accounts to provision
    #[arg(short = 'n', long)]
    num_accounts: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = fleetvol::load_config(&cli.config, |key| std::env::var(key).ok())?;
    if let Some(seed) = cli.seed {
        config.fleet.seed = Some(seed);
    }
    if let Some(count) = cli.num_accounts {
        config.fleet.num_accounts = Some(count);
    }
    let config = config.resolve().context("Invalid configuration")?;

    let supervisor = fleetvol::build_supervisor(config).await?;
    let cancel = supervisor.cancel_token();

    // Handle shutdown signals
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    match supervisor
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Setup failed: {e}"))?
    {
        SupervisorExit::Cancelled => tracing::info!("Stopped before trading started"),
        SupervisorExit::Stopped(report) => tracing::info!(
            agents = report.agents,
            cycles = report.cycles,
            successes = report.successes,
            give_ups = report.give_ups,
            "Simulation finished"
        ),
    }

    Ok(())
}
