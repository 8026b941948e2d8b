//! fleetvol - trading volume simulator for a fleet of ledger accounts
//!
//! Provisions a fleet of accounts from one funded primary account, seeds
//! each with a slice of a secondary asset, then runs one trading agent per
//! account until shut down.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use fleetvol::agents::{FleetSupervisor, SupervisorExit};
//! use fleetvol::ledger::{LedgerClient, PaperLedger};
//! use fleetvol::models::{FleetvolConfig, ResolvedConfig};
//! ```

pub use fleetvol_agents as agents;
pub use fleetvol_ledger as ledger;
pub use fleetvol_models as models;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fleetvol_agents::FleetSupervisor;
use fleetvol_ledger::{LedgerClient, PaperLedger};
use fleetvol_models::{FleetvolConfig, ResolvedConfig};
use tracing::info;

/// Read the TOML file at `path` and overlay environment overrides from
/// `lookup`. The result is not yet validated.
pub fn load_config<F>(path: &Path, lookup: F) -> Result<FleetvolConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let mut config: FleetvolConfig =
        toml::from_str(&raw).with_context(|| "Failed to parse fleetvol config")?;
    config
        .apply_env_overrides(lookup)
        .context("Invalid environment override")?;
    Ok(config)
}

/// Build the paper ledger described by `config.paper`, with the primary
/// account holding its starting balances.
pub async fn build_ledger(config: &ResolvedConfig) -> Result<Arc<PaperLedger>> {
    let paper = &config.paper;
    let secondary = &config.network.secondary_asset;
    let ledger = Arc::new(PaperLedger::new(paper.transfer_fee));
    ledger.register_asset(secondary, paper.secondary_decimals);

    let primary = ledger
        .account_from_secret(config.network.primary_secret_key.as_bytes())
        .await
        .context("Failed to load primary account")?;
    ledger
        .credit_native(primary.address(), paper.primary_native_balance)
        .context("Failed to credit the primary's native balance")?;
    ledger
        .mint(&primary, secondary, paper.primary_secondary_balance)
        .context("Failed to mint the primary's secondary balance")?;

    info!(
        endpoint = %config.network.rpc_url,
        native_asset = %config.network.native_asset,
        primary = %primary.address(),
        native = paper.primary_native_balance,
        secondary = paper.primary_secondary_balance,
        "Paper ledger ready"
    );
    Ok(ledger)
}

/// Build a supervisor over a fresh paper ledger.
pub async fn build_supervisor(config: ResolvedConfig) -> Result<FleetSupervisor> {
    let ledger: Arc<dyn LedgerClient> = build_ledger(&config).await?;
    FleetSupervisor::new(ledger, config).context("Failed to build supervisor")
}
