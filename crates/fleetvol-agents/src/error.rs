use fleetvol_ledger::LedgerError;
use fleetvol_models::{AmountError, AssetKind, ConfigError};
use thiserror::Error;

/// Failures before trading starts. Any of these ends the run.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid trading settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load primary account: {0}")]
    Primary(LedgerError),

    #[error("Fleet size must be at least 1")]
    EmptyFleet,

    #[error("Provisioning account #{index} failed while {stage}: {source}")]
    Provision {
        index: usize,
        stage: &'static str,
        source: LedgerError,
    },

    #[error("Distribution to {account} failed: {source}")]
    Distribution { account: String, source: LedgerError },

    #[error("Distribution amount error: {0}")]
    DistributionAmount(String),
}

/// Why a single trade attempt failed. Never escapes the executor.
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("Unsupported asset type: {0}")]
    UnsupportedAsset(AssetKind),

    #[error("Invalid trade amount: {0}")]
    Amount(#[from] AmountError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Fatal agent failures. The supervisor logs these and keeps the other
/// agents running.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Intent generator produced no trade for {0}")]
    NoIntent(String),
}
