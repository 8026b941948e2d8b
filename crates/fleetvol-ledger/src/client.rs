use std::fmt;

use async_trait::async_trait;
use fleetvol_models::{Account, Address, AssetId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A per-account, per-asset record that must exist before the account can
/// receive that asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldingHandle(String);

impl HoldingHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HoldingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How settled a transaction must be before it is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finality {
    Confirmed,
    Finalized,
}

impl fmt::Display for Finality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Finality::Confirmed => "confirmed",
            Finality::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// A transfer request. Amounts are integer minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Native {
        from: Address,
        to: Address,
        amount: u64,
    },
    Asset {
        from_holding: HoldingHandle,
        to_holding: HoldingHandle,
        authority: Address,
        amount: u64,
    },
}

impl Transfer {
    pub fn amount(&self) -> u64 {
        match self {
            Transfer::Native { amount, .. } | Transfer::Asset { amount, .. } => *amount,
        }
    }
}

/// Everything the fleet needs from the ledger network.
///
/// Implementations own the wire protocol and signing. They are shared across
/// all agents, so they must be safe to call concurrently.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Create a brand-new keypair. Nothing is written to the network.
    async fn generate_account(&self) -> Account;

    /// Rebuild an account from stored signing material.
    async fn account_from_secret(&self, secret: &[u8]) -> Result<Account, LedgerError>;

    /// Native balance in minor units.
    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Return the owner's holding for `asset`, creating it if absent.
    /// Calling this for an existing holding returns the same handle.
    async fn get_or_create_holding(
        &self,
        owner: &Account,
        asset: &AssetId,
    ) -> Result<HoldingHandle, LedgerError>;

    async fn get_holding_balance(&self, holding: &HoldingHandle) -> Result<u64, LedgerError>;

    async fn get_asset_decimals(&self, asset: &AssetId) -> Result<u32, LedgerError>;

    /// Sign and submit. The first signer pays the fee.
    async fn submit_transfer(
        &self,
        transfer: &Transfer,
        signers: &[&Account],
    ) -> Result<TransactionId, LedgerError>;

    async fn await_confirmation(
        &self,
        transaction: &TransactionId,
        finality: Finality,
    ) -> Result<(), LedgerError>;
}
