use std::sync::Arc;

use fleetvol_ledger::{Finality, LedgerClient, LedgerError, Transfer};
use fleetvol_models::{from_minor_units, Account, AssetId, Fleet, NATIVE_DECIMALS};
use tracing::info;

use crate::error::SetupError;

/// Creates and funds the fleet, one account at a time.
///
/// Each step depends on the previous one having landed, so nothing here
/// runs concurrently. The first failure aborts the whole fleet.
pub struct FleetProvisioner {
    ledger: Arc<dyn LedgerClient>,
    primary: Arc<Account>,
    secondary_asset: AssetId,
}

impl FleetProvisioner {
    pub fn new(ledger: Arc<dyn LedgerClient>, primary: Arc<Account>, secondary_asset: AssetId) -> Self {
        Self {
            ledger,
            primary,
            secondary_asset,
        }
    }

    pub async fn provision(&self, count: usize, funding_amount: u64) -> Result<Fleet, SetupError> {
        if count == 0 {
            return Err(SetupError::EmptyFleet);
        }

        let mut members = Vec::with_capacity(count);
        for index in 0..count {
            let account = self.ledger.generate_account().await;
            info!(index, account = %account.address(), "Generated new account");

            self.fund(index, &account, funding_amount).await?;
            info!(
                account = %account.address(),
                amount = %from_minor_units(funding_amount, NATIVE_DECIMALS).unwrap_or_default(),
                "Funded account"
            );

            self.ledger
                .get_or_create_holding(&account, &self.secondary_asset)
                .await
                .map_err(|source| SetupError::Provision {
                    index,
                    stage: "creating the secondary holding",
                    source,
                })?;
            info!(account = %account.address(), asset = %self.secondary_asset, "Initialized holding");

            members.push(Arc::new(account));
        }

        self.ledger
            .get_or_create_holding(&self.primary, &self.secondary_asset)
            .await
            .map_err(|source| SetupError::Provision {
                index: count,
                stage: "creating the primary's secondary holding",
                source,
            })?;
        info!(account = %self.primary.address(), "Initialized holding for primary account");

        Ok(Fleet::new(Arc::clone(&self.primary), members))
    }

    async fn fund(&self, index: usize, account: &Account, amount: u64) -> Result<(), SetupError> {
        let stage_err = move |stage: &'static str| {
            move |source: LedgerError| SetupError::Provision {
                index,
                stage,
                source,
            }
        };

        let transfer = Transfer::Native {
            from: self.primary.address().clone(),
            to: account.address().clone(),
            amount,
        };
        let transaction = self
            .ledger
            .submit_transfer(&transfer, &[self.primary.as_ref()])
            .await
            .map_err(stage_err("submitting the funding transfer"))?;
        self.ledger
            .await_confirmation(&transaction, Finality::Finalized)
            .await
            .map_err(stage_err("confirming the funding transfer"))?;
        Ok(())
    }
}
