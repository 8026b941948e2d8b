use std::sync::Arc;

use fleetvol_ledger::{Finality, LedgerClient, Transfer};
use fleetvol_models::{
    to_minor_units, Account, AssetId, AssetKind, Direction, TradeIntent, TradeOutcome,
    TransactionId, NATIVE_DECIMALS,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::TradeError;

/// Performs single transfers between fleet accounts.
///
/// `execute` never returns an error: every failure becomes
/// [`TradeOutcome::Failed`] and is logged here, so callers only branch on
/// the outcome.
pub struct TradeExecutor {
    ledger: Arc<dyn LedgerClient>,
    secondary_asset: AssetId,
}

impl TradeExecutor {
    pub fn new(ledger: Arc<dyn LedgerClient>, secondary_asset: AssetId) -> Self {
        Self {
            ledger,
            secondary_asset,
        }
    }

    /// Run one trade and wait for it to confirm.
    pub async fn execute(&self, intent: &TradeIntent) -> TradeOutcome {
        match self.try_execute(intent).await {
            Ok(transaction) => {
                info!(
                    trade = %intent.id,
                    sender = %intent.sender_address(),
                    receiver = %intent.receiver_address(),
                    asset = %intent.asset,
                    amount = %intent.amount,
                    transaction = %transaction,
                    "Trade successful"
                );
                TradeOutcome::Confirmed { transaction }
            }
            Err(e) => {
                warn!(
                    trade = %intent.id,
                    sender = %intent.sender_address(),
                    receiver = %intent.receiver_address(),
                    asset = %intent.asset,
                    amount = %intent.amount,
                    error = %e,
                    "Trade failed"
                );
                TradeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Boolean form of [`execute`](Self::execute) for a plain sender → receiver transfer.
    pub async fn execute_trade(
        &self,
        sender: &Arc<Account>,
        receiver: &Arc<Account>,
        asset: AssetKind,
        amount: Decimal,
    ) -> bool {
        let intent = TradeIntent::new(
            Arc::clone(sender),
            Arc::clone(receiver),
            Direction::Send,
            asset,
            amount,
        );
        self.execute(&intent).await.is_success()
    }

    async fn try_execute(&self, intent: &TradeIntent) -> Result<TransactionId, TradeError> {
        let sender = intent.sender.as_ref();
        let receiver = intent.receiver.as_ref();

        let transfer = match intent.asset {
            AssetKind::Native => Transfer::Native {
                from: sender.address().clone(),
                to: receiver.address().clone(),
                amount: to_minor_units(intent.amount, NATIVE_DECIMALS)?,
            },
            AssetKind::Secondary => {
                let from_holding = self
                    .ledger
                    .get_or_create_holding(sender, &self.secondary_asset)
                    .await?;
                let to_holding = self
                    .ledger
                    .get_or_create_holding(receiver, &self.secondary_asset)
                    .await?;
                let decimals = self.ledger.get_asset_decimals(&self.secondary_asset).await?;
                Transfer::Asset {
                    from_holding,
                    to_holding,
                    authority: sender.address().clone(),
                    amount: to_minor_units(intent.amount, decimals)?,
                }
            }
            AssetKind::Unsupported => return Err(TradeError::UnsupportedAsset(intent.asset)),
        };

        debug!(trade = %intent.id, amount = transfer.amount(), "Submitting transfer");
        let transaction = self.ledger.submit_transfer(&transfer, &[sender]).await?;
        self.ledger
            .await_confirmation(&transaction, Finality::Confirmed)
            .await?;
        Ok(transaction)
    }
}
