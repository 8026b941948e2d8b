use fleetvol_ledger::{LedgerClient, LedgerError};
use fleetvol_models::{from_minor_units, Address, AssetId, Fleet, NATIVE_DECIMALS};
use rust_decimal::Decimal;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Primary,
    Member,
}

/// Balances of one account, in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub address: Address,
    pub role: AccountRole,
    pub native: u64,
    pub secondary: u64,
}

/// Native and secondary balances of the primary followed by every member.
pub async fn fleet_balances(
    ledger: &dyn LedgerClient,
    fleet: &Fleet,
    secondary_asset: &AssetId,
) -> Result<Vec<AccountBalance>, LedgerError> {
    let mut balances = Vec::with_capacity(fleet.len() + 1);
    for (i, account) in fleet.counterparties().iter().enumerate() {
        let native = ledger.get_balance(account.address()).await?;
        let holding = ledger.get_or_create_holding(account, secondary_asset).await?;
        let secondary = ledger.get_holding_balance(&holding).await?;
        balances.push(AccountBalance {
            address: account.address().clone(),
            role: if i == 0 {
                AccountRole::Primary
            } else {
                AccountRole::Member
            },
            native,
            secondary,
        });
    }
    Ok(balances)
}

/// Log a snapshot in whole units under `label`.
pub fn log_balances(label: &str, balances: &[AccountBalance], secondary_decimals: u32) {
    for balance in balances {
        info!(
            snapshot = label,
            account = %balance.address,
            role = ?balance.role,
            native = %from_minor_units(balance.native, NATIVE_DECIMALS).unwrap_or(Decimal::ZERO),
            secondary = %from_minor_units(balance.secondary, secondary_decimals).unwrap_or(Decimal::ZERO),
            "Balance"
        );
    }
}
