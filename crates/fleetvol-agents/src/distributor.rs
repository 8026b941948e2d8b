use std::sync::Arc;

use fleetvol_ledger::{Finality, HoldingHandle, LedgerClient, LedgerError, Transfer};
use fleetvol_models::{from_minor_units, Address, AssetId, DistributionConfig, Fleet, TransactionId};
use rand::Rng;
use tracing::info;

use crate::error::SetupError;

/// One secondary-asset payment made during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub account: Address,
    pub holding: HoldingHandle,
    /// Minor units sent.
    pub amount: u64,
    pub transaction: TransactionId,
}

/// Seeds every fleet account with a random slice of the secondary asset.
pub struct AssetDistributor {
    ledger: Arc<dyn LedgerClient>,
    secondary_asset: AssetId,
    config: DistributionConfig,
}

/// Inclusive minor-unit bounds for one distribution at `decimals` precision.
pub fn amount_bounds(decimals: u32, config: &DistributionConfig) -> Result<(u64, u64), SetupError> {
    let unit = 10u64.checked_pow(decimals).ok_or_else(|| {
        SetupError::DistributionAmount(format!("{decimals} decimals is out of range"))
    })?;
    let scale = |percent: u32| (u128::from(unit) * u128::from(percent) / 100) as u64;
    let (low, high) = (scale(config.min_percent), scale(config.max_percent));
    if low == 0 || low > high {
        return Err(SetupError::DistributionAmount(format!(
            "{}%..{}% of one unit is empty at {decimals} decimals",
            config.min_percent, config.max_percent
        )));
    }
    Ok((low, high))
}

impl AssetDistributor {
    pub fn new(ledger: Arc<dyn LedgerClient>, secondary_asset: AssetId, config: DistributionConfig) -> Self {
        Self {
            ledger,
            secondary_asset,
            config,
        }
    }

    /// Send each member its amount, in order, waiting for each to confirm.
    /// Stops at the first failure.
    pub async fn distribute<R>(&self, fleet: &Fleet, rng: &mut R) -> Result<Vec<Distribution>, SetupError>
    where
        R: Rng + Send,
    {
        let primary = fleet.primary();
        let fail = |account: &Address| {
            let account = account.to_string();
            move |source: LedgerError| SetupError::Distribution { account, source }
        };

        let decimals = self
            .ledger
            .get_asset_decimals(&self.secondary_asset)
            .await
            .map_err(fail(primary.address()))?;
        let (low, high) = amount_bounds(decimals, &self.config)?;
        let source_holding = self
            .ledger
            .get_or_create_holding(primary, &self.secondary_asset)
            .await
            .map_err(fail(primary.address()))?;

        let mut sent = Vec::with_capacity(fleet.len());
        for member in fleet.members() {
            let holding = self
                .ledger
                .get_or_create_holding(member, &self.secondary_asset)
                .await
                .map_err(fail(member.address()))?;
            let amount = rng.random_range(low..=high);

            let transfer = Transfer::Asset {
                from_holding: source_holding.clone(),
                to_holding: holding.clone(),
                authority: primary.address().clone(),
                amount,
            };
            let transaction = self
                .ledger
                .submit_transfer(&transfer, &[primary.as_ref()])
                .await
                .map_err(fail(member.address()))?;
            self.ledger
                .await_confirmation(&transaction, Finality::Confirmed)
                .await
                .map_err(fail(member.address()))?;

            info!(
                account = %member.address(),
                amount = %from_minor_units(amount, decimals).unwrap_or_default(),
                asset = %self.secondary_asset,
                "Distributed tokens"
            );
            sent.push(Distribution {
                account: member.address().clone(),
                holding,
                amount,
                transaction,
            });
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::FleetProvisioner;
    use crate::test_support::{PaperFixture, TEST_PRIMARY_SECONDARY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    async fn provisioned(fixture: &PaperFixture, n: usize) -> Fleet {
        FleetProvisioner::new(
            fixture.ledger.clone(),
            Arc::clone(&fixture.primary),
            fixture.secondary.clone(),
        )
        .provision(n, 50_000_000)
        .await
        .unwrap()
    }

    fn distributor(fixture: &PaperFixture) -> AssetDistributor {
        AssetDistributor::new(
            fixture.ledger.clone(),
            fixture.secondary.clone(),
            DistributionConfig::default(),
        )
    }

    #[test]
    fn default_bounds_are_ten_to_ninety_percent() {
        let config = DistributionConfig::default();
        assert_eq!(amount_bounds(6, &config).unwrap(), (100_000, 900_000));
        assert_eq!(amount_bounds(9, &config).unwrap(), (100_000_000, 900_000_000));
        assert_eq!(amount_bounds(1, &config).unwrap(), (1, 9));
    }

    #[test]
    fn zero_decimals_cannot_hold_a_fraction() {
        assert!(amount_bounds(0, &DistributionConfig::default()).is_err());
        assert!(amount_bounds(40, &DistributionConfig::default()).is_err());
    }

    #[tokio::test]
    async fn every_member_receives_once_within_bounds() {
        let fixture = PaperFixture::new().await;
        let fleet = provisioned(&fixture, 5).await;
        let mut rng = StdRng::seed_from_u64(4);

        let sent = distributor(&fixture).distribute(&fleet, &mut rng).await.unwrap();

        assert_eq!(sent.len(), 5);
        for (member, distribution) in fleet.members().iter().zip(&sent) {
            assert_eq!(&distribution.account, member.address());
            assert!((100_000..=900_000).contains(&distribution.amount));
            assert_eq!(
                fixture.ledger.holding_balance_of(member.address(), &fixture.secondary),
                Some(distribution.amount)
            );
        }
        let total: u64 = sent.iter().map(|d| d.amount).sum();
        assert_eq!(
            fixture.ledger.holding_balance_of(fixture.primary.address(), &fixture.secondary),
            Some(TEST_PRIMARY_SECONDARY - total)
        );
    }

    #[tokio::test]
    async fn failure_on_any_member_is_fatal() {
        let fixture = PaperFixture::new().await;
        let fleet = provisioned(&fixture, 3).await;
        let mut rng = StdRng::seed_from_u64(4);

        fixture.ledger.fail_next_confirmations(1);
        let err = distributor(&fixture)
            .distribute(&fleet, &mut rng)
            .await
            .unwrap_err();
        match err {
            SetupError::Distribution { account, .. } => {
                assert_eq!(account, fleet.members()[0].address().to_string())
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn primary_short_of_tokens_is_fatal() {
        let fixture = PaperFixture::new().await;
        let fleet = provisioned(&fixture, 2).await;
        let empty = fixture.ledger.generate_account().await;
        fixture.ledger.credit_native(empty.address(), 1_000_000_000).unwrap();
        let broke = Fleet::new(Arc::new(empty), fleet.members().to_vec());

        let err = distributor(&fixture)
            .distribute(&broke, &mut StdRng::seed_from_u64(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SetupError::Distribution {
                source: LedgerError::InsufficientFunds { .. },
                ..
            }
        ));
    }
}
