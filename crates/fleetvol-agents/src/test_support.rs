//! Test support: a paper-ledger fixture, a scripted intent generator and a
//! call-counting ledger wrapper.
//!
//! Used by the unit tests here and by the integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetvol_ledger::{Finality, HoldingHandle, LedgerClient, LedgerError, PaperLedger, Transfer};
use fleetvol_models::{
    Account, Address, AssetId, AssetKind, DistributionConfig, Direction, FleetSettings,
    NetworkSettings, PaperConfig, ResolvedConfig, TradeIntent, TradingConfig, TransactionId,
};
use rust_decimal::Decimal;

use crate::intent::{IntentGenerator, TradePolicy};

pub const TEST_NATIVE_ASSET: &str = "native-mint";
pub const TEST_SECONDARY_ASSET: &str = "token-mint";
pub const TEST_PRIMARY_NATIVE: u64 = 100_000_000_000;
pub const TEST_PRIMARY_SECONDARY: u64 = 1_000_000_000_000;
pub const TEST_FEE: u64 = 5_000;

/// Trade policy built from the default trading settings.
pub fn default_policy() -> TradePolicy {
    TradePolicy::from_config(&TradingConfig::default()).expect("default trading settings are valid")
}

/// A paper ledger with the secondary asset registered and a well funded
/// primary account.
pub struct PaperFixture {
    pub ledger: Arc<PaperLedger>,
    pub primary: Arc<Account>,
    pub native: AssetId,
    pub secondary: AssetId,
    pub decimals: u32,
}

impl PaperFixture {
    pub async fn new() -> Self {
        Self::with_decimals(6).await
    }

    pub async fn with_decimals(decimals: u32) -> Self {
        let ledger = Arc::new(PaperLedger::new(TEST_FEE));
        let secondary = AssetId::new(TEST_SECONDARY_ASSET);
        ledger.register_asset(&secondary, decimals);

        let primary = Arc::new(ledger.generate_account().await);
        ledger
            .credit_native(primary.address(), TEST_PRIMARY_NATIVE)
            .expect("fresh account has room");
        ledger
            .mint(&primary, &secondary, TEST_PRIMARY_SECONDARY)
            .expect("secondary asset is registered");

        Self {
            ledger,
            primary,
            native: AssetId::new(TEST_NATIVE_ASSET),
            secondary,
            decimals,
        }
    }

    /// Settings for a run against this fixture's primary account.
    pub fn config(&self, num_accounts: usize, funding_amount: u64) -> ResolvedConfig {
        ResolvedConfig {
            network: NetworkSettings {
                rpc_url: "paper://local".to_string(),
                primary_secret_key: self.primary.secret().clone(),
                native_asset: self.native.clone(),
                secondary_asset: self.secondary.clone(),
            },
            fleet: FleetSettings {
                num_accounts,
                funding_amount,
                seed: Some(17),
            },
            trading: TradingConfig::default(),
            distribution: DistributionConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

/// Plays back a fixed list of trades, then reports that it has none left.
pub struct ScriptedIntentGenerator {
    script: VecDeque<(Direction, AssetKind, usize, Decimal)>,
    cooldown: Duration,
}

impl ScriptedIntentGenerator {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            cooldown: Duration::from_secs(30),
        }
    }

    /// Queue a trade against `pool[counterparty]` (index 0 is the primary).
    pub fn then(
        mut self,
        direction: Direction,
        asset: AssetKind,
        counterparty: usize,
        amount: Decimal,
    ) -> Self {
        self.script.push_back((direction, asset, counterparty, amount));
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

impl Default for ScriptedIntentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentGenerator for ScriptedIntentGenerator {
    fn next_intent(&mut self, own: &Arc<Account>, pool: &[Arc<Account>]) -> Option<TradeIntent> {
        let (direction, asset, index, amount) = self.script.pop_front()?;
        let counterparty = pool.get(index)?;
        Some(TradeIntent::new(
            Arc::clone(own),
            Arc::clone(counterparty),
            direction,
            asset,
            amount,
        ))
    }

    fn cooldown(&mut self) -> Duration {
        self.cooldown
    }
}

/// Forwards to a paper ledger and counts every call.
pub struct RecordingLedger {
    inner: Arc<PaperLedger>,
    calls: AtomicUsize,
}

impl RecordingLedger {
    pub fn new(inner: Arc<PaperLedger>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn generate_account(&self) -> Account {
        self.record();
        self.inner.generate_account().await
    }

    async fn account_from_secret(&self, secret: &[u8]) -> Result<Account, LedgerError> {
        self.record();
        self.inner.account_from_secret(secret).await
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        self.record();
        self.inner.get_balance(address).await
    }

    async fn get_or_create_holding(
        &self,
        owner: &Account,
        asset: &AssetId,
    ) -> Result<HoldingHandle, LedgerError> {
        self.record();
        self.inner.get_or_create_holding(owner, asset).await
    }

    async fn get_holding_balance(&self, holding: &HoldingHandle) -> Result<u64, LedgerError> {
        self.record();
        self.inner.get_holding_balance(holding).await
    }

    async fn get_asset_decimals(&self, asset: &AssetId) -> Result<u32, LedgerError> {
        self.record();
        self.inner.get_asset_decimals(asset).await
    }

    async fn submit_transfer(
        &self,
        transfer: &Transfer,
        signers: &[&Account],
    ) -> Result<TransactionId, LedgerError> {
        self.record();
        self.inner.submit_transfer(transfer, signers).await
    }

    async fn await_confirmation(
        &self,
        transaction: &TransactionId,
        finality: Finality,
    ) -> Result<(), LedgerError> {
        self.record();
        self.inner.await_confirmation(transaction, finality).await
    }
}
