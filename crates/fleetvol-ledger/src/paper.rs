use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use fleetvol_models::{Account, Address, AssetId, SecretKey, TransactionId};
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::client::{Finality, HoldingHandle, LedgerClient, Transfer};
use crate::error::LedgerError;

/// Keypair length: 32 secret bytes followed by 32 public bytes.
const KEYPAIR_LEN: usize = 64;

/// Settled transfers kept for inspection; older ones are dropped.
pub const RECENT_TRANSFERS: usize = 1_024;

#[derive(Debug, Clone)]
struct HoldingRecord {
    owner: Address,
    asset: AssetId,
    balance: u64,
}

#[derive(Debug, Default)]
struct PaperState {
    native: HashMap<Address, u64>,
    holdings: HashMap<(Address, AssetId), HoldingHandle>,
    records: HashMap<HoldingHandle, HoldingRecord>,
    decimals: HashMap<AssetId, u32>,
    /// Settled but not yet confirmed.
    pending: HashSet<TransactionId>,
    recent: VecDeque<Transfer>,
    fail_submissions: u32,
    fail_confirmations: u32,
    submitted: u64,
    holdings_created: u64,
}

impl PaperState {
    fn native_of(&self, address: &Address) -> u64 {
        self.native.get(address).copied().unwrap_or(0)
    }

    fn holding_for(&mut self, owner: &Address, asset: &AssetId) -> Result<HoldingHandle, LedgerError> {
        if !self.decimals.contains_key(asset) {
            return Err(LedgerError::UnknownAsset(asset.to_string()));
        }
        let key = (owner.clone(), asset.clone());
        if let Some(handle) = self.holdings.get(&key) {
            return Ok(handle.clone());
        }
        let handle = HoldingHandle::new(format!("holding-{}", Uuid::new_v4().simple()));
        self.records.insert(
            handle.clone(),
            HoldingRecord {
                owner: owner.clone(),
                asset: asset.clone(),
                balance: 0,
            },
        );
        self.holdings.insert(key, handle.clone());
        self.holdings_created += 1;
        Ok(handle)
    }

    fn credit_native(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.native.entry(address.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(address.to_string()))?;
        Ok(())
    }

    fn record_settled(&mut self, transaction: TransactionId, transfer: &Transfer) {
        self.pending.insert(transaction);
        if self.recent.len() == RECENT_TRANSFERS {
            self.recent.pop_front();
        }
        self.recent.push_back(transfer.clone());
        self.submitted += 1;
    }

    fn charge(&self, account: &Address, needed: u64) -> Result<(), LedgerError> {
        let available = self.native_of(account);
        if available < needed {
            return Err(LedgerError::InsufficientFunds {
                account: account.to_string(),
                needed,
                available,
            });
        }
        Ok(())
    }
}

/// In-process ledger that settles transfers instantly.
///
/// Balances, holdings and fees behave like a real network closely enough to
/// drive the fleet end to end; failures can be injected for testing.
pub struct PaperLedger {
    state: Mutex<PaperState>,
    transfer_fee: u64,
}

impl PaperLedger {
    pub fn new(transfer_fee: u64) -> Self {
        Self {
            state: Mutex::new(PaperState::default()),
            transfer_fee,
        }
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `asset` known with the given precision.
    pub fn register_asset(&self, asset: &AssetId, decimals: u32) {
        self.state().decimals.insert(asset.clone(), decimals);
    }

    pub fn credit_native(&self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        self.state().credit_native(address, amount)
    }

    /// Credit `amount` of `asset` to the owner's holding, creating it if needed.
    pub fn mint(&self, owner: &Account, asset: &AssetId, amount: u64) -> Result<HoldingHandle, LedgerError> {
        let mut state = self.state();
        let handle = state.holding_for(owner.address(), asset)?;
        if let Some(record) = state.records.get_mut(&handle) {
            record.balance = record
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow(handle.to_string()))?;
        }
        Ok(handle)
    }

    pub fn native_balance(&self, address: &Address) -> u64 {
        self.state().native_of(address)
    }

    /// Balance of the owner's holding, or `None` if it was never created.
    pub fn holding_balance_of(&self, owner: &Address, asset: &AssetId) -> Option<u64> {
        let state = self.state();
        let handle = state.holdings.get(&(owner.clone(), asset.clone()))?;
        state.records.get(handle).map(|r| r.balance)
    }

    pub fn has_holding(&self, owner: &Address, asset: &AssetId) -> bool {
        self.state()
            .holdings
            .contains_key(&(owner.clone(), asset.clone()))
    }

    /// Reject the next `count` submissions before they touch any balance.
    pub fn fail_next_submissions(&self, count: u32) {
        self.state().fail_submissions = count;
    }

    /// Report the next `count` confirmation waits as failed.
    pub fn fail_next_confirmations(&self, count: u32) {
        self.state().fail_confirmations = count;
    }

    /// Transfers accepted so far.
    pub fn submitted_transfers(&self) -> u64 {
        self.state().submitted
    }

    pub fn holdings_created(&self) -> u64 {
        self.state().holdings_created
    }

    /// The most recent settled transfers, oldest first, at most
    /// [`RECENT_TRANSFERS`].
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state().recent.iter().cloned().collect()
    }

    /// Transfers settled but not yet confirmed.
    pub fn pending_confirmations(&self) -> usize {
        self.state().pending.len()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn require_signer(signers: &[&Account], address: &Address) -> Result<(), LedgerError> {
    if signers.iter().any(|s| s.address() == address) {
        Ok(())
    } else {
        Err(LedgerError::MissingSignature(address.to_string()))
    }
}

#[async_trait]
impl LedgerClient for PaperLedger {
    async fn generate_account(&self) -> Account {
        let mut secret = vec![0u8; KEYPAIR_LEN];
        rand::rng().fill(&mut secret[..]);
        let address = Address::new(hex(&secret[KEYPAIR_LEN / 2..]));
        Account::new(address, SecretKey::new(secret))
    }

    async fn account_from_secret(&self, secret: &[u8]) -> Result<Account, LedgerError> {
        if secret.len() != KEYPAIR_LEN {
            return Err(LedgerError::InvalidSecret(format!(
                "expected {KEYPAIR_LEN} bytes, got {}",
                secret.len()
            )));
        }
        let address = Address::new(hex(&secret[KEYPAIR_LEN / 2..]));
        Ok(Account::new(address, SecretKey::new(secret.to_vec())))
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        Ok(self.state().native_of(address))
    }

    async fn get_or_create_holding(
        &self,
        owner: &Account,
        asset: &AssetId,
    ) -> Result<HoldingHandle, LedgerError> {
        self.state().holding_for(owner.address(), asset)
    }

    async fn get_holding_balance(&self, holding: &HoldingHandle) -> Result<u64, LedgerError> {
        self.state()
            .records
            .get(holding)
            .map(|r| r.balance)
            .ok_or_else(|| LedgerError::UnknownHolding(holding.to_string()))
    }

    async fn get_asset_decimals(&self, asset: &AssetId) -> Result<u32, LedgerError> {
        self.state()
            .decimals
            .get(asset)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAsset(asset.to_string()))
    }

    async fn submit_transfer(
        &self,
        transfer: &Transfer,
        signers: &[&Account],
    ) -> Result<TransactionId, LedgerError> {
        let mut state = self.state();

        if state.fail_submissions > 0 {
            state.fail_submissions -= 1;
            return Err(LedgerError::Rejected("injected submission failure".to_string()));
        }

        let payer = signers
            .first()
            .map(|s| s.address().clone())
            .ok_or_else(|| LedgerError::Rejected("transfer has no signers".to_string()))?;
        if transfer.amount() == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let fee = self.transfer_fee;

        match transfer {
            Transfer::Native { from, to, amount } => {
                require_signer(signers, from)?;
                if *from == payer {
                    state.charge(&payer, amount.saturating_add(fee))?;
                } else {
                    state.charge(&payer, fee)?;
                    state.charge(from, *amount)?;
                }
                if from != to && state.native_of(to).checked_add(*amount).is_none() {
                    return Err(LedgerError::Overflow(to.to_string()));
                }
                *state.native.entry(payer).or_insert(0) -= fee;
                *state.native.entry(from.clone()).or_insert(0) -= amount;
                state.credit_native(to, *amount)?;
            }
            Transfer::Asset {
                from_holding,
                to_holding,
                authority,
                amount,
            } => {
                require_signer(signers, authority)?;
                let source = state
                    .records
                    .get(from_holding)
                    .cloned()
                    .ok_or_else(|| LedgerError::UnknownHolding(from_holding.to_string()))?;
                let dest = state
                    .records
                    .get(to_holding)
                    .ok_or_else(|| LedgerError::UnknownHolding(to_holding.to_string()))?;
                if source.owner != *authority {
                    return Err(LedgerError::Unauthorized {
                        authority: authority.to_string(),
                        holding: from_holding.to_string(),
                    });
                }
                if dest.asset != source.asset {
                    return Err(LedgerError::Rejected(format!(
                        "holding {to_holding} holds {}, not {}",
                        dest.asset, source.asset
                    )));
                }
                if source.balance < *amount {
                    return Err(LedgerError::InsufficientFunds {
                        account: from_holding.to_string(),
                        needed: *amount,
                        available: source.balance,
                    });
                }
                if from_holding != to_holding && dest.balance.checked_add(*amount).is_none() {
                    return Err(LedgerError::Overflow(to_holding.to_string()));
                }
                state.charge(&payer, fee)?;
                *state.native.entry(payer).or_insert(0) -= fee;
                if let Some(record) = state.records.get_mut(from_holding) {
                    record.balance -= amount;
                }
                if let Some(record) = state.records.get_mut(to_holding) {
                    record.balance = record.balance.saturating_add(*amount);
                }
            }
        }

        let transaction = TransactionId::new(Uuid::new_v4().simple().to_string());
        state.record_settled(transaction.clone(), transfer);
        debug!(transaction = %transaction, amount = transfer.amount(), "Paper transfer settled");
        Ok(transaction)
    }

    async fn await_confirmation(
        &self,
        transaction: &TransactionId,
        finality: Finality,
    ) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state.fail_confirmations > 0 {
            state.fail_confirmations -= 1;
            return Err(LedgerError::ConfirmationFailed {
                transaction: transaction.to_string(),
                finality,
            });
        }
        // A confirmed transaction is forgotten; waiting on it again fails.
        if !state.pending.remove(transaction) {
            return Err(LedgerError::UnknownTransaction(transaction.to_string()));
        }
        Ok(())
    }
}
