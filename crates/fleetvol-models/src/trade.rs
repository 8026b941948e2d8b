use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, Address};
use crate::asset::AssetKind;

/// Whether the agent's own account pays or receives in a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("send"),
            Direction::Receive => f.write_str("receive"),
        }
    }
}

/// Signature / identifier the ledger assigns to a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One trade an agent wants to make. Built fresh every cycle and reused
/// unchanged across that cycle's retries.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub id: Uuid,
    pub direction: Direction,
    pub sender: Arc<Account>,
    pub receiver: Arc<Account>,
    pub asset: AssetKind,
    /// Whole units of `asset`.
    pub amount: Decimal,
}

impl TradeIntent {
    /// Order sender and receiver from the point of view of `own`.
    pub fn new(
        own: Arc<Account>,
        counterparty: Arc<Account>,
        direction: Direction,
        asset: AssetKind,
        amount: Decimal,
    ) -> Self {
        let (sender, receiver) = match direction {
            Direction::Send => (own, counterparty),
            Direction::Receive => (counterparty, own),
        };
        Self {
            id: Uuid::new_v4(),
            direction,
            sender,
            receiver,
            asset,
            amount,
        }
    }

    /// True when sender and receiver are the same account.
    pub fn is_self_trade(&self) -> bool {
        self.sender.address() == self.receiver.address()
    }

    pub fn sender_address(&self) -> &Address {
        self.sender.address()
    }

    pub fn receiver_address(&self) -> &Address {
        self.receiver.address()
    }
}

/// Result of a single trade attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeOutcome {
    Confirmed { transaction: TransactionId },
    Failed { reason: String },
}

impl TradeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TradeOutcome::Confirmed { .. })
    }
}

/// What happened in one agent cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub intent: TradeIntent,
    /// Outcome of the last attempt.
    pub outcome: TradeOutcome,
    pub attempts: u32,
    /// Failed attempts in this cycle.
    pub retries: u32,
    pub completed_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn gave_up(&self) -> bool {
        !self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SecretKey;
    use rust_decimal_macros::dec;

    fn account(name: &str) -> Arc<Account> {
        Arc::new(Account::new(Address::new(name), SecretKey::new(vec![1; 32])))
    }

    #[test]
    fn send_puts_own_account_first() {
        let intent = TradeIntent::new(
            account("me"),
            account("them"),
            Direction::Send,
            AssetKind::Native,
            dec!(0.05),
        );
        assert_eq!(intent.sender_address().as_str(), "me");
        assert_eq!(intent.receiver_address().as_str(), "them");
        assert!(!intent.is_self_trade());
    }

    #[test]
    fn receive_puts_own_account_last() {
        let intent = TradeIntent::new(
            account("me"),
            account("them"),
            Direction::Receive,
            AssetKind::Secondary,
            dec!(0.05),
        );
        assert_eq!(intent.sender_address().as_str(), "them");
        assert_eq!(intent.receiver_address().as_str(), "me");
    }

    #[test]
    fn same_account_on_both_sides_is_a_self_trade() {
        let me = account("me");
        let intent = TradeIntent::new(
            Arc::clone(&me),
            me,
            Direction::Send,
            AssetKind::Native,
            dec!(0.01),
        );
        assert!(intent.is_self_trade());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let ok = TradeOutcome::Confirmed {
            transaction: TransactionId::new("sig1"),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["transaction"], "sig1");
        assert!(ok.is_success());

        let failed = TradeOutcome::Failed {
            reason: "rejected".to_string(),
        };
        assert!(!failed.is_success());
    }
}
