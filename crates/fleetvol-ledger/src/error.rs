use thiserror::Error;

use crate::client::Finality;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Insufficient funds in {account}: needed {needed}, available {available}")]
    InsufficientFunds {
        account: String,
        needed: u64,
        available: u64,
    },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Unknown holding: {0}")]
    UnknownHolding(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Missing signature from {0}")]
    MissingSignature(String),

    #[error("{authority} is not the owner of holding {holding}")]
    Unauthorized { authority: String, holding: String },

    #[error("Invalid signing material: {0}")]
    InvalidSecret(String),

    #[error("Transfer amount must be positive")]
    ZeroAmount,

    #[error("Transaction {transaction} did not reach {finality} finality")]
    ConfirmationFailed {
        transaction: String,
        finality: Finality,
    },

    #[error("Balance of {0} would overflow")]
    Overflow(String),
}
