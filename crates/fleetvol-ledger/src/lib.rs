pub mod client;
pub mod error;
pub mod paper;

pub use client::{Finality, HoldingHandle, LedgerClient, Transfer};
pub use error::LedgerError;
pub use paper::PaperLedger;
