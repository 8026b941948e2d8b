use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precision of the native asset (minor units per whole unit = 10^9).
pub const NATIVE_DECIMALS: u32 = 9;

/// Which asset a trade moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Native,
    Secondary,
    /// Any tag this build does not understand. Never generated locally.
    #[serde(other)]
    Unsupported,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetKind::Native => "native",
            AssetKind::Secondary => "secondary",
            AssetKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Network identifier of an asset (e.g. a mint address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount must be positive, got {0}")]
    NonPositive(Decimal),

    #[error("amount {amount} is below one minor unit at {decimals} decimals")]
    BelowMinorUnit { amount: Decimal, decimals: u32 },

    #[error("amount {amount} overflows at {decimals} decimals")]
    Overflow { amount: Decimal, decimals: u32 },

    #[error("unsupported precision: {0} decimals")]
    Precision(u32),
}

/// Scale a whole-unit amount to integer minor units, flooring any remainder.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<u64, AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NonPositive(amount));
    }
    let factor = 10u64
        .checked_pow(decimals)
        .ok_or(AmountError::Precision(decimals))?;
    let units = amount
        .checked_mul(Decimal::from(factor))
        .map(|scaled| scaled.floor())
        .and_then(|scaled| scaled.to_u64())
        .ok_or(AmountError::Overflow { amount, decimals })?;
    if units == 0 {
        return Err(AmountError::BelowMinorUnit { amount, decimals });
    }
    Ok(units)
}

/// Express integer minor units as a whole-unit decimal.
pub fn from_minor_units(units: u64, decimals: u32) -> Result<Decimal, AmountError> {
    Decimal::try_from_i128_with_scale(i128::from(units), decimals)
        .map(|d| d.normalize())
        .map_err(|_| AmountError::Precision(decimals))
}
