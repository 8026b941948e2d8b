pub mod account;
pub mod asset;
pub mod config;
pub mod trade;

pub use account::{Account, Address, Fleet, SecretKey};
pub use asset::{from_minor_units, to_minor_units, AmountError, AssetId, AssetKind, NATIVE_DECIMALS};
pub use config::{
    ConfigError, DistributionConfig, FleetConfig, FleetSettings, FleetvolConfig, NetworkConfig,
    NetworkSettings, PaperConfig, ResolvedConfig, TradingConfig,
};
pub use trade::{CycleReport, Direction, TradeIntent, TradeOutcome, TransactionId};
