use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::SecretKey;
use crate::asset::AssetId;

pub const ENV_RPC_URL: &str = "FLEETVOL_RPC_URL";
pub const ENV_PRIVATE_KEY: &str = "FLEETVOL_PRIVATE_KEY";
pub const ENV_NATIVE_ASSET: &str = "FLEETVOL_NATIVE_ASSET";
pub const ENV_SECONDARY_ASSET: &str = "FLEETVOL_SECONDARY_ASSET";
pub const ENV_FUNDING_AMOUNT: &str = "FLEETVOL_FUNDING_AMOUNT";
pub const ENV_NUM_ACCOUNTS: &str = "FLEETVOL_NUM_ACCOUNTS";

/// Finest trade precision; `10^18` steps of one unit still fit in an `i64`.
const MAX_AMOUNT_SCALE: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

/// Configuration as read from the TOML file, before validation.
///
/// The six settings the run cannot start without are optional here so they
/// can also come from the environment; [`FleetvolConfig::resolve`] enforces them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FleetvolConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Remote endpoint of the ledger network.
    pub rpc_url: Option<String>,
    /// Signing material of the primary (funding) account, as a byte array.
    pub primary_secret_key: Option<SecretKey>,
    /// Identifier of the native asset.
    pub native_asset: Option<String>,
    /// Identifier of the secondary asset traded alongside the native one.
    pub secondary_asset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FleetConfig {
    /// Number of accounts to provision.
    pub num_accounts: Option<usize>,
    /// Native minor units sent from the primary to each new account.
    pub funding_amount: Option<u64>,
    /// Base seed for every random draw. Unset means OS entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingConfig {
    /// Attempts per cycle before the cycle is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed wait between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Lower bound of the pause between cycles, inclusive.
    #[serde(default = "default_cooldown_min")]
    pub cooldown_min_seconds: u64,
    /// Upper bound of the pause between cycles, inclusive.
    #[serde(default = "default_cooldown_max")]
    pub cooldown_max_seconds: u64,
    /// Smallest trade, in whole units.
    #[serde(default = "default_min_trade_amount")]
    pub min_trade_amount: Decimal,
    /// Largest trade, in whole units.
    #[serde(default = "default_max_trade_amount")]
    pub max_trade_amount: Decimal,
    /// Decimal digits trade amounts are quantised to.
    #[serde(default = "default_amount_scale")]
    pub amount_scale: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            cooldown_min_seconds: default_cooldown_min(),
            cooldown_max_seconds: default_cooldown_max(),
            min_trade_amount: default_min_trade_amount(),
            max_trade_amount: default_max_trade_amount(),
            amount_scale: default_amount_scale(),
        }
    }
}

impl TradingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("trading.max_attempts", "must be at least 1"));
        }
        if self.cooldown_min_seconds > self.cooldown_max_seconds {
            return Err(invalid(
                "trading.cooldown_min_seconds",
                "must not exceed cooldown_max_seconds",
            ));
        }
        if self.min_trade_amount <= Decimal::ZERO {
            return Err(invalid("trading.min_trade_amount", "must be positive"));
        }
        if self.min_trade_amount > self.max_trade_amount {
            return Err(invalid(
                "trading.min_trade_amount",
                "must not exceed max_trade_amount",
            ));
        }
        self.amount_steps()?;
        Ok(())
    }

    /// Trade bounds as whole steps of `10^-amount_scale`: the smallest step
    /// at or above `min_trade_amount` and the largest at or below
    /// `max_trade_amount`.
    pub fn amount_steps(&self) -> Result<(i64, i64), ConfigError> {
        if self.amount_scale > MAX_AMOUNT_SCALE {
            return Err(invalid("trading.amount_scale", "must be at most 18"));
        }
        let step = Decimal::from(10i64.pow(self.amount_scale));
        let to_steps = |amount: Decimal, key: &'static str, round: fn(&Decimal) -> Decimal| {
            amount
                .checked_mul(step)
                .map(|scaled| round(&scaled))
                .and_then(|steps| steps.to_i64())
                .ok_or_else(|| invalid(key, "too large at amount_scale"))
        };
        let min_steps = to_steps(self.min_trade_amount, "trading.min_trade_amount", Decimal::ceil)?;
        let max_steps = to_steps(self.max_trade_amount, "trading.max_trade_amount", Decimal::floor)?;
        if min_steps < 1 || min_steps > max_steps {
            return Err(invalid(
                "trading.max_trade_amount",
                "no amount at amount_scale lies between min and max",
            ));
        }
        Ok((min_steps, max_steps))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionConfig {
    /// Smallest share of one whole secondary unit sent to each account.
    #[serde(default = "default_min_percent")]
    pub min_percent: u32,
    /// Largest share of one whole secondary unit sent to each account.
    #[serde(default = "default_max_percent")]
    pub max_percent: u32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            min_percent: default_min_percent(),
            max_percent: default_max_percent(),
        }
    }
}

impl DistributionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_percent == 0 {
            return Err(invalid("distribution.min_percent", "must be positive"));
        }
        if self.min_percent > self.max_percent {
            return Err(invalid(
                "distribution.min_percent",
                "must not exceed max_percent",
            ));
        }
        if self.max_percent > 100 {
            return Err(invalid("distribution.max_percent", "must be at most 100"));
        }
        Ok(())
    }
}

/// Starting state of the in-process paper ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperConfig {
    /// Native minor units credited to the primary account at startup.
    #[serde(default = "default_primary_native_balance")]
    pub primary_native_balance: u64,
    /// Secondary minor units credited to the primary's holding at startup.
    #[serde(default = "default_primary_secondary_balance")]
    pub primary_secondary_balance: u64,
    #[serde(default = "default_secondary_decimals")]
    pub secondary_decimals: u32,
    /// Flat native fee charged to the fee payer of every transfer.
    #[serde(default = "default_transfer_fee")]
    pub transfer_fee: u64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            primary_native_balance: default_primary_native_balance(),
            primary_secondary_balance: default_primary_secondary_balance(),
            secondary_decimals: default_secondary_decimals(),
            transfer_fee: default_transfer_fee(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    2_000
}
fn default_cooldown_min() -> u64 {
    30
}
fn default_cooldown_max() -> u64 {
    90
}
fn default_min_trade_amount() -> Decimal {
    Decimal::new(1, 2)
}
fn default_max_trade_amount() -> Decimal {
    Decimal::new(10, 2)
}
fn default_amount_scale() -> u32 {
    4
}
fn default_min_percent() -> u32 {
    10
}
fn default_max_percent() -> u32 {
    90
}
fn default_primary_native_balance() -> u64 {
    100_000_000_000
}
fn default_primary_secondary_balance() -> u64 {
    1_000_000_000_000
}
fn default_secondary_decimals() -> u32 {
    6
}
fn default_transfer_fee() -> u64 {
    5_000
}

/// Validated settings. Every field the run needs is present.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub network: NetworkSettings,
    pub fleet: FleetSettings,
    pub trading: TradingConfig,
    pub distribution: DistributionConfig,
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub rpc_url: String,
    pub primary_secret_key: SecretKey,
    /// Reported in startup logs. Native transfers need no holding, so
    /// nothing else reads it.
    pub native_asset: AssetId,
    pub secondary_asset: AssetId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FleetSettings {
    pub num_accounts: usize,
    pub funding_amount: u64,
    pub seed: Option<u64>,
}

fn required_str(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

impl FleetvolConfig {
    /// Overlay `FLEETVOL_*` variables on top of the file values.
    ///
    /// `lookup` is `std::env::var(..).ok()` in the binary and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.network.rpc_url = Some(url);
        }
        if let Some(raw) = lookup(ENV_PRIVATE_KEY) {
            let bytes: Vec<u8> = serde_json::from_str(&raw)
                .map_err(|e| invalid("FLEETVOL_PRIVATE_KEY", format!("expected a JSON byte array: {e}")))?;
            self.network.primary_secret_key = Some(SecretKey::new(bytes));
        }
        if let Some(asset) = lookup(ENV_NATIVE_ASSET) {
            self.network.native_asset = Some(asset);
        }
        if let Some(asset) = lookup(ENV_SECONDARY_ASSET) {
            self.network.secondary_asset = Some(asset);
        }
        if let Some(raw) = lookup(ENV_FUNDING_AMOUNT) {
            let amount = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("FLEETVOL_FUNDING_AMOUNT", e.to_string()))?;
            self.fleet.funding_amount = Some(amount);
        }
        if let Some(raw) = lookup(ENV_NUM_ACCOUNTS) {
            let count = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid("FLEETVOL_NUM_ACCOUNTS", e.to_string()))?;
            self.fleet.num_accounts = Some(count);
        }
        Ok(())
    }

    /// Check that every required setting is present and every range is sane.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let rpc_url = required_str(self.network.rpc_url, "network.rpc_url")?;
        let primary_secret_key = self
            .network
            .primary_secret_key
            .filter(|k| !k.as_bytes().is_empty())
            .ok_or(ConfigError::Missing("network.primary_secret_key"))?;
        let native_asset = required_str(self.network.native_asset, "network.native_asset")?;
        let secondary_asset =
            required_str(self.network.secondary_asset, "network.secondary_asset")?;

        let num_accounts = self
            .fleet
            .num_accounts
            .ok_or(ConfigError::Missing("fleet.num_accounts"))?;
        if num_accounts == 0 {
            return Err(invalid("fleet.num_accounts", "must be at least 1"));
        }
        let funding_amount = self
            .fleet
            .funding_amount
            .ok_or(ConfigError::Missing("fleet.funding_amount"))?;
        if funding_amount == 0 {
            return Err(invalid("fleet.funding_amount", "must be positive"));
        }

        self.trading.validate()?;
        self.distribution.validate()?;

        Ok(ResolvedConfig {
            network: NetworkSettings {
                rpc_url,
                primary_secret_key,
                native_asset: AssetId::new(native_asset),
                secondary_asset: AssetId::new(secondary_asset),
            },
            fleet: FleetSettings {
                num_accounts,
                funding_amount,
                seed: self.fleet.seed,
            },
            trading: self.trading,
            distribution: self.distribution,
            paper: self.paper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    const FULL_TOML: &str = r#"
[network]
rpc_url = "http://127.0.0.1:8899"
primary_secret_key = [1, 2, 3, 4]
native_asset = "native-mint"
secondary_asset = "token-mint"

[fleet]
num_accounts = 3
funding_amount = 50000000

[trading]
max_attempts = 3
retry_delay_ms = 500
min_trade_amount = "0.02"
max_trade_amount = "0.05"

[distribution]
min_percent = 20
max_percent = 80
"#;

    #[test]
    fn full_config_resolves() {
        let config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.network.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(resolved.network.primary_secret_key.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(resolved.network.secondary_asset.as_str(), "token-mint");
        assert_eq!(resolved.fleet.num_accounts, 3);
        assert_eq!(resolved.fleet.funding_amount, 50_000_000);
        assert_eq!(resolved.fleet.seed, None);
        assert_eq!(resolved.trading.max_attempts, 3);
        assert_eq!(resolved.trading.retry_delay(), Duration::from_millis(500));
        assert_eq!(resolved.trading.min_trade_amount, dec!(0.02));
        // Unset trading fields keep their defaults
        assert_eq!(resolved.trading.cooldown_min_seconds, 30);
        assert_eq!(resolved.trading.cooldown_max_seconds, 90);
        assert_eq!(resolved.distribution.min_percent, 20);
        assert_eq!(resolved.paper, PaperConfig::default());
    }

    #[test]
    fn defaults_match_documented_behaviour() {
        let trading = TradingConfig::default();
        assert_eq!(trading.max_attempts, 5);
        assert_eq!(trading.retry_delay(), Duration::from_secs(2));
        assert_eq!(trading.min_trade_amount, dec!(0.01));
        assert_eq!(trading.max_trade_amount, dec!(0.10));
        assert_eq!(trading.amount_scale, 4);
        let distribution = DistributionConfig::default();
        assert_eq!((distribution.min_percent, distribution.max_percent), (10, 90));
    }

    #[test]
    fn each_missing_required_setting_is_reported() {
        let cases = [
            ("rpc_url", "network.rpc_url"),
            ("primary_secret_key", "network.primary_secret_key"),
            ("native_asset", "network.native_asset"),
            ("secondary_asset", "network.secondary_asset"),
            ("num_accounts", "fleet.num_accounts"),
            ("funding_amount", "fleet.funding_amount"),
        ];
        for (field, key) in cases {
            let toml_str: String = FULL_TOML
                .lines()
                .filter(|line| !line.starts_with(field))
                .collect::<Vec<_>>()
                .join("\n");
            let config: FleetvolConfig = toml::from_str(&toml_str).unwrap();
            assert_eq!(config.resolve(), Err(ConfigError::Missing(key)), "{field}");
        }
    }

    #[test]
    fn empty_file_is_missing_the_endpoint() {
        let config: FleetvolConfig = toml::from_str("").unwrap();
        assert_eq!(config.resolve(), Err(ConfigError::Missing("network.rpc_url")));
    }

    #[test]
    fn zero_accounts_is_invalid() {
        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        config.fleet.num_accounts = Some(0);
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::Invalid {
                key: "fleet.num_accounts",
                ..
            })
        ));
    }

    #[test]
    fn inverted_ranges_are_invalid() {
        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        config.trading.cooldown_min_seconds = 100;
        assert!(config.clone().resolve().is_err());

        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        config.distribution.max_percent = 120;
        assert!(config.resolve().is_err());

        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        config.trading.min_trade_amount = dec!(0.2);
        assert!(config.resolve().is_err());
    }

    #[test]
    fn trade_amounts_must_fit_the_scale() {
        // Overflows the decimal itself
        let huge = TradingConfig {
            min_trade_amount: dec!(1),
            max_trade_amount: dec!(100000000000),
            amount_scale: 18,
            ..TradingConfig::default()
        };
        assert!(matches!(
            huge.amount_steps(),
            Err(ConfigError::Invalid {
                key: "trading.max_trade_amount",
                ..
            })
        ));

        // Fits the decimal but not an i64 count of steps
        let wide = TradingConfig {
            min_trade_amount: dec!(10),
            max_trade_amount: dec!(20),
            amount_scale: 18,
            ..TradingConfig::default()
        };
        assert!(matches!(
            wide.amount_steps(),
            Err(ConfigError::Invalid {
                key: "trading.min_trade_amount",
                ..
            })
        ));

        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        config.trading = wide;
        assert!(config.resolve().is_err());
    }

    #[test]
    fn trade_range_without_a_step_is_invalid() {
        let config = TradingConfig {
            min_trade_amount: dec!(0.00002),
            max_trade_amount: dec!(0.00008),
            amount_scale: 4,
            ..TradingConfig::default()
        };
        assert!(config.amount_steps().is_err());
    }

    #[test]
    fn amount_steps_round_inward() {
        let config = TradingConfig {
            min_trade_amount: dec!(0.00015),
            max_trade_amount: dec!(0.10009),
            amount_scale: 4,
            ..TradingConfig::default()
        };
        assert_eq!(config.amount_steps().unwrap(), (2, 1000));
        assert_eq!(TradingConfig::default().amount_steps().unwrap(), (100, 1000));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RPC_URL, "https://rpc.example"),
            (ENV_PRIVATE_KEY, "[9, 9, 9]"),
            (ENV_NUM_ACCOUNTS, "7"),
        ]);
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.network.rpc_url, "https://rpc.example");
        assert_eq!(resolved.network.primary_secret_key.as_bytes(), &[9, 9, 9]);
        assert_eq!(resolved.fleet.num_accounts, 7);
        // Untouched values come from the file
        assert_eq!(resolved.fleet.funding_amount, 50_000_000);
    }

    #[test]
    fn environment_alone_is_enough() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RPC_URL, "http://localhost:8899"),
            (ENV_PRIVATE_KEY, "[1,2,3]"),
            (ENV_NATIVE_ASSET, "native"),
            (ENV_SECONDARY_ASSET, "token"),
            (ENV_FUNDING_AMOUNT, "1000"),
            (ENV_NUM_ACCOUNTS, "2"),
        ]);
        let mut config = FleetvolConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn malformed_private_key_is_rejected() {
        let mut config = FleetvolConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == ENV_PRIVATE_KEY).then(|| "not-json".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "FLEETVOL_PRIVATE_KEY",
                ..
            })
        ));
    }

    #[test]
    fn resolved_debug_does_not_leak_secret() {
        let config: FleetvolConfig = toml::from_str(FULL_TOML).unwrap();
        let resolved = config.resolve().unwrap();
        let debug = format!("{resolved:?}");
        assert!(debug.contains("redacted"));
    }
}
